pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
mod args;

#[cfg(feature = "cli")]
pub use args::{CliConfig, Command, ConvertArgs, ScoreArgs, TrainArgs};
pub use cli::LocalStorage;
pub use toml_config::TomlConfig;
