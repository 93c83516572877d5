use super::toml_config::TomlConfig;
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "edge-autoencoder")]
#[command(about = "Train a dense autoencoder on feature windows and export an int8 edge artifact")]
#[command(version)]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit structured JSON logs")]
    pub json_logs: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    /// Show the resolved configuration without running the stage
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Fit the autoencoder and save the model bundle
    Train(TrainArgs),
    /// Quantize a trained bundle into the int8 edge artifact
    Convert(ConvertArgs),
    /// Score windows with the int8 artifact and write a CSV report
    Score(ScoreArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct TrainArgs {
    /// Feature windows (.npy or .csv)
    #[arg(long)]
    pub data: Option<String>,

    /// Output model bundle
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub epochs: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    #[arg(long)]
    pub validation_split: Option<f64>,

    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ConvertArgs {
    /// Trained model bundle
    #[arg(long)]
    pub model: Option<String>,

    /// Representative windows (.npy or .csv)
    #[arg(long)]
    pub data: Option<String>,

    /// Output int8 artifact
    #[arg(long)]
    pub output: Option<String>,

    #[arg(long)]
    pub calibration_samples: Option<usize>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ScoreArgs {
    /// Int8 artifact
    #[arg(long)]
    pub artifact: Option<String>,

    /// Windows to score (.npy or .csv)
    #[arg(long)]
    pub data: Option<String>,

    /// Output CSV report
    #[arg(long)]
    pub report: Option<String>,
}

impl CliConfig {
    /// 載入 TOML (若有指定)，再套用命令列覆蓋設定
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if self.monitor {
            config.monitoring.enabled = true;
        }
        if self.json_logs {
            config.monitoring.log_format = "json".to_string();
        }

        self.command.apply_overrides(&mut config);
        Ok(config)
    }
}

impl Command {
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        match self {
            Command::Train(args) => {
                if let Some(data) = &args.data {
                    config.data.path = data.clone();
                }
                if let Some(model) = &args.model {
                    config.model.path = model.clone();
                }
                if let Some(epochs) = args.epochs {
                    config.training.epochs = epochs;
                }
                if let Some(batch_size) = args.batch_size {
                    config.training.batch_size = batch_size;
                }
                if let Some(lr) = args.learning_rate {
                    config.training.learning_rate = lr;
                }
                if let Some(split) = args.validation_split {
                    config.training.validation_split = split;
                }
                if let Some(seed) = args.seed {
                    config.training.seed = seed;
                }
            }
            Command::Convert(args) => {
                if let Some(model) = &args.model {
                    config.model.path = model.clone();
                }
                if let Some(data) = &args.data {
                    config.data.path = data.clone();
                }
                if let Some(output) = &args.output {
                    config.export.path = output.clone();
                }
                if let Some(samples) = args.calibration_samples {
                    config.export.calibration_samples = samples;
                }
            }
            Command::Score(args) => {
                if let Some(artifact) = &args.artifact {
                    config.export.path = artifact.clone();
                }
                if let Some(data) = &args.data {
                    config.data.path = data.clone();
                }
                if let Some(report) = &args.report {
                    config.scoring.report_path = report.clone();
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Train(_) => "train",
            Command::Convert(_) => "convert",
            Command::Score(_) => "score",
        }
    }
}
