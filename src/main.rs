use clap::Parser;
use edge_autoencoder::core::ConfigProvider;
use edge_autoencoder::utils::error::AutoencoderError;
use edge_autoencoder::utils::{logger, validation::Validate};
use edge_autoencoder::{
    CliConfig, Command, ConversionPipeline, Engine, LocalStorage, ScoringPipeline, TomlConfig,
    TrainingPipeline,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();
    let resolved = cli.resolve();

    // 初始化日誌
    let json_logs = resolved
        .as_ref()
        .map(TomlConfig::json_logs)
        .unwrap_or(cli.json_logs);
    if json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting edge-autoencoder {}", cli.command.name());
    if let Some(path) = &cli.config {
        tracing::info!("📁 Loading configuration from: {}", path);
    }

    let config = match resolved {
        Ok(config) => config,
        Err(e) => {
            if let Some(path) = &cli.config {
                eprintln!("❌ Failed to load config file '{}'", path);
            }
            fail(&e);
        }
    };
    if cli.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    display_config_summary(&config, &cli.command);

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        return Ok(());
    }

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 路徑皆相對於目前工作目錄
    let storage = LocalStorage::new(".".to_string());

    let result = match &cli.command {
        Command::Train(_) => {
            Engine::new_with_monitoring(TrainingPipeline::new(storage, config), monitor_enabled)
                .run()
                .await
        }
        Command::Convert(_) => {
            Engine::new_with_monitoring(ConversionPipeline::new(storage, config), monitor_enabled)
                .run()
                .await
        }
        Command::Score(_) => {
            Engine::new_with_monitoring(ScoringPipeline::new(storage, config), monitor_enabled)
                .run()
                .await
        }
    };

    match result {
        Ok(output_path) => {
            tracing::info!("✅ {} completed successfully!", cli.command.name());
            println!("✅ {} completed successfully!", cli.command.name());
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
                cli.command.name(),
                e,
                e.category(),
                e.severity()
            );
            fail(&e);
        }
    }

    Ok(())
}

/// 輸出用戶友好的錯誤信息，並依嚴重程度決定退出碼
fn fail(e: &AutoencoderError) -> ! {
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    std::process::exit(e.severity().exit_code());
}

fn display_config_summary(config: &TomlConfig, command: &Command) {
    println!("📋 Configuration Summary:");
    println!("  Stage: {}", command.name());
    println!("  Data: {}", config.data_path());

    match command {
        Command::Train(_) => {
            let training = config.training();
            println!("  Model bundle: {}", config.model_path());
            println!(
                "  Layers: {}/{}/{}/{}/{} (relu) + linear output",
                config.model.hidden_dim,
                config.model.bottleneck_dim,
                config.model.latent_dim,
                config.model.bottleneck_dim,
                config.model.hidden_dim
            );
            println!(
                "  Epochs: {}  Batch size: {}  Learning rate: {}",
                training.epochs, training.batch_size, training.learning_rate
            );
            println!(
                "  Validation split: {}  Seed: {}",
                training.validation_split, training.seed
            );
        }
        Command::Convert(_) => {
            println!("  Model bundle: {}", config.model_path());
            println!("  Artifact: {}", config.artifact_path());
            println!("  Calibration samples: {}", config.calibration_samples());
        }
        Command::Score(_) => {
            println!("  Artifact: {}", config.artifact_path());
            println!("  Report: {}", config.report_path());
        }
    }

    println!();
}
