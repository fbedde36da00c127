use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use solrcloud_backup::{
    BackupController, BackupScheduler, BackupTimestamp, ConfigManager, CronInterval, ManagerError,
};

#[derive(Parser)]
#[command(name = "solrcloud-backup")]
#[command(author, version, about = "Backup and restore of locally hosted SolrCloud cores", long_about = None)]
struct Cli {
    /// Directory holding main.toml
    #[arg(long, global = true, default_value = "config")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up every local core to a bucket
    Backup {
        /// Target bucket
        #[arg(long)]
        bucket: String,
        /// Seconds to wait after the hard commits
        #[arg(long)]
        wait: Option<u64>,
        /// Run repeatedly on the given interval instead of once
        #[arg(long, value_enum)]
        cron: Option<CronInterval>,
        /// Keep the backup directory content after the run
        #[arg(long)]
        no_cleanup: bool,
    },
    /// Restore a backup onto every local core
    Restore {
        /// Source bucket
        #[arg(long)]
        bucket: String,
        /// Backup timestamp (yyyyMMddHHmm)
        #[arg(long)]
        timestamp: String,
        /// Keep the backup directory content after the run
        #[arg(long)]
        no_cleanup: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::from_default_env()
        .add_directive("solrcloud_backup=info".parse()?)
        .add_directive("tokio_cron_scheduler=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    let config_manager = match ConfigManager::new(&cli.config).await {
        Ok(manager) => manager,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    match cli.command {
        Commands::Backup {
            bucket,
            wait,
            cron,
            no_cleanup,
        } => {
            if bucket.trim().is_empty() {
                error!("A bucket name is required");
                return Ok(ExitCode::FAILURE);
            }

            let config = match wait {
                Some(seconds) => config_manager.with_commit_wait(seconds),
                None => config_manager.get_current_config(),
            };
            let controller = Arc::new(BackupController::new(config)?);

            match cron {
                Some(interval) => {
                    let scheduler = BackupScheduler::new(controller).await?;
                    scheduler.schedule_backup(interval, bucket, !no_cleanup).await?;
                    scheduler.run_until_shutdown().await?;
                }
                None => {
                    // Errors are logged by the controller
                    let _ = controller.create_backup(&bucket, !no_cleanup).await;
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Restore {
            bucket,
            timestamp,
            no_cleanup,
        } => {
            if bucket.trim().is_empty() {
                error!("A bucket name is required");
                return Ok(ExitCode::FAILURE);
            }
            let timestamp = match BackupTimestamp::parse(&timestamp) {
                Ok(timestamp) => timestamp,
                Err(e) => {
                    error!("{}", e);
                    return Ok(ExitCode::FAILURE);
                }
            };

            let controller = BackupController::new(config_manager.get_current_config())?;
            match controller.restore_backup(&bucket, &timestamp, !no_cleanup).await {
                Ok(report) => {
                    info!("Restored {} shards", report.restored.len());
                    Ok(ExitCode::SUCCESS)
                }
                Err(ManagerError::RestoreIncomplete { failed }) => {
                    error!("Restore incomplete, failed cores: {}", failed.join(", "));
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => {
                    error!("Restore failed: {}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
