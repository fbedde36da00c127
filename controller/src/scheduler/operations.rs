use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, instrument};

use super::CronInterval;
use crate::controller::BackupController;

pub struct BackupScheduler {
    controller: Arc<BackupController>,
    scheduler: JobScheduler,
}

impl BackupScheduler {
    pub async fn new(controller: Arc<BackupController>) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create JobScheduler: {}", e))?;

        Ok(Self {
            controller,
            scheduler,
        })
    }

    #[instrument(skip(self))]
    pub async fn schedule_backup(&self, interval: CronInterval, bucket: String, cleanup: bool) -> Result<()> {
        let schedule = interval.schedule();
        info!("Scheduling {} backups to bucket [{}] with cron '{}'", interval, bucket, schedule);

        let controller = self.controller.clone();
        let job = Job::new_async(schedule, move |_uuid, _scheduler| {
            let controller = controller.clone();
            let bucket = bucket.clone();

            Box::pin(async move {
                info!("Executing scheduled backup to bucket [{}]", bucket);
                // Failures are already logged by the controller
                if controller.create_backup(&bucket, cleanup).await.is_ok() {
                    info!("Scheduled backup to bucket [{}] completed", bucket);
                }
            })
        })
        .map_err(|e| anyhow!("Failed to create backup job for '{}': {}", schedule, e))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("Failed to add backup job to scheduler: {}", e))?;

        Ok(())
    }

    /// Starts the scheduler and blocks until Ctrl-C. Running backups are not
    /// signaled on shutdown.
    #[instrument(skip(self))]
    pub async fn run_until_shutdown(mut self) -> Result<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| anyhow!("Failed to start scheduler: {}", e))?;
        info!("Backup scheduler started, press Ctrl-C to stop");

        tokio::signal::ctrl_c().await?;
        info!("Shutdown requested, stopping backup scheduler ...");

        if let Err(e) = self.scheduler.shutdown().await {
            error!("Failed to shut down scheduler cleanly: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rstest::rstest;

    #[rstest]
    #[case(CronInterval::Hourly)]
    #[case(CronInterval::Daily)]
    #[case(CronInterval::Weekly)]
    #[case(CronInterval::Test)]
    #[tokio::test]
    async fn test_every_interval_is_a_valid_schedule(#[case] interval: CronInterval) {
        let job = Job::new_async(interval.schedule(), |_uuid, _scheduler| Box::pin(async {}));
        assert!(job.is_ok(), "schedule for {} rejected", interval);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_schedule_backup_registers_job() {
        let controller = Arc::new(BackupController::new(Arc::new(Config::default())).unwrap());
        let scheduler = BackupScheduler::new(controller).await.unwrap();

        scheduler
            .schedule_backup(CronInterval::Daily, "bucket".to_string(), true)
            .await
            .unwrap();
    }
}
