//! Cron-based scheduling of recurring backups
//!
//! Recurring backups use 6-field cron expressions (sec min hour day month dow)
//! evaluated in UTC. A run that is still busy when the next one fires finds a
//! non-empty backup root and is skipped by the controller.
//!
//! | Interval | Expression        |
//! |----------|-------------------|
//! | hourly   | `0 0 * * * *`     |
//! | daily    | `0 0 1 * * *`     |
//! | weekly   | `0 0 1 * * Sun`   |
//! | test     | `0 * * * * *`     |

pub mod operations;
pub use operations::BackupScheduler;

use clap::ValueEnum;
use std::fmt;

use crate::constants::schedules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CronInterval {
    Hourly,
    Daily,
    Weekly,
    Test,
}

impl CronInterval {
    pub fn schedule(&self) -> &'static str {
        match self {
            CronInterval::Hourly => schedules::HOURLY,
            CronInterval::Daily => schedules::DAILY,
            CronInterval::Weekly => schedules::WEEKLY,
            CronInterval::Test => schedules::TEST,
        }
    }
}

impl fmt::Display for CronInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CronInterval::Hourly => "hourly",
            CronInterval::Daily => "daily",
            CronInterval::Weekly => "weekly",
            CronInterval::Test => "test",
        };
        write!(f, "{}", name)
    }
}
