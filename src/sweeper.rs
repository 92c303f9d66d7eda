use crate::config::ServiceConfig;
use crate::db::Database;
use crate::errors::AppResult;
use crate::notify::NotificationGateway;
use chrono::{Duration as ChronoDuration, Local, Timelike, Utc};
use std::sync::Arc;
use tokio::time::Duration;

/// Daily dormancy sweep: finds cases nobody has reviewed past the cutoff
/// and alerts the owning attorney. Runs on its own task, independent of
/// request traffic.
pub struct InactivitySweeper<N: NotificationGateway> {
    db: Arc<Database>,
    notifier: Arc<N>,
    config: ServiceConfig,
}

impl<N: NotificationGateway> Clone for InactivitySweeper<N> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            notifier: Arc::clone(&self.notifier),
            config: self.config.clone(),
        }
    }
}

impl<N: NotificationGateway + 'static> InactivitySweeper<N> {
    pub fn new(db: Arc<Database>, notifier: Arc<N>, config: ServiceConfig) -> Self {
        Self {
            db,
            notifier,
            config,
        }
    }

    pub fn start(&self) {
        let sweeper = self.clone();
        tokio::spawn(async move {
            sweeper.run_loop().await;
        });
    }

    async fn run_loop(self) {
        loop {
            let delay = delay_until_local_hour(self.config.sweep_hour);
            tokio::time::sleep(delay).await;
            if let Err(err) = self.sweep_once().await {
                tracing::error!(error = %err, "dormancy sweep failed");
            }
        }
    }

    /// One pass over the candidate set. A failed alert is logged and
    /// skipped so one recipient cannot block the rest; nothing is
    /// retried within the run.
    pub async fn sweep_once(&self) -> AppResult<usize> {
        let cutoff = Utc::now() - ChronoDuration::days(self.config.dormancy_days);
        let dormant = self.db.find_dormant_cases(cutoff)?;
        tracing::info!(candidates = dormant.len(), "dormancy sweep started");

        let mut notified = 0usize;
        for case in dormant {
            let days = (Utc::now() - case.last_reviewed_at).num_days();
            match self
                .notifier
                .send_inactivity_alert(&case.owner_email, &case.owner_name, &case.title, days)
                .await
            {
                Ok(()) => {
                    notified += 1;
                    tracing::info!(
                        case_id = %case.case_id,
                        to = %case.owner_email,
                        days,
                        "inactivity alert sent"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        case_id = %case.case_id,
                        to = %case.owner_email,
                        error = %err,
                        "inactivity alert failed, skipping"
                    );
                }
            }
        }

        Ok(notified)
    }
}

fn delay_until_local_hour(hour: u32) -> Duration {
    let target_secs = u64::from(hour.min(23)) * 3_600;
    let now_secs = u64::from(Local::now().time().num_seconds_from_midnight());
    let wait = if now_secs < target_secs {
        target_secs - now_secs
    } else {
        86_400 - now_secs + target_secs
    };
    Duration::from_secs(wait)
}
