//! Background expiry of overdue reservations.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use parklot_core::db::unix_timestamp;

use crate::storage::{DatabaseError, ParkingDatabase};

/// Summary of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub sessions_purged: u64,
}

/// Complete overdue reservations and drop dead sessions as of `now`.
pub async fn sweep(db: &ParkingDatabase, now: i64) -> Result<SweepReport, DatabaseError> {
    let expired = db.expire_reservations(now).await?;
    for r in &expired {
        info!(
            reservation_id = r.id,
            spot_id = r.spot_id,
            user_id = r.user_id,
            "Reservation expired"
        );
    }
    let sessions_purged = db.purge_sessions(now).await?;

    Ok(SweepReport {
        expired: expired.len(),
        sessions_purged,
    })
}

/// Spawn a task that sweeps every `interval`, starting immediately.
pub fn spawn(db: ParkingDatabase, interval: Duration) -> JoinHandle<()> {
    let period = interval.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match sweep(&db, unix_timestamp()).await {
                Ok(report) if report.expired > 0 || report.sessions_purged > 0 => {
                    info!(
                        expired = report.expired,
                        sessions_purged = report.sessions_purged,
                        "Sweep completed"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Sweep failed"),
            }
        }
    })
}
