use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::{
    sync::watch,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{info, instrument};
use tracker_core::{LocationUpdateSink, Mmsi, PositionBatch};

use crate::subscription::SubscriptionSet;

pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VesselStats {
    pub updates: u64,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VesselStatus {
    pub mmsi: Mmsi,
    pub name: String,
    pub stats: VesselStats,
}

/// Logs every delivered vessel update and periodically summarizes the
/// tracked vessels, including the ones that have gone quiet.
#[derive(Debug)]
pub struct VesselLog {
    vessels: watch::Receiver<SubscriptionSet>,
    stats: Mutex<HashMap<Mmsi, VesselStats>>,
    status_reports: AtomicU64,
}

impl VesselLog {
    /// Names are read from `vessels` on use, so they follow vessel set updates.
    pub fn new(vessels: watch::Receiver<SubscriptionSet>) -> Self {
        Self {
            vessels,
            stats: Mutex::new(HashMap::new()),
            status_reports: AtomicU64::new(0),
        }
    }

    pub fn stats(&self, mmsi: &Mmsi) -> VesselStats {
        self.stats
            .lock()
            .map(|stats| stats.get(mmsi).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    /// One entry per tracked vessel, in MMSI order.
    pub fn status(&self) -> Vec<VesselStatus> {
        let Ok(stats) = self.stats.lock() else {
            return vec![];
        };
        self.vessels
            .borrow()
            .iter()
            .map(|(mmsi, name)| VesselStatus {
                mmsi: mmsi.clone(),
                name: name.to_owned(),
                stats: stats.get(mmsi).copied().unwrap_or_default(),
            })
            .collect()
    }

    pub fn status_reports(&self) -> u64 {
        self.status_reports.load(Ordering::Relaxed)
    }

    pub fn log_status(&self) {
        let status = self.status();
        let silent = status.iter().filter(|s| s.stats.updates == 0).count();
        info!(num_vessels = status.len(), silent, "tracking status");

        for vessel in status {
            match vessel.stats.last_update {
                Some(last_update) => info!(
                    vessel = %vessel.name,
                    mmsi = %vessel.mmsi,
                    updates = vessel.stats.updates,
                    %last_update,
                    "vessel status"
                ),
                None => info!(
                    vessel = %vessel.name,
                    mmsi = %vessel.mmsi,
                    "vessel status: no updates"
                ),
            }
        }
        self.status_reports.fetch_add(1, Ordering::Relaxed);
    }

    /// Logs the tracking status every `period`, starting one period from now.
    #[instrument(skip_all)]
    pub async fn report_status(self: Arc<Self>, period: Duration) {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.log_status();
        }
    }

    fn name(&self, mmsi: &Mmsi) -> String {
        self.vessels
            .borrow()
            .name(mmsi)
            .unwrap_or("unknown")
            .to_owned()
    }
}

impl LocationUpdateSink for VesselLog {
    fn on_location_update(&self, batch: &PositionBatch) {
        let now = Utc::now();
        let Ok(mut stats) = self.stats.lock() else {
            return;
        };

        for (mmsi, position) in batch {
            let entry = stats.entry(mmsi.clone()).or_default();
            entry.updates += 1;
            entry.last_update = Some(now);

            info!(
                vessel = %self.name(mmsi),
                %mmsi,
                lat = position.lat,
                lon = position.lon,
                speed = position.speed,
                course = position.course,
                status = position.status.map(|s| s.description()).unwrap_or("Unknown"),
                timestamp = %position.timestamp,
                updates = entry.updates,
                "vessel update"
            );
        }
    }
}
