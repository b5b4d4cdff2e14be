use std::{sync::Arc, time::Duration};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use zev_core::{
    allocator::{self, KeyConflict},
    directory::DeviceDirectory,
};

/// Handle to the periodic fleet audit. Dropping it does not stop the task;
/// call `cancel` on teardown.
pub struct RefreshHandle {
    task: JoinHandle<()>,
    conflicts: watch::Receiver<Vec<KeyConflict>>,
}

impl RefreshHandle {
    pub fn conflicts(&self) -> watch::Receiver<Vec<KeyConflict>> {
        self.conflicts.clone()
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

/// Periodically snapshots the directory and audits identifier uniqueness on
/// two cadences: a quick poll and a slower full reload that also logs a fleet
/// summary. The audit itself is pure over the snapshot; a conflict means two
/// writers raced the allocator or a writer bypassed it, and the only recourse
/// here is to surface it.
pub fn spawn(
    directory: Arc<dyn DeviceDirectory>,
    poll: Duration,
    full_reload: Duration,
) -> RefreshHandle {
    let (tx, rx) = watch::channel(Vec::new());
    let task = tokio::spawn(async move {
        let mut quick = tokio::time::interval(poll);
        let mut reload = tokio::time::interval(full_reload);
        loop {
            let summarize = tokio::select! {
                _ = quick.tick() => false,
                _ = reload.tick() => true,
            };

            let devices = match directory.list_devices().await {
                Ok(devices) => devices,
                Err(e) => {
                    warn!("device snapshot refresh failed: {e}");
                    continue;
                }
            };

            let conflicts = allocator::find_conflicts(&devices);
            for c in &conflicts {
                warn!(
                    transport = c.transport.as_str(),
                    identifier = %c.identifier,
                    devices = c.devices.len(),
                    "identifier claimed by multiple devices"
                );
            }
            if summarize {
                info!(devices = devices.len(), conflicts = conflicts.len(), "full fleet reload");
            }
            let _ = tx.send(conflicts);
        }
    });
    RefreshHandle { task, conflicts: rx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use zev_core::connection::{ConnectionConfig, UdpConfig};
    use zev_core::directory::InMemoryDirectory;
    use zev_core::model::{BuildingId, Device, DeviceId, DeviceKind, Occupant, UserId};
    use zev_core::preset;

    const POLL: Duration = Duration::from_secs(5);
    const RELOAD: Duration = Duration::from_secs(900);

    fn udp_meter(power_key: &str) -> Device {
        let p = preset::lookup("generic");
        Device {
            id: DeviceId::new(),
            name: "Meter".into(),
            building_id: BuildingId::new(),
            user_id: None,
            kind: DeviceKind::Meter,
            connection: ConnectionConfig::Udp(UdpConfig {
                listen_port: 9522,
                power_key: power_key.into(),
                state_key: None,
                user_id_key: None,
                mode_key: None,
                states: p.state_map(),
                modes: p.mode_map(),
            }),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn audit_surfaces_duplicate_keys() {
        let dir = InMemoryDirectory::default();
        dir.upsert_device(udp_meter("dup_power_kwh")).await.unwrap();
        dir.upsert_device(udp_meter("dup_power_kwh")).await.unwrap();

        let handle = spawn(Arc::new(dir), POLL, RELOAD);
        let mut conflicts = handle.conflicts();

        conflicts.changed().await.expect("first audit");
        let found = conflicts.borrow().clone();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].identifier, "dup_power_kwh");
        assert_eq!(found[0].devices.len(), 2);
        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn audit_clears_once_the_fleet_is_fixed() {
        let dir = InMemoryDirectory::default();
        let duplicate = udp_meter("dup_power_kwh");
        dir.upsert_device(duplicate.clone()).await.unwrap();
        dir.upsert_device(udp_meter("dup_power_kwh")).await.unwrap();

        let handle = spawn(Arc::new(dir.clone()), POLL, RELOAD);
        let mut conflicts = handle.conflicts();
        conflicts.changed().await.expect("first audit");
        assert_eq!(conflicts.borrow_and_update().len(), 1);

        // operator re-keys one of the two meters
        let mut fixed = duplicate;
        if let ConnectionConfig::Udp(udp) = &mut fixed.connection {
            udp.power_key = "fresh_power_kwh".into();
        }
        dir.upsert_device(fixed).await.unwrap();

        tokio::time::advance(POLL).await;
        loop {
            conflicts.changed().await.expect("follow-up audit");
            if conflicts.borrow_and_update().is_empty() {
                break;
            }
        }
        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn full_reload_audits_between_polls() {
        let dir = InMemoryDirectory::default();
        // poll cadence far beyond the reload cadence, so only the reload
        // ticker can pick up the duplicates introduced below
        let handle = spawn(Arc::new(dir.clone()), Duration::from_secs(3600), RELOAD);
        let mut conflicts = handle.conflicts();
        conflicts.changed().await.expect("initial audit");

        dir.upsert_device(udp_meter("dup_power_kwh")).await.unwrap();
        dir.upsert_device(udp_meter("dup_power_kwh")).await.unwrap();

        tokio::time::advance(RELOAD).await;
        loop {
            conflicts.changed().await.expect("reload audit");
            if !conflicts.borrow_and_update().is_empty() {
                break;
            }
        }
        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_ticker() {
        let dir = InMemoryDirectory::default();
        dir.upsert_occupant(Occupant {
            user_id: UserId::new(),
            building_id: BuildingId::new(),
            name: "Tenant".into(),
            apartment_unit: None,
            moved_in: Utc::now(),
            moved_out: None,
        })
        .await
        .unwrap();

        let handle = spawn(Arc::new(dir), POLL, RELOAD);
        let mut conflicts = handle.conflicts();
        conflicts.changed().await.expect("first audit");

        handle.cancel();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(conflicts.changed().await.is_err(), "sender gone after cancel");
    }
}
