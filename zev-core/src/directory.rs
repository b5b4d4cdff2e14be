use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::model::{BuildingId, Device, DeviceId, Occupant, UserId};

/// Source of the "full existing device set" the allocator and the uniqueness
/// audit run against. The real directory lives behind the remote admin API;
/// callers load a snapshot and hand it over, so correctness of any uniqueness
/// check is only as good as the snapshot's freshness.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<Device>>;
    async fn get_device(&self, id: DeviceId) -> Result<Option<Device>>;
    async fn upsert_device(&self, device: Device) -> Result<()>;

    async fn list_occupants(&self, building: BuildingId) -> Result<Vec<Occupant>>;
    async fn upsert_occupant(&self, occupant: Occupant) -> Result<()>;
}

#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    devices: HashMap<DeviceId, Device>,
    occupants: HashMap<UserId, Occupant>,
}

#[async_trait]
impl DeviceDirectory for InMemoryDirectory {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        let inner = self.inner.read().expect("directory lock poisoned");
        Ok(inner.devices.values().cloned().collect())
    }

    async fn get_device(&self, id: DeviceId) -> Result<Option<Device>> {
        let inner = self.inner.read().expect("directory lock poisoned");
        Ok(inner.devices.get(&id).cloned())
    }

    async fn upsert_device(&self, device: Device) -> Result<()> {
        let mut inner = self.inner.write().expect("directory lock poisoned");
        inner.devices.insert(device.id, device);
        Ok(())
    }

    async fn list_occupants(&self, building: BuildingId) -> Result<Vec<Occupant>> {
        let inner = self.inner.read().expect("directory lock poisoned");
        Ok(inner.occupants.values().filter(|o| o.building_id == building).cloned().collect())
    }

    async fn upsert_occupant(&self, occupant: Occupant) -> Result<()> {
        let mut inner = self.inner.write().expect("directory lock poisoned");
        inner.occupants.insert(occupant.user_id, occupant);
        Ok(())
    }
}
