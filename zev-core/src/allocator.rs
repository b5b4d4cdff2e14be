use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::ConnectionType;
use crate::error::ConfigError;
use crate::model::{Device, DeviceId};

/// Retry budget for random key allocation. Practically unreachable given UUID
/// entropy, but the loop must be bounded.
pub const MAX_KEY_ATTEMPTS: usize = 100;

/// The four datagram keys a charger claims on its shared listen port, all
/// derived from one random UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargerKeys {
    pub power_key: String,
    pub state_key: String,
    pub user_id_key: String,
    pub mode_key: String,
}

impl ChargerKeys {
    fn from_base(base: &str) -> Self {
        Self {
            power_key: format!("{base}_power"),
            state_key: format!("{base}_state"),
            user_id_key: format!("{base}_user"),
            mode_key: format!("{base}_mode"),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.power_key.as_str(),
            self.state_key.as_str(),
            self.user_id_key.as_str(),
            self.mode_key.as_str(),
        ]
        .into_iter()
    }
}

fn key_in_use(devices: &[Device], key: &str) -> bool {
    devices.iter().flat_map(|d| d.connection.telemetry_keys()).any(|k| k == key)
}

fn topic_in_use(devices: &[Device], topic: &str) -> bool {
    devices.iter().filter_map(|d| d.connection.mqtt_topic()).any(|t| t == topic)
}

/// Datagram key for a new UDP meter: `{uuid}_power_kwh`, regenerated on
/// collision against any key already claimed anywhere in the fleet. The key
/// namespace is treated as global rather than per listen port; that is the
/// conservative reading and costs nothing at UUID entropy.
pub fn meter_data_key(devices: &[Device]) -> Result<String, ConfigError> {
    meter_data_key_with(devices, || Uuid::new_v4().to_string())
}

pub fn meter_data_key_with(
    devices: &[Device],
    mut base: impl FnMut() -> String,
) -> Result<String, ConfigError> {
    for _ in 0..MAX_KEY_ATTEMPTS {
        let candidate = format!("{}_power_kwh", base());
        if !key_in_use(devices, &candidate) {
            return Ok(candidate);
        }
        tracing::debug!(%candidate, "meter key collision, drawing again");
    }
    Err(ConfigError::AllocationExhausted { attempts: MAX_KEY_ATTEMPTS })
}

/// Key block for a new UDP charger. All four keys must be collision-free; a
/// hit on any of them discards the whole block and a new UUID is drawn.
pub fn charger_keys(devices: &[Device]) -> Result<ChargerKeys, ConfigError> {
    charger_keys_with(devices, || Uuid::new_v4().to_string())
}

pub fn charger_keys_with(
    devices: &[Device],
    mut base: impl FnMut() -> String,
) -> Result<ChargerKeys, ConfigError> {
    for _ in 0..MAX_KEY_ATTEMPTS {
        let keys = ChargerKeys::from_base(&base());
        if keys.iter().all(|k| !key_in_use(devices, k)) {
            return Ok(keys);
        }
        tracing::debug!(power_key = %keys.power_key, "charger key block collision, drawing again");
    }
    Err(ConfigError::AllocationExhausted { attempts: MAX_KEY_ATTEMPTS })
}

fn normalize_segment(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Topic for a new MQTT device: a readable `meters/...` path from building,
/// apartment unit, and device name. Collisions append `_1`, `_2`, ... with a
/// deterministic counter rather than the random regeneration used for UDP
/// keys, so topics stay human-readable. Always terminates.
pub fn mqtt_topic(
    devices: &[Device],
    building: Option<&str>,
    unit: Option<&str>,
    device_name: &str,
) -> String {
    let name = normalize_segment(device_name);
    let base = match (building, unit) {
        (Some(b), Some(u)) => {
            format!("meters/{}/{}/{}", normalize_segment(b), normalize_segment(u), name)
        }
        (Some(b), None) => format!("meters/{}/{}", normalize_segment(b), name),
        (None, _) => format!("meters/{name}"),
    };

    let mut candidate = base.clone();
    let mut n = 0u32;
    while topic_in_use(devices, &candidate) {
        n += 1;
        candidate = format!("{base}_{n}");
    }
    candidate
}

/// An identifier claimed by more than one device on the same transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyConflict {
    pub transport: ConnectionType,
    pub identifier: String,
    pub devices: Vec<DeviceId>,
}

/// Audit a fleet snapshot for identifier-uniqueness violations: UDP datagram
/// keys and MQTT topics claimed by more than one device. Pure over the given
/// snapshot; freshness is the caller's problem.
pub fn find_conflicts(devices: &[Device]) -> Vec<KeyConflict> {
    let mut keys: BTreeMap<String, Vec<DeviceId>> = BTreeMap::new();
    let mut topics: BTreeMap<String, Vec<DeviceId>> = BTreeMap::new();

    for device in devices {
        for key in device.connection.telemetry_keys() {
            keys.entry(key.to_string()).or_default().push(device.id);
        }
        if let Some(topic) = device.connection.mqtt_topic() {
            topics.entry(topic.to_string()).or_default().push(device.id);
        }
    }

    let udp = keys.into_iter().filter(|(_, d)| d.len() > 1).map(|(identifier, devices)| {
        KeyConflict { transport: ConnectionType::Udp, identifier, devices }
    });
    let mqtt = topics.into_iter().filter(|(_, d)| d.len() > 1).map(|(identifier, devices)| {
        KeyConflict { transport: ConnectionType::Mqtt, identifier, devices }
    });
    udp.chain(mqtt).collect()
}
