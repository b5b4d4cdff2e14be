use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::ConnectionConfig;
use crate::error::ConfigError;

#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BuildingId(pub Uuid);

#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub Uuid);

#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl BuildingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BuildingId {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
}

/// An occupant of a building, with the occupancy window that decides whether
/// they take part in shared-cost splits at a given billing instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Occupant {
    pub user_id: UserId,
    pub building_id: BuildingId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apartment_unit: Option<String>,
    pub moved_in: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_out: Option<DateTime<Utc>>,
}

impl Occupant {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.moved_in <= at && self.moved_out.map(|out| out > at).unwrap_or(true)
    }
}

/// The user ids active at `at`, in stable order. Shared-cost splits are always
/// computed over this set, never over a frozen occupant list.
pub fn active_user_ids(occupants: &[Occupant], at: DateTime<Utc>) -> Vec<UserId> {
    let mut ids: Vec<UserId> =
        occupants.iter().filter(|o| o.is_active_at(at)).map(|o| o.user_id).collect();
    ids.sort();
    ids.dedup();
    ids
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Meter,
    Charger,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub building_id: BuildingId,
    /// Meters billed to a single occupant carry the occupant here; chargers
    /// resolve the user from telemetry instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub kind: DeviceKind,
    pub connection: ConnectionConfig,
}

impl Device {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "name" });
        }
        self.connection.validate(self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn occupant(moved_in: DateTime<Utc>, moved_out: Option<DateTime<Utc>>) -> Occupant {
        Occupant {
            user_id: UserId::new(),
            building_id: BuildingId::new(),
            name: "Tenant".into(),
            apartment_unit: None,
            moved_in,
            moved_out,
        }
    }

    #[test]
    fn occupancy_window_bounds() {
        let jan = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let jun = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let dec = Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap();

        let current = occupant(jan, None);
        assert!(current.is_active_at(jun));

        let moved_out = occupant(jan, Some(jun));
        assert!(moved_out.is_active_at(jan));
        assert!(!moved_out.is_active_at(jun));
        assert!(!moved_out.is_active_at(dec));

        let future = occupant(dec, None);
        assert!(!future.is_active_at(jun));
    }

    #[test]
    fn active_user_ids_filters_and_sorts() {
        let jan = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let jun = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let occupants =
            vec![occupant(jan, None), occupant(jan, Some(jun)), occupant(jan, None)];

        let active = active_user_ids(&occupants, jun);
        assert_eq!(active.len(), 2);
        assert!(active.windows(2).all(|w| w[0] <= w[1]));
    }
}
