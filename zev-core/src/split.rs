use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{BuildingId, DeviceId, UserId};

/// Custom split percentages must total 100 within this bound before the
/// configuration may be saved.
pub const PERCENT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    Equal,
    Custom,
}

/// How a shared meter's cost is distributed among a building's occupants.
/// For `equal` the division is derived at billing time over whoever is active
/// then; only `custom` stores percentages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SharedMeterConfig {
    pub meter_id: DeviceId,
    pub building_id: BuildingId,
    pub split_type: SplitType,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_splits: BTreeMap<UserId, f64>,
}

/// One occupant's computed share of a billing run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Charge {
    pub user_id: UserId,
    pub share_percent: f64,
    pub amount: f64,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Even division over the active occupant set, rounded to two decimals with
/// the remainder landing on the last share so the total stays exactly 100
/// (e.g. three occupants seed 33.33 / 33.33 / 33.34).
pub fn equal_shares(active: &[UserId]) -> Result<BTreeMap<UserId, f64>, ConfigError> {
    if active.is_empty() {
        return Err(ConfigError::NoActiveOccupants);
    }
    let n = active.len();
    let even = round2(100.0 / n as f64);
    let mut shares = BTreeMap::new();
    for (i, user) in active.iter().enumerate() {
        let share =
            if i == n - 1 { round2(100.0 - even * (n - 1) as f64) } else { even };
        shares.insert(*user, share);
    }
    Ok(shares)
}

impl SharedMeterConfig {
    pub fn new(meter_id: DeviceId, building_id: BuildingId, unit_price: f64) -> Self {
        Self {
            meter_id,
            building_id,
            split_type: SplitType::Equal,
            unit_price,
            custom_splits: BTreeMap::new(),
        }
    }

    /// Moving the meter to another building invalidates every stored split:
    /// the percentages referenced occupants of the old building. The map is
    /// cleared and the operator re-enters it.
    pub fn set_building(&mut self, building_id: BuildingId) {
        if self.building_id != building_id {
            self.building_id = building_id;
            self.custom_splits.clear();
        }
    }

    /// `custom` -> `equal` discards the stored map. `equal` -> `custom`
    /// re-seeds an even division over the current occupant set rather than
    /// resurrecting previously discarded values.
    pub fn set_split_type(
        &mut self,
        split_type: SplitType,
        active: &[UserId],
    ) -> Result<(), ConfigError> {
        if self.split_type == split_type {
            return Ok(());
        }
        self.split_type = split_type;
        self.custom_splits = match split_type {
            SplitType::Equal => BTreeMap::new(),
            SplitType::Custom => equal_shares(active)?,
        };
        Ok(())
    }

    /// Overwrites a single occupant's percentage. The other entries are never
    /// auto-normalized; the operator balances the total and `validate` blocks
    /// the save until it is correct.
    pub fn set_percentage(&mut self, user_id: UserId, percent: f64) {
        self.custom_splits.insert(user_id, percent);
    }

    /// Removes occupants no longer active from the stored map. Called on
    /// every occupant-set change so stale entries cannot count toward the sum.
    pub fn retain_occupants(&mut self, active: &[UserId]) {
        self.custom_splits.retain(|user, _| active.contains(user));
    }

    fn custom_sum(&self, active: &[UserId]) -> f64 {
        active.iter().filter_map(|u| self.custom_splits.get(u)).sum()
    }

    /// Pre-submission check. A custom split over a non-empty occupant set
    /// must total 100 within `PERCENT_TOLERANCE`; an empty occupant set is
    /// vacuously fine (nothing to misallocate).
    pub fn validate(&self, active: &[UserId]) -> Result<(), ConfigError> {
        if !(self.unit_price > 0.0) {
            return Err(ConfigError::MissingField { field: "unit_price" });
        }
        if self.split_type == SplitType::Custom && !active.is_empty() {
            let sum = self.custom_sum(active);
            if (sum - 100.0).abs() > PERCENT_TOLERANCE {
                return Err(ConfigError::PercentageSumInvalid { sum });
            }
        }
        Ok(())
    }

    /// Per-occupant percentages for a billing run over the occupants active
    /// at that moment. Equal splits are derived here, never stored.
    pub fn shares_at(&self, active: &[UserId]) -> Result<BTreeMap<UserId, f64>, ConfigError> {
        match self.split_type {
            SplitType::Equal => {
                if active.is_empty() {
                    return Err(ConfigError::NoActiveOccupants);
                }
                let share = 100.0 / active.len() as f64;
                Ok(active.iter().map(|u| (*u, share)).collect())
            }
            SplitType::Custom => {
                self.validate(active)?;
                Ok(active
                    .iter()
                    .filter_map(|u| self.custom_splits.get(u).map(|p| (*u, *p)))
                    .collect())
            }
        }
    }

    /// Per-occupant cost for `consumption_kwh` at this meter's unit price,
    /// rounded to two decimals.
    pub fn charges(
        &self,
        active: &[UserId],
        consumption_kwh: f64,
    ) -> Result<Vec<Charge>, ConfigError> {
        let shares = self.shares_at(active)?;
        Ok(shares
            .into_iter()
            .map(|(user_id, share_percent)| Charge {
                user_id,
                share_percent,
                amount: round2(share_percent / 100.0 * consumption_kwh * self.unit_price),
            })
            .collect())
    }
}
