use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::charms::MAX_NOTCH_COST;
use crate::Result;

/// Start that is never picked when randomizing with
/// [`StartLocationType::RandomExcludingKingsPass`].
pub const SAFE_START: &str = "King's Pass";

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum StartLocationType {
    #[default]
    Fixed,
    Random,
    RandomExcludingKingsPass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartLocationSettings {
    pub start_location_type: StartLocationType,
    pub start_location: String,
}

impl Default for StartLocationSettings {
    fn default() -> Self {
        Self {
            start_location_type: StartLocationType::Fixed,
            start_location: SAFE_START.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiscSettings {
    pub randomize_notch_costs: bool,
    pub min_notch_cost: i32,
    pub max_notch_cost: i32,
    pub transition_shuffle: bool,
}

impl Default for MiscSettings {
    fn default() -> Self {
        Self {
            randomize_notch_costs: false,
            min_notch_cost: 0,
            max_notch_cost: 4,
            transition_shuffle: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursedSettings {
    /// Start with a single notch.
    pub cursed_notches: bool,
    /// Start with a single mask.
    pub cursed_masks: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub seed: u64,
    pub start_location: StartLocationSettings,
    pub misc: MiscSettings,
    pub cursed: CursedSettings,
    /// Enabled skip/logic options; each one is a term set to 1 at start.
    pub logic_flags: BTreeSet<String>,
}

impl GenerationSettings {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Brings out-of-range values back into range.
    pub fn clamp(&mut self) {
        if self.start_location.start_location.trim().is_empty() {
            self.start_location.start_location = SAFE_START.to_string();
        }

        let misc = &mut self.misc;
        misc.min_notch_cost = misc.min_notch_cost.clamp(0, MAX_NOTCH_COST);
        misc.max_notch_cost = misc.max_notch_cost.clamp(0, MAX_NOTCH_COST);
        if misc.min_notch_cost > misc.max_notch_cost {
            std::mem::swap(&mut misc.min_notch_cost, &mut misc.max_notch_cost);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_restores_ranges() {
        let mut gs = GenerationSettings::default();
        gs.start_location.start_location = "  ".to_string();
        gs.misc.min_notch_cost = 9;
        gs.misc.max_notch_cost = -2;
        gs.clamp();
        assert_eq!(gs.start_location.start_location, SAFE_START);
        assert_eq!(gs.misc.min_notch_cost, 0);
        assert_eq!(gs.misc.max_notch_cost, MAX_NOTCH_COST);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let gs: GenerationSettings = serde_json::from_str(r#"{"seed": 12}"#).unwrap();
        assert_eq!(gs.seed, 12);
        assert_eq!(gs.start_location, StartLocationSettings::default());
        assert!(gs.logic_flags.is_empty());
    }
}
