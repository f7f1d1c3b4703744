use serde::{Deserialize, Serialize};

use crate::settings::GenerationSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPlacement {
    pub item: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPlacement {
    pub source: String,
    pub target: String,
}

/// Everything one generation run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandoContext {
    pub settings: GenerationSettings,
    pub notch_costs: Option<Vec<i32>>,
    pub vanilla: Vec<ItemPlacement>,
    pub item_placements: Vec<ItemPlacement>,
    pub transition_placements: Option<Vec<TransitionPlacement>>,
}

impl RandoContext {
    pub fn new(settings: GenerationSettings) -> Self {
        Self {
            settings,
            notch_costs: None,
            vanilla: Vec::new(),
            item_placements: Vec::new(),
            transition_placements: None,
        }
    }
}

/// Turns a term-style name into the name shown to players.
pub fn display_name(name: &str) -> String {
    name.replace('_', " ")
}
