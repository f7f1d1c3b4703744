use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::context::ItemPlacement;
use crate::logic::Requirement;
use crate::progression::TermEffect;
use crate::terms::{LogicManager, TermId};
use crate::{RandoError, Result};

/// Called once per final placement after generation succeeds.
pub type FinishHook = Arc<dyn Fn(&ItemPlacement) + Send + Sync>;

fn always() -> String {
    "TRUE".to_string()
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemData {
    pub name: String,
    #[serde(default)]
    pub effects: BTreeMap<String, i32>,
    /// Copies of this item in the randomized pool.
    #[serde(default = "one")]
    pub count: u32,
    /// Extra condition the target location must meet to hold this item.
    #[serde(default)]
    pub placement_logic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationData {
    pub name: String,
    #[serde(default = "always")]
    pub logic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartData {
    pub name: String,
    #[serde(default = "always")]
    pub logic: String,
    /// Terms given once when starting here.
    #[serde(default)]
    pub grants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionData {
    pub name: String,
    #[serde(default = "always")]
    pub logic: String,
}

/// Logic data for a world, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldData {
    pub terms: Vec<String>,
    #[serde(default)]
    pub initial: BTreeMap<String, i32>,
    pub items: Vec<ItemData>,
    pub locations: Vec<LocationData>,
    #[serde(default)]
    pub starts: Vec<StartData>,
    #[serde(default)]
    pub vanilla: Vec<ItemPlacement>,
    #[serde(default)]
    pub transitions: Vec<TransitionData>,
    pub filler: String,
}

impl WorldData {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

#[derive(Clone)]
pub struct ItemDef {
    pub name: String,
    pub effects: Vec<TermEffect>,
    pub placement_logic: Option<Requirement>,
    pub on_finish: Option<FinishHook>,
}

impl fmt::Debug for ItemDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemDef")
            .field("name", &self.name)
            .field("effects", &self.effects)
            .field("placement_logic", &self.placement_logic)
            .field("on_finish", &self.on_finish.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct LocationDef {
    pub name: String,
    pub logic: Requirement,
    pub on_finish: Option<FinishHook>,
}

impl fmt::Debug for LocationDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationDef")
            .field("name", &self.name)
            .field("logic", &self.logic)
            .field("on_finish", &self.on_finish.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TransitionDef {
    pub name: String,
    pub logic: Requirement,
}

#[derive(Debug, Clone)]
pub struct StartDef {
    pub name: String,
    pub logic: Requirement,
    pub grants: Vec<TermId>,
}

/// A world with every name and logic string resolved.
#[derive(Debug, Clone)]
pub struct World {
    pub items: Vec<ItemDef>,
    pub locations: Vec<LocationDef>,
    pub transitions: Vec<TransitionDef>,
    pub starts: Vec<StartDef>,
    /// Fixed (item, location) pairs that never move.
    pub vanilla: Vec<(usize, usize)>,
    pub initial: Vec<(TermId, i32)>,
    /// Item indices to randomize, one entry per copy.
    pub pool: Vec<usize>,
    /// Locations not taken by a vanilla placement.
    pub randomized_locations: Vec<usize>,
    pub filler: usize,
}

fn check_unique<'a, I: IntoIterator<Item = &'a str>>(kind: &str, names: I) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(RandoError::Config(format!("duplicate {} '{}'", kind, name)));
        }
    }
    Ok(())
}

fn parse_logic(lm: &mut LogicManager, owner: &str, text: &str) -> Result<Requirement> {
    lm.parse_logic(text).map_err(|e| match e {
        RandoError::Config(msg) => RandoError::Config(format!("{}: {}", owner, msg)),
        other => other,
    })
}

impl World {
    /// Builds the logic manager and resolves every term, variable and name
    /// reference in `data`. Any unresolved reference fails here.
    pub fn resolve(data: &WorldData) -> Result<(LogicManager, World)> {
        let mut lm = LogicManager::new(&data.terms)?;

        check_unique("item", data.items.iter().map(|i| i.name.as_str()))?;
        check_unique("location", data.locations.iter().map(|l| l.name.as_str()))?;
        check_unique("transition", data.transitions.iter().map(|t| t.name.as_str()))?;
        check_unique("start", data.starts.iter().map(|s| s.name.as_str()))?;

        let mut items = Vec::with_capacity(data.items.len());
        for item in &data.items {
            let effects = item
                .effects
                .iter()
                .map(|(term, &amount)| {
                    Ok(TermEffect {
                        term: lm.term_strict(term)?,
                        amount,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let placement_logic = match &item.placement_logic {
                Some(text) => Some(parse_logic(&mut lm, &item.name, text)?),
                None => None,
            };
            items.push(ItemDef {
                name: item.name.clone(),
                effects,
                placement_logic,
                on_finish: None,
            });
        }

        let mut locations = Vec::with_capacity(data.locations.len());
        for location in &data.locations {
            locations.push(LocationDef {
                name: location.name.clone(),
                logic: parse_logic(&mut lm, &location.name, &location.logic)?,
                on_finish: None,
            });
        }

        let mut transitions = Vec::with_capacity(data.transitions.len());
        for transition in &data.transitions {
            transitions.push(TransitionDef {
                name: transition.name.clone(),
                logic: parse_logic(&mut lm, &transition.name, &transition.logic)?,
            });
        }

        let mut starts = Vec::with_capacity(data.starts.len());
        for start in &data.starts {
            starts.push(StartDef {
                name: start.name.clone(),
                logic: parse_logic(&mut lm, &start.name, &start.logic)?,
                grants: start
                    .grants
                    .iter()
                    .map(|t| lm.term_strict(t))
                    .collect::<Result<Vec<_>>>()?,
            });
        }

        let initial = data
            .initial
            .iter()
            .map(|(term, &value)| Ok((lm.term_strict(term)?, value)))
            .collect::<Result<Vec<_>>>()?;

        let item_index = |name: &str| {
            items
                .iter()
                .position(|i: &ItemDef| i.name == name)
                .ok_or_else(|| RandoError::Config(format!("unknown item '{}'", name)))
        };
        let location_index = |name: &str| {
            locations
                .iter()
                .position(|l: &LocationDef| l.name == name)
                .ok_or_else(|| RandoError::Config(format!("unknown location '{}'", name)))
        };

        let mut vanilla = Vec::with_capacity(data.vanilla.len());
        let mut fixed_locations = HashSet::new();
        for placement in &data.vanilla {
            let item = item_index(&placement.item)?;
            let location = location_index(&placement.location)?;
            if !fixed_locations.insert(location) {
                return Err(RandoError::Config(format!(
                    "location '{}' has more than one vanilla placement",
                    placement.location
                )));
            }
            vanilla.push((item, location));
        }

        let filler = item_index(&data.filler)?;

        let pool = data
            .items
            .iter()
            .enumerate()
            .flat_map(|(idx, item)| std::iter::repeat(idx).take(item.count as usize))
            .collect();

        let randomized_locations = (0..locations.len())
            .filter(|idx| !fixed_locations.contains(idx))
            .collect();

        let world = World {
            items,
            locations,
            transitions,
            starts,
            vanilla,
            initial,
            pool,
            randomized_locations,
            filler,
        };
        Ok((lm, world))
    }

    pub fn item_index(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|i| i.name == name)
    }

    pub fn location_index(&self, name: &str) -> Option<usize> {
        self.locations.iter().position(|l| l.name == name)
    }

    pub fn start(&self, name: &str) -> Option<&StartDef> {
        self.starts.iter().find(|s| s.name == name)
    }

    pub fn set_item_hook(&mut self, name: &str, hook: FinishHook) -> Result<()> {
        let idx = self
            .item_index(name)
            .ok_or_else(|| RandoError::Config(format!("unknown item '{}'", name)))?;
        self.items[idx].on_finish = Some(hook);
        Ok(())
    }

    pub fn set_location_hook(&mut self, name: &str, hook: FinishHook) -> Result<()> {
        let idx = self
            .location_index(name)
            .ok_or_else(|| RandoError::Config(format!("unknown location '{}'", name)))?;
        self.locations[idx].on_finish = Some(hook);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "terms": ["Can_Bench", "NOTCHES", "Mantis_Claw", "Grubsong", "Geo"],
        "initial": { "NOTCHES": 3, "Can_Bench": 1 },
        "items": [
            { "name": "Mantis_Claw", "effects": { "Mantis_Claw": 1 } },
            { "name": "Grubsong", "effects": { "Grubsong": 1 } },
            { "name": "Geo_Rock", "count": 0 }
        ],
        "locations": [
            { "name": "Crossroads_Chest" },
            { "name": "Mantis_Village", "logic": "Mantis_Claw" },
            { "name": "Grub_Father", "logic": "$EQUIPPEDCHARM[Grubsong]" }
        ],
        "starts": [{ "name": "King's Pass", "grants": ["Geo"] }],
        "vanilla": [{ "item": "Geo_Rock", "location": "Crossroads_Chest" }],
        "filler": "Geo_Rock"
    }"#;

    #[test]
    fn resolves_small_world() {
        let data = WorldData::from_json(SMALL).unwrap();
        let (lm, world) = World::resolve(&data).unwrap();
        assert_eq!(world.items.len(), 3);
        assert_eq!(world.pool, vec![0, 1]);
        assert_eq!(world.vanilla, vec![(2, 0)]);
        assert_eq!(world.randomized_locations, vec![1, 2]);
        assert_eq!(world.filler, 2);
        assert_eq!(world.starts[0].grants, vec![lm.term_strict("Geo").unwrap()]);
        assert_eq!(world.initial.len(), 2);
    }

    #[test]
    fn unresolved_references_fail_fast() {
        let mut data = WorldData::from_json(SMALL).unwrap();
        data.locations[1].logic = "Monarch_Wings".to_string();
        let err = World::resolve(&data).unwrap_err();
        assert!(err.to_string().contains("Mantis_Village"));

        let mut data = WorldData::from_json(SMALL).unwrap();
        data.terms.retain(|t| t != "Can_Bench");
        data.initial.remove("Can_Bench");
        assert!(matches!(World::resolve(&data), Err(RandoError::Config(_))));

        let mut data = WorldData::from_json(SMALL).unwrap();
        data.filler = "Nothing".to_string();
        assert!(World::resolve(&data).is_err());
    }

    #[test]
    fn duplicate_names_fail() {
        let mut data = WorldData::from_json(SMALL).unwrap();
        data.locations.push(LocationData {
            name: "Mantis_Village".to_string(),
            logic: always(),
        });
        assert!(World::resolve(&data).is_err());

        let mut data = WorldData::from_json(SMALL).unwrap();
        data.vanilla.push(ItemPlacement {
            item: "Grubsong".to_string(),
            location: "Crossroads_Chest".to_string(),
        });
        assert!(World::resolve(&data).is_err());
    }

    #[test]
    fn hooks_attach_by_name() {
        let data = WorldData::from_json(SMALL).unwrap();
        let (_, mut world) = World::resolve(&data).unwrap();
        let hook: FinishHook = Arc::new(|_| {});
        assert!(world.set_item_hook("Grubsong", hook.clone()).is_ok());
        assert!(world.set_location_hook("Grub_Father", hook.clone()).is_ok());
        assert!(world.set_item_hook("Nope", hook).is_err());
        assert!(world.items[1].on_finish.is_some());
    }
}
