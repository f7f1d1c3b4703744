use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::charms::CHARMS;
use crate::context::{display_name, RandoContext};
use crate::controller::GenerationRecord;
use crate::Result;

/// Receives the integer fields written into the player's save.
pub trait SaveStateSink {
    fn set_int(&mut self, key: &str, value: i32);
}

/// Writes a finished generation somewhere a player can use it.
pub trait Exporter {
    fn export(&mut self, ctx: &RandoContext, record: &GenerationRecord) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySaveState {
    pub ints: BTreeMap<String, i32>,
}

impl MemorySaveState {
    pub fn get(&self, key: &str) -> Option<i32> {
        self.ints.get(key).copied()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.ints)?)?;
        Ok(())
    }
}

impl SaveStateSink for MemorySaveState {
    fn set_int(&mut self, key: &str, value: i32) {
        self.ints.insert(key.to_string(), value);
    }
}

#[derive(Debug, Serialize)]
struct SpoilerEntry {
    item: String,
    location: String,
}

#[derive(Debug, Serialize)]
struct TransitionEntry {
    source: String,
    target: String,
}

/// Human-facing spoiler, keyed by display names.
#[derive(Debug, Serialize)]
struct SpoilerLog {
    seed: u64,
    hash: i32,
    start_location: String,
    notch_costs: BTreeMap<String, i32>,
    items: Vec<SpoilerEntry>,
    transitions: Vec<TransitionEntry>,
}

impl SpoilerLog {
    fn from_record(record: &GenerationRecord) -> Self {
        let ctx = &record.ctx;
        let notch_costs = ctx
            .notch_costs
            .iter()
            .flatten()
            .zip(CHARMS.iter())
            .map(|(cost, charm)| (charm.name.to_string(), *cost))
            .collect();
        let items = ctx
            .item_placements
            .iter()
            .map(|p| SpoilerEntry {
                item: display_name(&p.item),
                location: display_name(&p.location),
            })
            .collect();
        let transitions = ctx
            .transition_placements
            .iter()
            .flatten()
            .map(|p| TransitionEntry {
                source: p.source.clone(),
                target: p.target.clone(),
            })
            .collect();
        Self {
            seed: ctx.settings.seed,
            hash: record.hash,
            start_location: ctx.settings.start_location.start_location.clone(),
            notch_costs,
            items,
            transitions,
        }
    }

    fn to_text(&self) -> String {
        let mut log = format!("Knightrando seed: {}\n", self.seed);
        log.push_str(&format!("hash: {}\n", self.hash));
        log.push_str(&format!("start: {}\n", self.start_location));
        log.push_str("notch costs:\n");
        for (charm, cost) in &self.notch_costs {
            log.push_str(&format!("  {}: {}\n", charm, cost));
        }
        log.push_str("items:\n");
        for entry in &self.items {
            log.push_str(&format!("  {} <- {}\n", entry.location, entry.item));
        }
        if !self.transitions.is_empty() {
            log.push_str("transitions:\n");
            for entry in &self.transitions {
                log.push_str(&format!("  {} -> {}\n", entry.source, entry.target));
            }
        }
        log
    }
}

/// Writes the raw context, the spoilers and the settings into one directory.
pub struct DirectoryExporter {
    root: PathBuf,
}

impl DirectoryExporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Exporter for DirectoryExporter {
    fn export(&mut self, ctx: &RandoContext, record: &GenerationRecord) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        fs::write(
            self.root.join("RawSpoiler.json"),
            serde_json::to_string_pretty(ctx)?,
        )?;

        let spoiler = SpoilerLog::from_record(record);
        fs::write(
            self.root.join("SpoilerLog.json"),
            serde_json::to_string_pretty(&spoiler)?,
        )?;
        fs::write(self.root.join("SpoilerLog.txt"), spoiler.to_text())?;

        fs::write(
            self.root.join("SettingsLog.json"),
            serde_json::to_string_pretty(&record.ctx.settings)?,
        )?;

        info!(path = %self.root.display(), "wrote spoiler logs");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charms::vanilla_costs;
    use crate::context::ItemPlacement;
    use crate::settings::GenerationSettings;

    fn record() -> GenerationRecord {
        let mut ctx = RandoContext::new(GenerationSettings {
            seed: 42,
            ..GenerationSettings::default()
        });
        ctx.notch_costs = Some(vanilla_costs());
        ctx.item_placements = vec![ItemPlacement {
            item: "Mantis_Claw".to_string(),
            location: "Mantis_Village".to_string(),
        }];
        GenerationRecord { ctx, hash: -12345 }
    }

    #[test]
    fn save_state_overwrites_keys() {
        let mut state = MemorySaveState::default();
        state.set_int("charmSlots", 3);
        state.set_int("charmSlots", 1);
        assert_eq!(state.get("charmSlots"), Some(1));
        assert_eq!(state.get("maxHealth"), None);
    }

    #[test]
    fn directory_exporter_writes_all_logs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Knightrando_42");
        let record = record();
        let mut exporter = DirectoryExporter::new(&root);
        exporter.export(&record.ctx, &record).unwrap();

        for name in ["RawSpoiler.json", "SpoilerLog.json", "SpoilerLog.txt", "SettingsLog.json"] {
            assert!(root.join(name).exists(), "missing {}", name);
        }

        let raw: RandoContext =
            serde_json::from_str(&fs::read_to_string(root.join("RawSpoiler.json")).unwrap()).unwrap();
        assert_eq!(raw, record.ctx);

        let spoiler: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(root.join("SpoilerLog.json")).unwrap()).unwrap();
        assert_eq!(spoiler["hash"], -12345);
        assert_eq!(spoiler["items"][0]["location"], "Mantis Village");
        assert_eq!(spoiler["notch_costs"]["Grubsong"], 1);

        let text = fs::read_to_string(root.join("SpoilerLog.txt")).unwrap();
        assert!(text.contains("Mantis Village <- Mantis Claw"));
    }

    #[test]
    fn save_state_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("save_state.json");
        let mut state = MemorySaveState::default();
        state.set_int("charmCost_1", 2);
        state.write_json(&path).unwrap();
        let read: BTreeMap<String, i32> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read.get("charmCost_1"), Some(&2));
    }
}
