use tracing::{debug, warn};

use crate::progression::ProgressionManager;
use crate::randomizer::{
    PlacementGroup, PlacementPolicy, RandoItem, RandoLocation, RandomizationStage,
};
use crate::settings::GenerationSettings;
use crate::terms::{LogicManager, NOTCHES};
use crate::world::World;
use crate::{RandoError, Result};

pub const MAIN_ITEM_STAGE: &str = "Main Item Stage";
pub const MAIN_TRANSITION_STAGE: &str = "Main Transition Stage";

/// Stage plan and starting progression for one run.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub stages: Vec<RandomizationStage>,
    pub vanilla: Vec<(usize, usize)>,
    pub initial: ProgressionManager,
}

/// Progression implied by the settings alone: the world's initial term
/// values, enabled logic flags, and the cursed-notches override.
pub fn settings_progression(
    settings: &GenerationSettings,
    lm: &LogicManager,
    world: &World,
    notch_costs: Vec<i32>,
) -> Result<ProgressionManager> {
    let mut pm = ProgressionManager::new(lm, notch_costs);
    for &(term, value) in &world.initial {
        pm.set(term, value);
    }
    for flag in &settings.logic_flags {
        let term = lm.term(flag).ok_or_else(|| {
            RandoError::Config(format!("logic flag '{}' is not a term of this world", flag))
        })?;
        pm.set(term, 1);
    }
    if settings.cursed.cursed_notches {
        match lm.term(NOTCHES) {
            Some(notches) => pm.set(notches, 1),
            None => warn!("cursed notches enabled but the world has no {} term", NOTCHES),
        }
    }
    Ok(pm)
}

pub struct RequestBuilder<'a> {
    settings: &'a GenerationSettings,
    lm: &'a LogicManager,
    world: &'a World,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(settings: &'a GenerationSettings, lm: &'a LogicManager, world: &'a World) -> Self {
        Self { settings, lm, world }
    }

    pub fn run(&self, notch_costs: &[i32]) -> Result<BuildOutput> {
        let initial = self.initial_progression(notch_costs.to_vec())?;

        let mut stages = Vec::new();
        if self.settings.misc.transition_shuffle && !self.world.transitions.is_empty() {
            stages.push(self.transition_stage());
        }
        stages.push(self.item_stage()?);

        for stage in &stages {
            for group in &stage.groups {
                debug!(
                    stage = %stage.label,
                    group = %group.label,
                    items = group.items.len(),
                    "built placement group"
                );
            }
        }

        Ok(BuildOutput {
            stages,
            vanilla: self.world.vanilla.clone(),
            initial,
        })
    }

    fn initial_progression(&self, notch_costs: Vec<i32>) -> Result<ProgressionManager> {
        let mut pm = settings_progression(self.settings, self.lm, self.world, notch_costs)?;
        if self.world.starts.is_empty() {
            return Ok(pm);
        }

        let name = &self.settings.start_location.start_location;
        let start = self
            .world
            .start(name)
            .ok_or_else(|| RandoError::Config(format!("unknown start location '{}'", name)))?;
        for &term in &start.grants {
            pm.increment(term, 1);
        }
        Ok(pm)
    }

    fn item_stage(&self) -> Result<RandomizationStage> {
        let locations: Vec<RandoLocation> = self
            .world
            .randomized_locations
            .iter()
            .map(|&l| RandoLocation::Location(l))
            .collect();
        let mut items: Vec<RandoItem> = self
            .world
            .pool
            .iter()
            .map(|&i| RandoItem::Item(i))
            .collect();

        if items.len() > locations.len() {
            return Err(RandoError::Config(format!(
                "{} items do not fit into {} locations",
                items.len(),
                locations.len()
            )));
        }
        items.resize(locations.len(), RandoItem::Item(self.world.filler));

        Ok(RandomizationStage {
            label: MAIN_ITEM_STAGE.to_string(),
            groups: vec![PlacementGroup {
                label: "Main Item Group".to_string(),
                items,
                locations,
                policy: PlacementPolicy::Progression,
            }],
        })
    }

    fn transition_stage(&self) -> RandomizationStage {
        let count = self.world.transitions.len();
        RandomizationStage {
            label: MAIN_TRANSITION_STAGE.to_string(),
            groups: vec![PlacementGroup {
                label: "Transitions".to_string(),
                items: (0..count).map(RandoItem::Transition).collect(),
                locations: (0..count).map(RandoLocation::Transition).collect(),
                policy: PlacementPolicy::Unrestricted,
            }],
        }
    }
}
