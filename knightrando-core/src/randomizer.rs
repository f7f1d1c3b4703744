//! Staged, seeded placement search.
//!
//! Each stage is placed with assumed fill: every item not yet placed is
//! assumed collected, committed placements are swept to a fixpoint, and an
//! item may only go to a location that is reachable under the result. A
//! stage that gets stuck is retried from its starting point with a fresh
//! shuffle, up to [`MAX_STAGE_ATTEMPTS`] times.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::logic::Requirement;
use crate::progression::ProgressionManager;
use crate::state::StateUnion;
use crate::terms::{LogicManager, TermId};
use crate::world::World;
use crate::{RandoError, Result};

pub const MAX_STAGE_ATTEMPTS: usize = 10;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RandoItem {
    Item(usize),
    Transition(usize),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RandoLocation {
    Location(usize),
    Transition(usize),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RandoPlacement {
    pub item: RandoItem,
    pub location: RandoLocation,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PlacementPolicy {
    /// Items that unlock logic are placed first, each into a location
    /// reachable without it.
    Progression,
    /// Every item is placed like filler.
    Unrestricted,
}

#[derive(Clone, Debug)]
pub struct PlacementGroup {
    pub label: String,
    pub items: Vec<RandoItem>,
    pub locations: Vec<RandoLocation>,
    pub policy: PlacementPolicy,
}

#[derive(Clone, Debug)]
pub struct RandomizationStage {
    pub label: String,
    pub groups: Vec<PlacementGroup>,
}

/// Placements indexed by stage, then group.
pub type StagedPlacements = Vec<Vec<Vec<RandoPlacement>>>;

#[derive(Clone)]
struct SearchState {
    /// (item, location) pairs fixed so far, vanilla first.
    committed: Vec<(usize, usize)>,
    /// Copies of each item still waiting to be placed.
    pending: Vec<u32>,
}

pub struct Randomizer<'a> {
    lm: &'a LogicManager,
    world: &'a World,
    initial: &'a ProgressionManager,
    vanilla: &'a [(usize, usize)],
    stages: &'a [RandomizationStage],
    start: StateUnion,
    progression_items: Vec<bool>,
}

impl<'a> Randomizer<'a> {
    pub fn new(
        lm: &'a LogicManager,
        world: &'a World,
        initial: &'a ProgressionManager,
        vanilla: &'a [(usize, usize)],
        stages: &'a [RandomizationStage],
    ) -> Self {
        let mut read: Vec<TermId> = Vec::new();
        for location in &world.locations {
            location.logic.collect_terms(lm, &mut read);
        }
        for transition in &world.transitions {
            transition.logic.collect_terms(lm, &mut read);
        }
        for item in &world.items {
            if let Some(req) = &item.placement_logic {
                req.collect_terms(lm, &mut read);
            }
        }
        let read: HashSet<TermId> = read.into_iter().collect();
        let progression_items = world
            .items
            .iter()
            .map(|item| item.effects.iter().any(|e| read.contains(&e.term)))
            .collect();

        Self {
            lm,
            world,
            initial,
            vanilla,
            stages,
            start: lm.start_union(),
            progression_items,
        }
    }

    /// True when obtaining the item can change whether some logic holds.
    pub fn is_progression(&self, item: RandoItem) -> bool {
        match item {
            RandoItem::Item(i) => self.progression_items[i],
            RandoItem::Transition(_) => false,
        }
    }

    pub fn run<R: Rng>(&self, rng: &mut R) -> Result<StagedPlacements> {
        self.validate()?;

        let mut search = SearchState {
            committed: self.vanilla.to_vec(),
            pending: vec![0; self.world.items.len()],
        };
        for stage in self.stages {
            for group in &stage.groups {
                for item in &group.items {
                    if let RandoItem::Item(i) = item {
                        search.pending[*i] += 1;
                    }
                }
            }
        }

        let mut staged = Vec::with_capacity(self.stages.len());
        for stage in self.stages {
            let mut placed = None;
            for attempt in 1..=MAX_STAGE_ATTEMPTS {
                let mut trial = search.clone();
                match self.place_stage(stage, &mut trial, rng) {
                    Some(groups) => {
                        info!(stage = %stage.label, attempt, "stage placed");
                        search = trial;
                        placed = Some(groups);
                        break;
                    }
                    None => debug!(stage = %stage.label, attempt, "stage attempt ran out of locations"),
                }
            }
            match placed {
                Some(groups) => staged.push(groups),
                None => {
                    return Err(RandoError::Generation {
                        stage: stage.label.clone(),
                        attempts: MAX_STAGE_ATTEMPTS,
                    })
                }
            }
        }
        Ok(staged)
    }

    fn validate(&self) -> Result<()> {
        for stage in self.stages {
            for group in &stage.groups {
                if group.items.len() != group.locations.len() {
                    return Err(RandoError::Config(format!(
                        "group '{}' of '{}' has {} items for {} locations",
                        group.label,
                        stage.label,
                        group.items.len(),
                        group.locations.len()
                    )));
                }
                let items_ok = group.items.iter().all(|item| match *item {
                    RandoItem::Item(i) => i < self.world.items.len(),
                    RandoItem::Transition(t) => t < self.world.transitions.len(),
                });
                let locations_ok = group.locations.iter().all(|loc| match *loc {
                    RandoLocation::Location(l) => l < self.world.locations.len(),
                    RandoLocation::Transition(t) => t < self.world.transitions.len(),
                });
                if !items_ok || !locations_ok {
                    return Err(RandoError::Config(format!(
                        "group '{}' of '{}' refers to an unknown item or location",
                        group.label, stage.label
                    )));
                }
            }
        }
        Ok(())
    }

    fn place_stage<R: Rng>(
        &self,
        stage: &RandomizationStage,
        search: &mut SearchState,
        rng: &mut R,
    ) -> Option<Vec<Vec<RandoPlacement>>> {
        stage
            .groups
            .iter()
            .map(|group| self.place_group(group, search, rng))
            .collect()
    }

    fn place_group<R: Rng>(
        &self,
        group: &PlacementGroup,
        search: &mut SearchState,
        rng: &mut R,
    ) -> Option<Vec<RandoPlacement>> {
        let mut locations = group.locations.clone();
        locations.shuffle(rng);

        let (mut progression, mut filler): (Vec<RandoItem>, Vec<RandoItem>) =
            group.items.iter().copied().partition(|item| {
                group.policy == PlacementPolicy::Progression && self.is_progression(*item)
            });
        progression.shuffle(rng);
        filler.shuffle(rng);

        let mut placements = Vec::with_capacity(group.items.len());

        while let Some(item) = progression.pop() {
            self.release(item, search);
            let pm = self.sweep(search);
            let location = self.pick_location(item, &mut locations, &pm, rng)?;
            self.commit(item, location, search, &mut placements);
        }

        let mut pm = self.sweep(search);
        for item in filler {
            if self.release(item, search) {
                pm = self.sweep(search);
            }
            let location = self.pick_location(item, &mut locations, &pm, rng)?;
            self.commit(item, location, search, &mut placements);
        }

        Some(placements)
    }

    /// Removes one copy of `item` from the assumed set. Returns whether that
    /// changes assumed progression.
    fn release(&self, item: RandoItem, search: &mut SearchState) -> bool {
        match item {
            RandoItem::Item(i) => {
                search.pending[i] = search.pending[i].saturating_sub(1);
                !self.world.items[i].effects.is_empty()
            }
            RandoItem::Transition(_) => false,
        }
    }

    fn commit(
        &self,
        item: RandoItem,
        location: RandoLocation,
        search: &mut SearchState,
        placements: &mut Vec<RandoPlacement>,
    ) {
        if let (RandoItem::Item(i), RandoLocation::Location(l)) = (item, location) {
            search.committed.push((i, l));
        }
        placements.push(RandoPlacement { item, location });
    }

    fn pick_location<R: Rng>(
        &self,
        item: RandoItem,
        locations: &mut Vec<RandoLocation>,
        pm: &ProgressionManager,
        rng: &mut R,
    ) -> Option<RandoLocation> {
        let candidates: Vec<usize> = locations
            .iter()
            .enumerate()
            .filter(|(_, loc)| self.can_place(item, **loc, pm))
            .map(|(idx, _)| idx)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let pick = candidates[rng.gen_range(0..candidates.len())];
        Some(locations.swap_remove(pick))
    }

    fn location_logic(&self, location: RandoLocation) -> &Requirement {
        match location {
            RandoLocation::Location(l) => &self.world.locations[l].logic,
            RandoLocation::Transition(t) => &self.world.transitions[t].logic,
        }
    }

    fn can_place(&self, item: RandoItem, location: RandoLocation, pm: &ProgressionManager) -> bool {
        if !self.location_logic(location).is_satisfied(self.lm, pm, &self.start) {
            return false;
        }
        match item {
            RandoItem::Item(i) => match &self.world.items[i].placement_logic {
                Some(req) => req.is_satisfied(self.lm, pm, &self.start),
                None => true,
            },
            RandoItem::Transition(_) => true,
        }
    }

    /// Progression from the starting terms, every pending item, and every
    /// committed item whose location becomes reachable.
    fn sweep(&self, search: &SearchState) -> ProgressionManager {
        let mut pm = self.initial.clone();
        for (idx, &count) in search.pending.iter().enumerate() {
            for _ in 0..count {
                pm.add(&self.world.items[idx].effects);
            }
        }

        let mut collected = vec![false; search.committed.len()];
        loop {
            let mut progressed = false;
            for (k, &(item, location)) in search.committed.iter().enumerate() {
                if collected[k] {
                    continue;
                }
                let effects = &self.world.items[item].effects;
                if effects.is_empty() {
                    collected[k] = true;
                    continue;
                }
                if self.world.locations[location]
                    .logic
                    .is_satisfied(self.lm, &pm, &self.start)
                {
                    collected[k] = true;
                    pm.add(effects);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        pm
    }
}
