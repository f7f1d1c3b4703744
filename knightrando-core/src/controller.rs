use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::builder::{self, RequestBuilder};
use crate::charms;
use crate::context::{ItemPlacement, RandoContext, TransitionPlacement};
use crate::export::{Exporter, SaveStateSink};
use crate::hash;
use crate::randomizer::{RandoItem, RandoLocation, Randomizer, StagedPlacements};
use crate::settings::{GenerationSettings, StartLocationType, SAFE_START};
use crate::terms::LogicManager;
use crate::world::{World, WorldData};
use crate::{RandoError, Result};

/// Offset between the generation seed and the controller's own RNG stream.
const CONTROLLER_SEED_OFFSET: u64 = 4;

/// Snapshot of a finished run, taken before the saved placement lists are
/// shuffled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub ctx: RandoContext,
    pub hash: i32,
}

/// Drives one generation run: start selection, notch costs, the staged
/// search, the final fold, hashing and saving. A controller runs and saves
/// at most once.
pub struct RandoController {
    settings: GenerationSettings,
    lm: LogicManager,
    world: World,
    rng: StdRng,
    ctx: Option<RandoContext>,
    record: Option<GenerationRecord>,
    ran: bool,
    saved: bool,
}

impl RandoController {
    pub fn new(settings: GenerationSettings, data: &WorldData) -> Result<Self> {
        let (lm, world) = World::resolve(data)?;
        let rng = StdRng::seed_from_u64(settings.seed.wrapping_add(CONTROLLER_SEED_OFFSET));
        Ok(Self {
            settings,
            lm,
            world,
            rng,
            ctx: None,
            record: None,
            ran: false,
            saved: false,
        })
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn logic(&self) -> &LogicManager {
        &self.lm
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// For attaching finish hooks before [`RandoController::run`].
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn context(&self) -> Option<&RandoContext> {
        self.ctx.as_ref()
    }

    pub fn record(&self) -> Option<&GenerationRecord> {
        self.record.as_ref()
    }

    pub fn hash(&self) -> Option<i32> {
        self.record.as_ref().map(|r| r.hash)
    }

    /// Generates the seed. A second call fails, whether or not the first
    /// succeeded, since the first has already consumed RNG and may have
    /// rewritten the start location.
    pub fn run(&mut self) -> Result<&GenerationRecord> {
        if self.ran {
            return Err(RandoError::Config("run called more than once".to_string()));
        }
        self.ran = true;
        self.settings.clamp();
        self.select_start()?;

        let notch_costs = self.assign_notch_costs();
        let mut ctx = RandoContext::new(self.settings.clone());
        ctx.notch_costs = Some(notch_costs.clone());

        let output = RequestBuilder::new(&self.settings, &self.lm, &self.world).run(&notch_costs)?;
        ctx.vanilla = output
            .vanilla
            .iter()
            .map(|&(item, location)| self.item_placement(item, location))
            .collect();

        let randomizer = Randomizer::new(
            &self.lm,
            &self.world,
            &output.initial,
            &output.vanilla,
            &output.stages,
        );
        let mut rando_rng = StdRng::seed_from_u64(self.settings.seed);
        let staged = randomizer.run(&mut rando_rng)?;

        self.finish(&mut ctx, &staged)?;

        let snapshot = ctx.clone();
        let hash = hash::verification_hash(&snapshot)?;
        info!(
            seed = self.settings.seed,
            hash,
            items = ctx.item_placements.len(),
            "generation finished"
        );

        self.ctx = Some(ctx);
        Ok(&*self.record.insert(GenerationRecord {
            ctx: snapshot,
            hash,
        }))
    }

    fn select_start(&mut self) -> Result<()> {
        let kind = self.settings.start_location.start_location_type;
        if kind == StartLocationType::Fixed {
            let name = &self.settings.start_location.start_location;
            if !self.world.starts.is_empty() && self.world.start(name).is_none() {
                return Err(RandoError::Config(format!("unknown start location '{}'", name)));
            }
            return Ok(());
        }

        let pm = builder::settings_progression(&self.settings, &self.lm, &self.world, Vec::new())?;
        let start_union = self.lm.start_union();
        let mut candidates: Vec<&str> = self
            .world
            .starts
            .iter()
            .filter(|s| s.logic.check(&self.lm, &pm, Some(&start_union)))
            .map(|s| s.name.as_str())
            .collect();
        if kind == StartLocationType::RandomExcludingKingsPass {
            candidates.retain(|name| *name != SAFE_START);
        }
        if candidates.is_empty() {
            return Err(RandoError::Config(
                "no start location is available for these settings".to_string(),
            ));
        }

        let pick = candidates[self.rng.gen_range(0..candidates.len())].to_string();
        info!(start = %pick, candidates = candidates.len(), "selected start location");
        self.settings.start_location.start_location = pick;
        Ok(())
    }

    fn assign_notch_costs(&mut self) -> Vec<i32> {
        let misc = &self.settings.misc;
        let costs = if misc.randomize_notch_costs {
            charms::random_costs(&mut self.rng, misc.min_notch_cost, misc.max_notch_cost)
        } else {
            charms::vanilla_costs()
        };
        debug!(?costs, "assigned notch costs");
        costs
    }

    fn item_placement(&self, item: usize, location: usize) -> ItemPlacement {
        ItemPlacement {
            item: self.world.items[item].name.clone(),
            location: self.world.locations[location].name.clone(),
        }
    }

    /// Converts every staged placement to its named form, then runs the
    /// finish hooks. Nothing is recorded or hooked if any placement has an
    /// item and location of different kinds.
    fn finish(&self, ctx: &mut RandoContext, staged: &StagedPlacements) -> Result<()> {
        let mut items = Vec::new();
        let mut transitions = Vec::new();
        for placement in staged.iter().flatten().flatten() {
            match (placement.item, placement.location) {
                (RandoItem::Item(item), RandoLocation::Location(location)) => {
                    items.push((item, location));
                }
                (RandoItem::Transition(target), RandoLocation::Transition(source)) => {
                    transitions.push(TransitionPlacement {
                        source: self.world.transitions[source].name.clone(),
                        target: self.world.transitions[target].name.clone(),
                    });
                }
                (item, location) => {
                    return Err(RandoError::UnknownPlacement {
                        item: format!("{:?}", item),
                        location: format!("{:?}", location),
                    })
                }
            }
        }

        for &(item, location) in &items {
            let placement = self.item_placement(item, location);
            if let Some(hook) = &self.world.items[item].on_finish {
                hook(&placement);
            }
            if let Some(hook) = &self.world.locations[location].on_finish {
                hook(&placement);
            }
            ctx.item_placements.push(placement);
        }

        if !transitions.is_empty() {
            ctx.transition_placements
                .get_or_insert_with(Vec::new)
                .extend(transitions);
        }
        Ok(())
    }

    /// Writes the finished run out. The saved placement lists are shuffled
    /// first so their order does not reveal the search order; the record
    /// and its hash are left untouched. Only the first call saves.
    pub fn save(
        &mut self,
        exporter: &mut dyn Exporter,
        save_state: &mut dyn SaveStateSink,
    ) -> Result<()> {
        if self.saved {
            return Err(RandoError::Config("save called more than once".to_string()));
        }
        let record = self.record.as_ref().ok_or_else(|| {
            RandoError::Config("save called before a successful run".to_string())
        })?;
        let ctx = self.ctx.as_mut().ok_or_else(|| {
            RandoError::Config("save called before a successful run".to_string())
        })?;

        ctx.item_placements.shuffle(&mut self.rng);
        if let Some(transitions) = ctx.transition_placements.as_mut() {
            transitions.shuffle(&mut self.rng);
        }

        if let Some(costs) = &ctx.notch_costs {
            for (idx, cost) in costs.iter().enumerate() {
                save_state.set_int(&format!("charmCost_{}", idx + 1), *cost);
            }
        }
        if ctx.settings.cursed.cursed_notches {
            save_state.set_int("charmSlots", 1);
        }
        if ctx.settings.cursed.cursed_masks {
            save_state.set_int("maxHealth", 1);
            save_state.set_int("maxHealthBase", 1);
        }

        self.saved = true;
        exporter.export(ctx, record)?;
        info!(hash = record.hash, "saved generation");
        Ok(())
    }
}
