use std::collections::HashMap;
use std::ops::Index;

use crate::charms::CHARM_COUNT;
use crate::{RandoError, Result};

pub const HAS_TAKEN_DAMAGE: &str = "HASTAKENDAMAGE";
pub const OVERCHARMED: &str = "OVERCHARMED";
pub const USED_NOTCHES: &str = "USEDNOTCHES";

pub fn charm_bool_name(charm_id: usize) -> String {
    format!("CHARM{}", charm_id)
}

pub fn anticharm_bool_name(charm_id: usize) -> String {
    format!("noCHARM{}", charm_id)
}

/// How a flag orders states when pruning a union.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
enum BoolOrder {
    /// Unset is at least as good as set.
    LowerIsBetter,
    /// Paths that differ on the flag are incomparable.
    Exact,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct StateBoolId {
    index: usize,
    order: BoolOrder,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct StateIntId(usize);

/// Names and slot indices of every path-local fact a [`State`] carries.
#[derive(Debug, Clone, Default)]
pub struct StateSchema {
    bools: Vec<String>,
    exact_bools: Vec<String>,
    ints: Vec<String>,
    bool_lookup: HashMap<String, StateBoolId>,
    int_lookup: HashMap<String, StateIntId>,
}

impl StateSchema {
    /// Schema with the damage/overcharm/notch slots and one equipped and
    /// one anti-requirement flag per charm.
    ///
    /// Equipped flags are exact: an equipped charm can be re-affirmed where
    /// a fresh equip would fail, so neither value is better.
    pub fn standard() -> Self {
        let mut schema = Self::default();
        schema.add_bool(HAS_TAKEN_DAMAGE);
        schema.add_bool(OVERCHARMED);
        schema.add_int(USED_NOTCHES);
        for id in 1..=CHARM_COUNT {
            schema.add_exact_bool(&charm_bool_name(id));
            schema.add_bool(&anticharm_bool_name(id));
        }
        schema
    }

    pub fn add_bool(&mut self, name: &str) -> StateBoolId {
        self.register_bool(name, BoolOrder::LowerIsBetter)
    }

    /// Adds a flag that blocks pruning between paths that disagree on it.
    pub fn add_exact_bool(&mut self, name: &str) -> StateBoolId {
        self.register_bool(name, BoolOrder::Exact)
    }

    fn register_bool(&mut self, name: &str, order: BoolOrder) -> StateBoolId {
        if let Some(&id) = self.bool_lookup.get(name) {
            return id;
        }
        let names = match order {
            BoolOrder::LowerIsBetter => &mut self.bools,
            BoolOrder::Exact => &mut self.exact_bools,
        };
        let id = StateBoolId {
            index: names.len(),
            order,
        };
        names.push(name.to_string());
        self.bool_lookup.insert(name.to_string(), id);
        id
    }

    pub fn add_int(&mut self, name: &str) -> StateIntId {
        if let Some(&id) = self.int_lookup.get(name) {
            return id;
        }
        let id = StateIntId(self.ints.len());
        self.ints.push(name.to_string());
        self.int_lookup.insert(name.to_string(), id);
        id
    }

    pub fn get_bool(&self, name: &str) -> Option<StateBoolId> {
        self.bool_lookup.get(name).copied()
    }

    pub fn get_int(&self, name: &str) -> Option<StateIntId> {
        self.int_lookup.get(name).copied()
    }

    pub fn get_bool_strict(&self, name: &str) -> Result<StateBoolId> {
        self.get_bool(name).ok_or_else(|| {
            RandoError::Config(format!("unknown state bool '{}'", name))
        })
    }

    pub fn get_int_strict(&self, name: &str) -> Result<StateIntId> {
        self.get_int(name).ok_or_else(|| {
            RandoError::Config(format!("unknown state int '{}'", name))
        })
    }

    pub fn bool_name(&self, id: StateBoolId) -> &str {
        match id.order {
            BoolOrder::LowerIsBetter => &self.bools[id.index],
            BoolOrder::Exact => &self.exact_bools[id.index],
        }
    }

    /// The state every reasoning path starts from: all flags false, all
    /// counters zero.
    pub fn default_state(&self) -> State {
        State {
            bools: vec![false; self.bools.len()],
            exact_bools: vec![false; self.exact_bools.len()],
            ints: vec![0; self.ints.len()],
        }
    }
}

/// Read access shared by snapshots and builders.
pub trait StateRead {
    fn get_bool(&self, id: StateBoolId) -> bool;
    fn get_int(&self, id: StateIntId) -> i32;
}

/// Immutable snapshot of the facts along one reasoning path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct State {
    bools: Vec<bool>,
    exact_bools: Vec<bool>,
    ints: Vec<i32>,
}

impl State {
    /// True when `self` agrees with `other` on every exact flag and every
    /// other slot of `self` is at most the matching slot of `other`. Such a
    /// state can reach anything `other` can.
    pub fn dominates(&self, other: &State) -> bool {
        self.exact_bools == other.exact_bools
            && self
                .bools
                .iter()
                .zip(&other.bools)
                .all(|(a, b)| !*a || *b)
            && self.ints.iter().zip(&other.ints).all(|(a, b)| a <= b)
    }

    fn bool_slot(&mut self, id: StateBoolId) -> &mut bool {
        match id.order {
            BoolOrder::LowerIsBetter => &mut self.bools[id.index],
            BoolOrder::Exact => &mut self.exact_bools[id.index],
        }
    }
}

impl StateRead for State {
    fn get_bool(&self, id: StateBoolId) -> bool {
        match id.order {
            BoolOrder::LowerIsBetter => self.bools[id.index],
            BoolOrder::Exact => self.exact_bools[id.index],
        }
    }

    fn get_int(&self, id: StateIntId) -> i32 {
        self.ints[id.0]
    }
}

/// Result of applying a state modifier to one snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateOutcome {
    Infeasible,
    Unchanged,
    Changed(State),
}

/// Copy-on-write builder over a borrowed snapshot. The base is never
/// written; the first mutation takes an owned copy.
#[derive(Debug)]
pub struct StateBuilder<'a> {
    base: &'a State,
    owned: Option<State>,
}

impl<'a> StateBuilder<'a> {
    pub fn new(base: &'a State) -> Self {
        Self { base, owned: None }
    }

    fn current(&self) -> &State {
        self.owned.as_ref().unwrap_or(self.base)
    }

    fn make_mut(&mut self) -> &mut State {
        let base = self.base;
        self.owned.get_or_insert_with(|| base.clone())
    }

    pub fn set_bool(&mut self, id: StateBoolId, value: bool) {
        if self.current().get_bool(id) != value {
            *self.make_mut().bool_slot(id) = value;
        }
    }

    /// Sets a flag that may only be set once per path. Returns false
    /// without mutating if it is already set.
    pub fn try_set_bool_true(&mut self, id: StateBoolId) -> bool {
        if self.current().get_bool(id) {
            return false;
        }
        *self.make_mut().bool_slot(id) = true;
        true
    }

    pub fn set_int(&mut self, id: StateIntId, value: i32) {
        if self.current().get_int(id) != value {
            self.make_mut().ints[id.0] = value;
        }
    }

    pub fn increment(&mut self, id: StateIntId, amount: i32) {
        if amount != 0 {
            let slot = &mut self.make_mut().ints[id.0];
            *slot = slot.saturating_add(amount);
        }
    }

    pub fn finish(self) -> StateOutcome {
        match self.owned {
            Some(state) if state != *self.base => StateOutcome::Changed(state),
            _ => StateOutcome::Unchanged,
        }
    }
}

impl StateRead for StateBuilder<'_> {
    fn get_bool(&self, id: StateBoolId) -> bool {
        self.current().get_bool(id)
    }

    fn get_int(&self, id: StateIntId) -> i32 {
        self.current().get_int(id)
    }
}

/// Every live reasoning path reaching a point of the logic. Kept in
/// insertion order with dominated members pruned; an infeasible point has
/// no union at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateUnion {
    states: Vec<State>,
}

impl StateUnion {
    pub fn single(state: State) -> Self {
        Self {
            states: vec![state],
        }
    }

    /// Builds a union from candidate states, or `None` if there are none.
    pub fn collect<I: IntoIterator<Item = State>>(states: I) -> Option<Self> {
        let mut union: Option<StateUnion> = None;
        for state in states {
            match union.as_mut() {
                Some(u) => {
                    u.insert(state);
                }
                None => union = Some(StateUnion::single(state)),
            }
        }
        union
    }

    /// Adds a state unless an existing member already dominates it, and
    /// drops existing members the new state dominates.
    pub fn insert(&mut self, state: State) -> bool {
        if self.states.iter().any(|s| s.dominates(&state)) {
            return false;
        }
        self.states.retain(|s| !state.dominates(s));
        self.states.push(state);
        true
    }

    pub fn merge(&mut self, other: StateUnion) {
        for state in other.states {
            self.insert(state);
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, State> {
        self.states.iter()
    }
}

impl Index<usize> for StateUnion {
    type Output = State;

    fn index(&self, index: usize) -> &State {
        &self.states[index]
    }
}

impl<'a> IntoIterator for &'a StateUnion {
    type Item = &'a State;
    type IntoIter = std::slice::Iter<'a, State>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}
