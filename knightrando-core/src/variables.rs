//! State-modifying logic variables.
//!
//! A variable is written in logic text as `$PREFIX` or `$PREFIX[p1,p2]`.
//! The prefix picks a variant of [`StateVariable`] once, when the logic is
//! parsed; every term and state slot the variant touches is bound at that
//! point.

use std::ops::RangeInclusive;

use crate::charms::{self, CHARM_COUNT};
use crate::progression::ProgressionManager;
use crate::state::{
    anticharm_bool_name, charm_bool_name, State, StateBoolId, StateBuilder, StateIntId,
    StateOutcome, StateRead, StateUnion, HAS_TAKEN_DAMAGE, OVERCHARMED, USED_NOTCHES,
};
use crate::terms::{LogicManager, TermId, CAN_BENCH, NOTCHES};
use crate::{RandoError, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VariablePrefix {
    EquipCharm,
    TakeDamage,
    BenchReset,
}

impl VariablePrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            VariablePrefix::EquipCharm => "$EQUIPPEDCHARM",
            VariablePrefix::TakeDamage => "$TAKEDAMAGE",
            VariablePrefix::BenchReset => "$BENCHRESET",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        [
            VariablePrefix::EquipCharm,
            VariablePrefix::TakeDamage,
            VariablePrefix::BenchReset,
        ]
        .into_iter()
        .find(|p| p.as_str() == name)
    }
}

/// Splits `$PREFIX[a,b]` into its prefix and parameters.
pub fn match_prefix(text: &str) -> Result<(VariablePrefix, Vec<String>)> {
    let (head, params) = match text.find('[') {
        Some(open) => {
            let inner = text[open + 1..].strip_suffix(']').ok_or_else(|| {
                RandoError::Config(format!("unterminated parameter list in '{}'", text))
            })?;
            let params = inner
                .split(',')
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            (&text[..open], params)
        }
        None => (text, Vec::new()),
    };

    let prefix = VariablePrefix::from_name(head)
        .ok_or_else(|| RandoError::Config(format!("unknown variable '{}'", text)))?;
    Ok((prefix, params))
}

/// Closed set of variable kinds the logic can refer to.
#[derive(Debug, Clone)]
pub enum StateVariable {
    EquipCharm(EquipCharmVariable),
    TakeDamage(TakeDamageVariable),
    BenchReset(BenchResetVariable),
}

impl StateVariable {
    pub fn resolve(lm: &LogicManager, text: &str) -> Result<Self> {
        let (prefix, params) = match_prefix(text)?;
        match prefix {
            VariablePrefix::EquipCharm => {
                let first = params.first().ok_or_else(|| {
                    RandoError::Config(format!("{} requires a charm parameter", text))
                })?;
                let charm = match first.parse::<usize>() {
                    Ok(id) => charms::charm_by_id(id),
                    Err(_) => charms::charm_by_term(first),
                }
                .ok_or_else(|| {
                    RandoError::Config(format!("unknown charm '{}' in '{}'", first, text))
                })?;
                EquipCharmVariable::new(text, charm.term, charm.id, lm)
                    .map(StateVariable::EquipCharm)
            }
            VariablePrefix::TakeDamage => {
                TakeDamageVariable::new(text, lm).map(StateVariable::TakeDamage)
            }
            VariablePrefix::BenchReset => {
                BenchResetVariable::new(text, lm).map(StateVariable::BenchReset)
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            StateVariable::EquipCharm(v) => &v.name,
            StateVariable::TakeDamage(v) => &v.name,
            StateVariable::BenchReset(v) => &v.name,
        }
    }

    /// Terms this variable reads from progression.
    pub fn terms(&self) -> Vec<TermId> {
        match self {
            StateVariable::EquipCharm(v) => vec![v.charm_term, v.can_bench_term, v.notches_term],
            StateVariable::TakeDamage(v) => v.fragile.iter().map(|f| f.charm_term).collect(),
            StateVariable::BenchReset(v) => vec![v.can_bench_term],
        }
    }

    /// Pure feasibility query over every live path. Never mutates.
    pub fn get_value(&self, pm: &ProgressionManager, local: Option<&StateUnion>) -> bool {
        match self {
            StateVariable::EquipCharm(v) => v.can_equip(pm, local) != EquipResult::None,
            StateVariable::TakeDamage(_) => local.is_some(),
            StateVariable::BenchReset(v) => local.is_some() && pm.has(v.can_bench_term),
        }
    }

    /// Applies the variable to one candidate state. Returns false, leaving
    /// the builder untouched, when the path cannot satisfy it.
    pub fn modify_state(&self, pm: &ProgressionManager, state: &mut StateBuilder<'_>) -> bool {
        match self {
            StateVariable::EquipCharm(v) => v.modify_state(pm, state),
            StateVariable::TakeDamage(v) => v.modify_state(pm, state),
            StateVariable::BenchReset(v) => v.modify_state(pm, state),
        }
    }

    pub fn apply(&self, pm: &ProgressionManager, state: &State) -> StateOutcome {
        let mut builder = StateBuilder::new(state);
        if self.modify_state(pm, &mut builder) {
            builder.finish()
        } else {
            StateOutcome::Infeasible
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EquipResult {
    None,
    Overcharm,
    Nonovercharm,
}

/// How a charm's notch cost is derived from the cost table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CostRule {
    Table,
    /// Fragile charms break on damage unless made unbreakable, and a broken
    /// charm can never fit.
    Fragile,
}

const COST_OVERRIDES: &[(RangeInclusive<usize>, CostRule)] = &[(23..=25, CostRule::Fragile)];

/// Charm term level at which a fragile charm no longer breaks.
pub const UNBREAKABLE_LEVEL: i32 = 2;

pub fn cost_rule(charm_id: usize) -> CostRule {
    COST_OVERRIDES
        .iter()
        .find(|(ids, _)| ids.contains(&charm_id))
        .map(|(_, rule)| *rule)
        .unwrap_or(CostRule::Table)
}

/// `$EQUIPPEDCHARM[charm]`: the charm is equipped on this path, paying its
/// notch cost from the notch budget or, once per path, by overcharming.
#[derive(Debug, Clone)]
pub struct EquipCharmVariable {
    name: String,
    charm_id: usize,
    cost_rule: CostRule,
    charm_term: TermId,
    can_bench_term: TermId,
    notches_term: TermId,
    charm_bool: StateBoolId,
    anticharm_bool: StateBoolId,
    overcharm_bool: StateBoolId,
    has_taken_damage: StateBoolId,
    used_notches: StateIntId,
}

impl EquipCharmVariable {
    pub fn new(name: &str, charm_term: &str, charm_id: usize, lm: &LogicManager) -> Result<Self> {
        Self::bind(name, charm_term, charm_id, lm).map_err(|e| match e {
            RandoError::Config(msg) => RandoError::Config(format!("{}: {}", name, msg)),
            other => other,
        })
    }

    fn bind(name: &str, charm_term: &str, charm_id: usize, lm: &LogicManager) -> Result<Self> {
        if charm_id == 0 || charm_id > CHARM_COUNT {
            return Err(RandoError::Config(format!("charm id {} out of range", charm_id)));
        }
        Ok(Self {
            name: name.to_string(),
            charm_id,
            cost_rule: cost_rule(charm_id),
            charm_term: lm.term_strict(charm_term)?,
            can_bench_term: lm.term_strict(CAN_BENCH)?,
            notches_term: lm.term_strict(NOTCHES)?,
            charm_bool: lm.bool_strict(&charm_bool_name(charm_id))?,
            anticharm_bool: lm.bool_strict(&anticharm_bool_name(charm_id))?,
            overcharm_bool: lm.bool_strict(OVERCHARMED)?,
            has_taken_damage: lm.bool_strict(HAS_TAKEN_DAMAGE)?,
            used_notches: lm.int_strict(USED_NOTCHES)?,
        })
    }

    pub fn name_for_id(charm_id: usize) -> String {
        format!("{}[{}]", VariablePrefix::EquipCharm.as_str(), charm_id)
    }

    pub fn charm_id(&self) -> usize {
        self.charm_id
    }

    pub fn cost_rule(&self) -> CostRule {
        self.cost_rule
    }

    pub fn notch_cost<S: StateRead>(&self, pm: &ProgressionManager, state: &S) -> i32 {
        let cost = pm.notch_cost(self.charm_id);
        match self.cost_rule {
            CostRule::Table => cost,
            CostRule::Fragile => {
                if state.get_bool(self.has_taken_damage) && pm.get(self.charm_term) < UNBREAKABLE_LEVEL
                {
                    i32::MAX
                } else {
                    cost
                }
            }
        }
    }

    pub fn has_charm_progression(&self, pm: &ProgressionManager) -> bool {
        pm.has(self.charm_term) && pm.has(self.can_bench_term)
    }

    fn has_state_requirements<S: StateRead>(&self, state: &S) -> bool {
        !state.get_bool(self.anticharm_bool)
    }

    pub fn can_equip_nonovercharm<S: StateRead>(&self, pm: &ProgressionManager, state: &S) -> bool {
        if !self.has_state_requirements(state) {
            return false;
        }
        let cost = self.notch_cost(pm, state);
        if cost <= 0 {
            return true;
        }
        if state.get_bool(self.charm_bool) {
            return !state.get_bool(self.overcharm_bool);
        }
        state.get_int(self.used_notches).saturating_add(cost) <= pm.get(self.notches_term)
    }

    pub fn can_equip_overcharm<S: StateRead>(&self, pm: &ProgressionManager, state: &S) -> bool {
        if !self.has_state_requirements(state) {
            return false;
        }
        if state.get_bool(self.charm_bool) {
            return true;
        }
        if state.get_bool(self.has_taken_damage) || state.get_bool(self.overcharm_bool) {
            return false;
        }
        state.get_int(self.used_notches) < pm.get(self.notches_term)
    }

    /// Scans the whole union for a path that fits without overcharming
    /// before accepting any overcharm path, regardless of path order.
    pub fn can_equip(&self, pm: &ProgressionManager, local: Option<&StateUnion>) -> EquipResult {
        let Some(union) = local else {
            return EquipResult::None;
        };
        if !self.has_charm_progression(pm) {
            return EquipResult::None;
        }
        if union.iter().any(|s| self.can_equip_nonovercharm(pm, s)) {
            return EquipResult::Nonovercharm;
        }
        if union.iter().any(|s| self.can_equip_overcharm(pm, s)) {
            return EquipResult::Overcharm;
        }
        EquipResult::None
    }

    pub fn can_equip_state<S: StateRead>(&self, pm: &ProgressionManager, state: &S) -> EquipResult {
        if !self.has_charm_progression(pm) || !self.has_state_requirements(state) {
            return EquipResult::None;
        }
        if self.can_equip_nonovercharm(pm, state) {
            EquipResult::Nonovercharm
        } else if self.can_equip_overcharm(pm, state) {
            EquipResult::Overcharm
        } else {
            EquipResult::None
        }
    }

    fn modify_state(&self, pm: &ProgressionManager, state: &mut StateBuilder<'_>) -> bool {
        if state.get_bool(self.charm_bool) {
            return true;
        }
        if !self.has_charm_progression(pm) || !self.has_state_requirements(state) {
            return false;
        }

        let cost = self.notch_cost(pm, state);
        if cost <= 0 {
            state.increment(self.used_notches, cost);
            state.set_bool(self.charm_bool, true);
            return true;
        }

        let net_notches = pm
            .get(self.notches_term)
            .saturating_sub(state.get_int(self.used_notches));
        if net_notches <= 0 {
            return false;
        }
        if net_notches < cost
            && (state.get_bool(self.has_taken_damage)
                || !state.try_set_bool_true(self.overcharm_bool))
        {
            return false;
        }

        state.increment(self.used_notches, cost);
        state.set_bool(self.charm_bool, true);
        true
    }
}

/// `$TAKEDAMAGE`: the path takes a hit, which locks out overcharming and
/// breaks fragile charms.
#[derive(Debug, Clone)]
pub struct TakeDamageVariable {
    name: String,
    has_taken_damage: StateBoolId,
    fragile: Vec<FragileCharm>,
}

#[derive(Debug, Clone)]
struct FragileCharm {
    charm_term: TermId,
    charm_bool: StateBoolId,
}

impl TakeDamageVariable {
    /// Fragile charms the world has no term for can never be equipped and
    /// are skipped.
    fn new(name: &str, lm: &LogicManager) -> Result<Self> {
        let fragile = (1..=CHARM_COUNT)
            .filter(|&id| cost_rule(id) == CostRule::Fragile)
            .filter_map(charms::charm_by_id)
            .filter_map(|charm| lm.term(charm.term).map(|term| (term, charm.id)))
            .map(|(charm_term, id)| {
                Ok(FragileCharm {
                    charm_term,
                    charm_bool: lm.bool_strict(&charm_bool_name(id))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.to_string(),
            has_taken_damage: lm.bool_strict(HAS_TAKEN_DAMAGE)?,
            fragile,
        })
    }

    /// Marks the path as damaged. Equipped fragile charms below the
    /// unbreakable level break and come off; their notches stay spent until
    /// the next bench.
    fn modify_state(&self, pm: &ProgressionManager, state: &mut StateBuilder<'_>) -> bool {
        state.set_bool(self.has_taken_damage, true);
        for charm in &self.fragile {
            if pm.get(charm.charm_term) < UNBREAKABLE_LEVEL {
                state.set_bool(charm.charm_bool, false);
            }
        }
        true
    }
}

/// `$BENCHRESET`: resting at a bench heals and unequips everything.
#[derive(Debug, Clone)]
pub struct BenchResetVariable {
    name: String,
    can_bench_term: TermId,
    has_taken_damage: StateBoolId,
    overcharm_bool: StateBoolId,
    used_notches: StateIntId,
    charm_bools: Vec<StateBoolId>,
}

impl BenchResetVariable {
    fn new(name: &str, lm: &LogicManager) -> Result<Self> {
        let charm_bools = (1..=CHARM_COUNT)
            .map(|id| lm.bool_strict(&charm_bool_name(id)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.to_string(),
            can_bench_term: lm.term_strict(CAN_BENCH)?,
            has_taken_damage: lm.bool_strict(HAS_TAKEN_DAMAGE)?,
            overcharm_bool: lm.bool_strict(OVERCHARMED)?,
            used_notches: lm.int_strict(USED_NOTCHES)?,
            charm_bools,
        })
    }

    fn modify_state(&self, pm: &ProgressionManager, state: &mut StateBuilder<'_>) -> bool {
        if !pm.has(self.can_bench_term) {
            return false;
        }
        state.set_bool(self.has_taken_damage, false);
        state.set_bool(self.overcharm_bool, false);
        state.set_int(self.used_notches, 0);
        for &charm in &self.charm_bools {
            state.set_bool(charm, false);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charms::CHARMS;

    struct Fixture {
        lm: LogicManager,
        pm: ProgressionManager,
    }

    impl Fixture {
        fn new(costs: Vec<i32>, notches: i32) -> Self {
            let lm = LogicManager::new(
                [CAN_BENCH, NOTCHES]
                    .into_iter()
                    .chain(CHARMS.iter().map(|c| c.term)),
            )
            .unwrap();
            let mut pm = ProgressionManager::new(&lm, costs);
            pm.set(lm.term_strict(CAN_BENCH).unwrap(), 1);
            pm.set(lm.term_strict(NOTCHES).unwrap(), notches);
            Fixture { lm, pm }
        }

        fn give(&mut self, term: &str, value: i32) {
            let id = self.lm.term_strict(term).unwrap();
            self.pm.set(id, value);
        }

        fn charm(&self, id: usize) -> EquipCharmVariable {
            match StateVariable::resolve(&self.lm, &EquipCharmVariable::name_for_id(id)).unwrap() {
                StateVariable::EquipCharm(v) => v,
                other => panic!("unexpected variable {:?}", other),
            }
        }

        fn state(&self, used: i32, damaged: bool, overcharmed: bool) -> State {
            let base = self.lm.state_schema().default_state();
            let mut b = StateBuilder::new(&base);
            b.increment(self.lm.int_strict(USED_NOTCHES).unwrap(), used);
            b.set_bool(self.lm.bool_strict(HAS_TAKEN_DAMAGE).unwrap(), damaged);
            b.set_bool(self.lm.bool_strict(OVERCHARMED).unwrap(), overcharmed);
            match b.finish() {
                StateOutcome::Changed(s) => s,
                _ => base,
            }
        }

        fn used(&self, state: &State) -> i32 {
            state.get_int(self.lm.int_strict(USED_NOTCHES).unwrap())
        }

        fn flag(&self, state: &State, name: &str) -> bool {
            state.get_bool(self.lm.bool_strict(name).unwrap())
        }
    }

    fn costs_with_first(cost: i32) -> Vec<i32> {
        let mut costs = vec![5; CHARM_COUNT];
        costs[0] = cost;
        costs
    }

    #[test]
    fn equips_within_budget() {
        let mut f = Fixture::new(costs_with_first(3), 5);
        f.give("Gathering_Swarm", 1);
        let charm = f.charm(1);
        let state = f.state(0, false, false);

        assert!(charm.can_equip_nonovercharm(&f.pm, &state));
        match StateVariable::EquipCharm(charm).apply(&f.pm, &state) {
            StateOutcome::Changed(next) => {
                assert_eq!(f.used(&next), 3);
                assert!(f.flag(&next, "CHARM1"));
                assert!(!f.flag(&next, OVERCHARMED));
            }
            other => panic!("expected equip, got {:?}", other),
        }
        assert_eq!(f.used(&state), 0);
    }

    #[test]
    fn overcharms_once_when_over_budget() {
        let mut f = Fixture::new(costs_with_first(3), 5);
        f.give("Gathering_Swarm", 1);
        let charm = f.charm(1);
        let state = f.state(4, false, false);

        assert!(!charm.can_equip_nonovercharm(&f.pm, &state));
        assert!(charm.can_equip_overcharm(&f.pm, &state));
        assert_eq!(charm.can_equip_state(&f.pm, &state), EquipResult::Overcharm);

        let next = match StateVariable::EquipCharm(charm.clone()).apply(&f.pm, &state) {
            StateOutcome::Changed(next) => next,
            other => panic!("expected overcharm, got {:?}", other),
        };
        assert_eq!(f.used(&next), 7);
        assert!(f.flag(&next, OVERCHARMED));
        assert!(f.flag(&next, "CHARM1"));
    }

    #[test]
    fn damage_locks_out_overcharm() {
        let mut f = Fixture::new(costs_with_first(3), 5);
        f.give("Gathering_Swarm", 1);
        let charm = f.charm(1);
        let state = f.state(4, true, false);

        assert!(!charm.can_equip_nonovercharm(&f.pm, &state));
        assert!(!charm.can_equip_overcharm(&f.pm, &state));
        assert_eq!(
            StateVariable::EquipCharm(charm).apply(&f.pm, &state),
            StateOutcome::Infeasible
        );
    }

    #[test]
    fn second_overcharm_on_a_path_fails() {
        let mut f = Fixture::new(costs_with_first(3), 5);
        f.give("Gathering_Swarm", 1);
        f.give("Wayward_Compass", 1);
        let state = f.state(4, false, true);

        let compass = f.charm(2);
        assert!(!compass.can_equip_overcharm(&f.pm, &state));
        assert_eq!(
            StateVariable::EquipCharm(compass).apply(&f.pm, &state),
            StateOutcome::Infeasible
        );
    }

    #[test]
    fn no_notches_left_fails() {
        let mut f = Fixture::new(costs_with_first(3), 5);
        f.give("Gathering_Swarm", 1);
        let charm = f.charm(1);
        let state = f.state(5, false, false);
        assert!(!charm.can_equip_overcharm(&f.pm, &state));
        assert_eq!(
            StateVariable::EquipCharm(charm).apply(&f.pm, &state),
            StateOutcome::Infeasible
        );
    }

    #[test]
    fn free_charms_ignore_used_notches() {
        for cost in [0, -1] {
            let mut f = Fixture::new(costs_with_first(cost), 3);
            f.give("Gathering_Swarm", 1);
            let charm = f.charm(1);
            let state = f.state(10, true, true);
            assert!(charm.can_equip_nonovercharm(&f.pm, &state));
            match StateVariable::EquipCharm(charm).apply(&f.pm, &state) {
                StateOutcome::Changed(next) => assert_eq!(f.used(&next), 10 + cost),
                other => panic!("expected free equip, got {:?}", other),
            }
        }
    }

    #[test]
    fn equipped_charm_is_reaffirmed_without_change() {
        let mut f = Fixture::new(costs_with_first(3), 5);
        f.give("Gathering_Swarm", 1);
        let charm = StateVariable::EquipCharm(f.charm(1));
        let state = f.state(0, false, false);
        let StateOutcome::Changed(equipped) = charm.apply(&f.pm, &state) else {
            panic!("first equip failed");
        };
        assert_eq!(charm.apply(&f.pm, &equipped), StateOutcome::Unchanged);
    }

    #[test]
    fn anticharm_blocks_equip() {
        let mut f = Fixture::new(costs_with_first(1), 5);
        f.give("Gathering_Swarm", 1);
        let charm = f.charm(1);
        let base = f.state(0, false, false);
        let mut b = StateBuilder::new(&base);
        b.set_bool(f.lm.bool_strict("noCHARM1").unwrap(), true);
        let StateOutcome::Changed(blocked) = b.finish() else { unreachable!() };

        assert!(!charm.can_equip_nonovercharm(&f.pm, &blocked));
        assert!(!charm.can_equip_overcharm(&f.pm, &blocked));
        assert_eq!(
            StateVariable::EquipCharm(charm).apply(&f.pm, &blocked),
            StateOutcome::Infeasible
        );
    }

    #[test]
    fn missing_progression_fails_immediately() {
        let mut f = Fixture::new(costs_with_first(1), 5);
        let charm = f.charm(1);
        let union = StateUnion::single(f.state(0, false, false));
        assert_eq!(charm.can_equip(&f.pm, Some(&union)), EquipResult::None);

        f.give("Gathering_Swarm", 1);
        f.give(CAN_BENCH, 0);
        assert_eq!(charm.can_equip(&f.pm, Some(&union)), EquipResult::None);
        f.give(CAN_BENCH, 1);
        assert_eq!(charm.can_equip(&f.pm, None), EquipResult::None);
        assert_eq!(charm.can_equip(&f.pm, Some(&union)), EquipResult::Nonovercharm);
    }

    #[test]
    fn union_prefers_nonovercharm_on_any_path() {
        let mut f = Fixture::new(costs_with_first(3), 5);
        f.give("Gathering_Swarm", 1);
        let charm = f.charm(1);

        let overcharm_only = f.state(4, false, false);
        let fits = f.state(0, true, false);
        let union = StateUnion::collect([overcharm_only.clone(), fits]).unwrap();
        assert_eq!(union.len(), 2);
        assert_eq!(union[0], overcharm_only);

        assert_eq!(charm.can_equip(&f.pm, Some(&union)), EquipResult::Nonovercharm);
        assert!(StateVariable::EquipCharm(charm).get_value(&f.pm, Some(&union)));
    }

    #[test]
    fn fragile_charm_breaks_after_damage() {
        let mut costs = vec![1; CHARM_COUNT];
        costs[22] = 2;
        let mut f = Fixture::new(costs, 5);
        f.give("Fragile_Heart", 1);
        let heart = f.charm(23);
        assert_eq!(heart.cost_rule(), CostRule::Fragile);

        let hurt = f.state(0, true, false);
        assert_eq!(heart.notch_cost(&f.pm, &hurt), i32::MAX);
        assert_eq!(heart.can_equip_state(&f.pm, &hurt), EquipResult::None);

        let fresh = f.state(0, false, false);
        assert_eq!(heart.notch_cost(&f.pm, &fresh), 2);

        f.give("Fragile_Heart", UNBREAKABLE_LEVEL);
        assert_eq!(heart.notch_cost(&f.pm, &hurt), 2);
        assert_eq!(heart.can_equip_state(&f.pm, &hurt), EquipResult::Nonovercharm);
    }

    #[test]
    fn damage_breaks_equipped_fragile_charm() {
        let mut costs = vec![1; CHARM_COUNT];
        costs[22] = 2;
        let mut f = Fixture::new(costs, 5);
        f.give("Fragile_Heart", 1);
        let heart = StateVariable::EquipCharm(f.charm(23));
        let damage = StateVariable::resolve(&f.lm, "$TAKEDAMAGE").unwrap();
        assert_eq!(damage.terms().len(), 3);

        let StateOutcome::Changed(equipped) = heart.apply(&f.pm, &f.state(0, false, false)) else {
            panic!("heart did not equip");
        };
        let StateOutcome::Changed(hurt) = damage.apply(&f.pm, &equipped) else {
            panic!("damage did not apply");
        };
        assert!(!f.flag(&hurt, "CHARM23"));
        assert_eq!(f.used(&hurt), 2);
        assert_eq!(heart.apply(&f.pm, &hurt), StateOutcome::Infeasible);

        f.give("Fragile_Heart", UNBREAKABLE_LEVEL);
        let StateOutcome::Changed(hurt) = damage.apply(&f.pm, &equipped) else {
            panic!("damage did not apply");
        };
        assert!(f.flag(&hurt, "CHARM23"));
        assert_eq!(heart.apply(&f.pm, &hurt), StateOutcome::Unchanged);
    }

    #[test]
    fn cost_rule_registry() {
        assert_eq!(cost_rule(22), CostRule::Table);
        assert_eq!(cost_rule(23), CostRule::Fragile);
        assert_eq!(cost_rule(25), CostRule::Fragile);
        assert_eq!(cost_rule(26), CostRule::Table);
    }

    #[test]
    fn charm_parameter_accepts_term_or_id() {
        let f = Fixture::new(costs_with_first(1), 3);
        let by_term = StateVariable::resolve(&f.lm, "$EQUIPPEDCHARM[Gathering_Swarm]").unwrap();
        let by_id = StateVariable::resolve(&f.lm, "$EQUIPPEDCHARM[1]").unwrap();
        match (by_term, by_id) {
            (StateVariable::EquipCharm(a), StateVariable::EquipCharm(b)) => {
                assert_eq!(a.charm_id(), 1);
                assert_eq!(b.charm_id(), 1);
            }
            _ => panic!("expected charm variables"),
        }
        assert!(StateVariable::resolve(&f.lm, "$EQUIPPEDCHARM[41]").is_err());
        assert!(StateVariable::resolve(&f.lm, "$EQUIPPEDCHARM[Not_A_Charm]").is_err());
        assert!(StateVariable::resolve(&f.lm, "$EQUIPPEDCHARM").is_err());
        assert!(StateVariable::resolve(&f.lm, "$EQUIPPEDCHARM[1").is_err());
        assert!(StateVariable::resolve(&f.lm, "$SHADESKIP").is_err());
    }

    #[test]
    fn take_damage_then_bench_reset() {
        let f = Fixture::new(costs_with_first(1), 3);
        let damage = StateVariable::resolve(&f.lm, "$TAKEDAMAGE").unwrap();
        let bench = StateVariable::resolve(&f.lm, "$BENCHRESET").unwrap();
        assert_eq!(bench.terms(), vec![f.lm.term_strict(CAN_BENCH).unwrap()]);

        let start = f.state(2, false, true);
        let StateOutcome::Changed(hurt) = damage.apply(&f.pm, &start) else {
            panic!("damage did not apply");
        };
        assert!(f.flag(&hurt, HAS_TAKEN_DAMAGE));

        let StateOutcome::Changed(rested) = bench.apply(&f.pm, &hurt) else {
            panic!("bench did not apply");
        };
        assert_eq!(rested, f.lm.state_schema().default_state());
    }
}
