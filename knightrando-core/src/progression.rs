use std::sync::Arc;

use crate::terms::{LogicManager, TermId};

/// A change to one term's value when an item is obtained.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TermEffect {
    pub term: TermId,
    pub amount: i32,
}

/// Current value of every term, plus the notch-cost table that charm
/// evaluation reads.
#[derive(Clone, Debug)]
pub struct ProgressionManager {
    values: Vec<i32>,
    notch_costs: Arc<[i32]>,
}

impl ProgressionManager {
    pub fn new(lm: &LogicManager, notch_costs: Vec<i32>) -> Self {
        Self {
            values: vec![0; lm.term_count()],
            notch_costs: notch_costs.into(),
        }
    }

    pub fn get(&self, term: TermId) -> i32 {
        self.values[term.index()]
    }

    pub fn has(&self, term: TermId) -> bool {
        self.get(term) > 0
    }

    pub fn set(&mut self, term: TermId, value: i32) {
        self.values[term.index()] = value;
    }

    pub fn increment(&mut self, term: TermId, amount: i32) {
        let slot = &mut self.values[term.index()];
        *slot = slot.saturating_add(amount);
    }

    pub fn add(&mut self, effects: &[TermEffect]) {
        for effect in effects {
            self.increment(effect.term, effect.amount);
        }
    }

    /// Notch cost of a charm by 1-based id. Charms outside the table cost
    /// nothing.
    pub fn notch_cost(&self, charm_id: usize) -> i32 {
        charm_id
            .checked_sub(1)
            .and_then(|idx| self.notch_costs.get(idx))
            .copied()
            .unwrap_or(0)
    }

    pub fn notch_costs(&self) -> &[i32] {
        &self.notch_costs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effects_accumulate() {
        let lm = LogicManager::new(["NOTCHES", "Grubsong"]).unwrap();
        let notches = lm.term_strict("NOTCHES").unwrap();
        let mut pm = ProgressionManager::new(&lm, vec![1, 2, 3]);
        pm.set(notches, 3);
        pm.add(&[
            TermEffect { term: notches, amount: 1 },
            TermEffect { term: notches, amount: 1 },
        ]);
        assert_eq!(pm.get(notches), 5);
        assert!(!pm.has(lm.term_strict("Grubsong").unwrap()));
    }

    #[test]
    fn notch_cost_lookup_is_one_based() {
        let lm = LogicManager::new(["NOTCHES"]).unwrap();
        let pm = ProgressionManager::new(&lm, vec![1, 2, 3]);
        assert_eq!(pm.notch_cost(1), 1);
        assert_eq!(pm.notch_cost(3), 3);
        assert_eq!(pm.notch_cost(0), 0);
        assert_eq!(pm.notch_cost(4), 0);
    }
}
