use rand::Rng;

pub const CHARM_COUNT: usize = 40;

/// Upper bound for a single randomized notch cost.
pub const MAX_NOTCH_COST: i32 = 6;

#[derive(Copy, Clone, Debug)]
pub struct CharmInfo {
    pub id: usize,
    pub term: &'static str,
    pub name: &'static str,
    pub vanilla_cost: i32,
}

pub const CHARMS: [CharmInfo; CHARM_COUNT] = [
    CharmInfo { id: 1, term: "Gathering_Swarm", name: "Gathering Swarm", vanilla_cost: 1 },
    CharmInfo { id: 2, term: "Wayward_Compass", name: "Wayward Compass", vanilla_cost: 1 },
    CharmInfo { id: 3, term: "Grubsong", name: "Grubsong", vanilla_cost: 1 },
    CharmInfo { id: 4, term: "Stalwart_Shell", name: "Stalwart Shell", vanilla_cost: 2 },
    CharmInfo { id: 5, term: "Baldur_Shell", name: "Baldur Shell", vanilla_cost: 2 },
    CharmInfo { id: 6, term: "Fury_of_the_Fallen", name: "Fury of the Fallen", vanilla_cost: 2 },
    CharmInfo { id: 7, term: "Quick_Focus", name: "Quick Focus", vanilla_cost: 3 },
    CharmInfo { id: 8, term: "Lifeblood_Heart", name: "Lifeblood Heart", vanilla_cost: 2 },
    CharmInfo { id: 9, term: "Lifeblood_Core", name: "Lifeblood Core", vanilla_cost: 3 },
    CharmInfo { id: 10, term: "Defender's_Crest", name: "Defender's Crest", vanilla_cost: 1 },
    CharmInfo { id: 11, term: "Flukenest", name: "Flukenest", vanilla_cost: 3 },
    CharmInfo { id: 12, term: "Thorns_of_Agony", name: "Thorns of Agony", vanilla_cost: 1 },
    CharmInfo { id: 13, term: "Mark_of_Pride", name: "Mark of Pride", vanilla_cost: 3 },
    CharmInfo { id: 14, term: "Steady_Body", name: "Steady Body", vanilla_cost: 1 },
    CharmInfo { id: 15, term: "Heavy_Blow", name: "Heavy Blow", vanilla_cost: 2 },
    CharmInfo { id: 16, term: "Sharp_Shadow", name: "Sharp Shadow", vanilla_cost: 2 },
    CharmInfo { id: 17, term: "Spore_Shroom", name: "Spore Shroom", vanilla_cost: 1 },
    CharmInfo { id: 18, term: "Longnail", name: "Longnail", vanilla_cost: 2 },
    CharmInfo { id: 19, term: "Shaman_Stone", name: "Shaman Stone", vanilla_cost: 3 },
    CharmInfo { id: 20, term: "Soul_Catcher", name: "Soul Catcher", vanilla_cost: 2 },
    CharmInfo { id: 21, term: "Soul_Eater", name: "Soul Eater", vanilla_cost: 4 },
    CharmInfo { id: 22, term: "Glowing_Womb", name: "Glowing Womb", vanilla_cost: 2 },
    CharmInfo { id: 23, term: "Fragile_Heart", name: "Fragile Heart", vanilla_cost: 2 },
    CharmInfo { id: 24, term: "Fragile_Greed", name: "Fragile Greed", vanilla_cost: 2 },
    CharmInfo { id: 25, term: "Fragile_Strength", name: "Fragile Strength", vanilla_cost: 3 },
    CharmInfo { id: 26, term: "Nailmaster's_Glory", name: "Nailmaster's Glory", vanilla_cost: 1 },
    CharmInfo { id: 27, term: "Joni's_Blessing", name: "Joni's Blessing", vanilla_cost: 4 },
    CharmInfo { id: 28, term: "Shape_of_Unn", name: "Shape of Unn", vanilla_cost: 2 },
    CharmInfo { id: 29, term: "Hiveblood", name: "Hiveblood", vanilla_cost: 4 },
    CharmInfo { id: 30, term: "Dream_Wielder", name: "Dream Wielder", vanilla_cost: 1 },
    CharmInfo { id: 31, term: "Dashmaster", name: "Dashmaster", vanilla_cost: 2 },
    CharmInfo { id: 32, term: "Quick_Slash", name: "Quick Slash", vanilla_cost: 3 },
    CharmInfo { id: 33, term: "Spell_Twister", name: "Spell Twister", vanilla_cost: 2 },
    CharmInfo { id: 34, term: "Deep_Focus", name: "Deep Focus", vanilla_cost: 4 },
    CharmInfo { id: 35, term: "Grubberfly's_Elegy", name: "Grubberfly's Elegy", vanilla_cost: 3 },
    CharmInfo { id: 36, term: "Kingsoul", name: "Kingsoul", vanilla_cost: 5 },
    CharmInfo { id: 37, term: "Sprintmaster", name: "Sprintmaster", vanilla_cost: 1 },
    CharmInfo { id: 38, term: "Dreamshield", name: "Dreamshield", vanilla_cost: 3 },
    CharmInfo { id: 39, term: "Weaversong", name: "Weaversong", vanilla_cost: 2 },
    CharmInfo { id: 40, term: "Grimmchild", name: "Grimmchild", vanilla_cost: 2 },
];

/// Looks up a charm by its 1-based id.
pub fn charm_by_id(id: usize) -> Option<&'static CharmInfo> {
    id.checked_sub(1).and_then(|idx| CHARMS.get(idx))
}

pub fn charm_by_term(term: &str) -> Option<&'static CharmInfo> {
    CHARMS.iter().find(|c| c.term == term)
}

pub fn vanilla_costs() -> Vec<i32> {
    CHARMS.iter().map(|c| c.vanilla_cost).collect()
}

/// Draws every slot independently and uniformly from `min..=max`.
pub fn random_costs<R: Rng>(rng: &mut R, min: i32, max: i32) -> Vec<i32> {
    (0..CHARM_COUNT).map(|_| rng.gen_range(min..=max)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn ids_match_table_position() {
        for (idx, charm) in CHARMS.iter().enumerate() {
            assert_eq!(charm.id, idx + 1);
        }
        assert!(charm_by_id(0).is_none());
        assert!(charm_by_id(41).is_none());
        assert_eq!(charm_by_id(36).map(|c| c.term), Some("Kingsoul"));
    }

    #[test]
    fn term_lookup() {
        assert_eq!(charm_by_term("Fragile_Greed").map(|c| c.id), Some(24));
        assert!(charm_by_term("Fragile Greed").is_none());
    }

    #[test]
    fn random_costs_stay_in_range_and_repeat_for_a_seed() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let first = random_costs(&mut a, 1, 4);
        assert_eq!(first.len(), CHARM_COUNT);
        assert!(first.iter().all(|&c| (1..=4).contains(&c)));
        assert_eq!(first, random_costs(&mut b, 1, 4));
    }

    #[test]
    fn vanilla_total() {
        assert_eq!(vanilla_costs().iter().sum::<i32>(), 90);
    }
}
