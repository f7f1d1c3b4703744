use sha2::{Digest, Sha256};

use crate::context::RandoContext;
use crate::Result;

const DELIMITER: &str = ";";

/// Text the verification hash is computed over: serialized settings, the
/// notch-cost table, then every item and transition placement in order.
pub fn hash_input(ctx: &RandoContext) -> Result<String> {
    let mut sb = serde_json::to_string(&ctx.settings)?;

    if let Some(costs) = &ctx.notch_costs {
        let joined: Vec<String> = costs.iter().map(|c| c.to_string()).collect();
        sb.push_str(&joined.join(DELIMITER));
    }

    for placement in &ctx.item_placements {
        sb.push_str(&placement.item);
        sb.push_str(&placement.location);
        sb.push_str(DELIMITER);
    }

    if let Some(transitions) = &ctx.transition_placements {
        for placement in transitions {
            sb.push_str(&placement.source);
            sb.push_str(&placement.target);
            sb.push_str(DELIMITER);
        }
    }

    Ok(sb)
}

pub fn verification_hash(ctx: &RandoContext) -> Result<i32> {
    let digest = Sha256::digest(hash_input(ctx)?.as_bytes());
    Ok(fold_digest(&digest))
}

/// Folds digest bytes into a single signed integer.
pub fn fold_digest(bytes: &[u8]) -> i32 {
    bytes
        .iter()
        .fold(17i32, |seed, &b| seed.wrapping_mul(31) ^ i32::from(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ItemPlacement, TransitionPlacement};
    use crate::settings::{GenerationSettings, StartLocationType};

    fn context() -> RandoContext {
        let mut ctx = RandoContext::new(GenerationSettings::default());
        ctx.notch_costs = Some(vec![1, 2, 3]);
        ctx.item_placements = vec![
            ItemPlacement {
                item: "Mantis_Claw".to_string(),
                location: "Mantis_Village".to_string(),
            },
            ItemPlacement {
                item: "Grubsong".to_string(),
                location: "Grub_Father".to_string(),
            },
        ];
        ctx
    }

    #[test]
    fn fold_of_small_inputs() {
        assert_eq!(fold_digest(&[]), 17);
        assert_eq!(fold_digest(&[1]), (17 * 31) ^ 1);
        assert_eq!(fold_digest(&[1, 2]), (((17 * 31) ^ 1) * 31) ^ 2);
    }

    #[test]
    fn input_lists_costs_then_placements() {
        let input = hash_input(&context()).unwrap();
        assert!(input.ends_with("1;2;3Mantis_ClawMantis_Village;GrubsongGrub_Father;"));
    }

    #[test]
    fn costs_and_placements_share_the_delimiter() {
        let ctx = context();
        let input = hash_input(&ctx).unwrap();
        let settings = serde_json::to_string(&ctx.settings).unwrap();
        let tail = input.strip_prefix(settings.as_str()).unwrap();
        assert_eq!(
            tail.split(DELIMITER).collect::<Vec<_>>(),
            vec!["1", "2", "3Mantis_ClawMantis_Village", "GrubsongGrub_Father", ""]
        );
    }

    #[test]
    fn transitions_follow_items() {
        let mut ctx = context();
        ctx.transition_placements = Some(vec![TransitionPlacement {
            source: "Town[left1]".to_string(),
            target: "Tutorial_01[right1]".to_string(),
        }]);
        let input = hash_input(&ctx).unwrap();
        assert!(input.ends_with("Grub_Father;Town[left1]Tutorial_01[right1];"));
    }

    #[test]
    fn hash_tracks_settings_and_order() {
        let base = verification_hash(&context()).unwrap();
        assert_eq!(base, verification_hash(&context()).unwrap());

        let mut other = context();
        other.settings.start_location.start_location_type = StartLocationType::Random;
        assert_ne!(base, verification_hash(&other).unwrap());

        let mut swapped = context();
        swapped.item_placements.reverse();
        assert_ne!(base, verification_hash(&swapped).unwrap());
    }
}
