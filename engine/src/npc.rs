use crate::ability::{Ability, Catalog};
use crate::combatant::Combatant;
use crate::effects::disabling_status;
use crate::resolver::can_afford;
use crate::session::Action;
use crate::stats::effective_stats;
use crate::Dice;

const LOW_HEALTH_PCT: i64 = 30;
const FINISHER_PCT: i64 = 20;

fn below(c: &Combatant, pct: i64) -> bool {
    let max = effective_stats(c).max_health;
    c.current_health * 100 < max * pct
}

fn defensive(ability: &Ability) -> bool {
    ability.effects().iter().any(|e| e.heals_or_guards())
}

fn offensive(ability: &Ability) -> bool {
    ability.routine().is_some() || ability.effects().iter().any(|e| e.is_offensive())
}

/// Pick this round's action, or `None` when `npc` cannot act at all.
pub fn choose_action(npc: &Combatant, opponent: &Combatant, catalog: &Catalog, dice: &mut Dice) -> Option<Action> {
    if disabling_status(npc).is_some() || npc.is_down() {
        return None;
    }
    if let Some(bloodline) = npc.bloodline {
        if !npc.flags.bloodline_awakened && bloodline.can_awaken(npc, opponent) {
            return Some(Action::Awaken);
        }
    }

    let affordable: Vec<&Ability> = npc
        .moveset
        .iter()
        .filter_map(|name| catalog.get(name))
        .filter(|a| can_afford(a, npc))
        .collect();
    if affordable.is_empty() {
        return Some(Action::Rest);
    }

    let preferred: Vec<&Ability> = if below(npc, LOW_HEALTH_PCT) {
        affordable.iter().copied().filter(|a| defensive(a)).collect()
    } else if below(opponent, FINISHER_PCT) {
        affordable.iter().copied().filter(|a| offensive(a)).collect()
    } else {
        Vec::new()
    };
    let pool = if preferred.is_empty() { &affordable } else { &preferred };
    let pick = pool[dice.pick(pool.len())];
    Some(Action::Ability(pick.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::EffectSpec;
    use crate::effects::{Status, apply_status};
    use crate::stats::BaseStats;

    fn catalog() -> Catalog {
        let mut c = Catalog::new();
        c.insert(Ability::declarative(
            "Attack",
            0,
            vec![EffectSpec::Damage { formula: "user.power".parse().unwrap(), lifesteal_percent: None, accuracy_bonus: 0.0 }],
        ));
        c.insert(Ability::declarative(
            "Mend",
            5,
            vec![EffectSpec::Heal { formula: "user.max_health * 0.2".parse().unwrap() }],
        ));
        c.insert(Ability::declarative("Meteor", 50, vec![]));
        c
    }

    fn npc() -> Combatant {
        Combatant::new("npc", "Npc", BaseStats::new(100, 10, 10, 10)).with_moveset(["Attack", "Mend", "Meteor"])
    }

    #[test]
    fn stunned_npc_has_no_action() {
        let mut me = npc();
        let foe = npc();
        apply_status(&mut me, Status::named("stun"), 1, "test", false, |_| {});
        assert_eq!(choose_action(&me, &foe, &catalog(), &mut Dice::from_seed(1)), None);
    }

    #[test]
    fn broke_npc_rests() {
        let mut me = npc().with_moveset(["Meteor"]);
        me.chakra = 0;
        let foe = npc();
        assert_eq!(choose_action(&me, &foe, &catalog(), &mut Dice::from_seed(1)), Some(Action::Rest));
    }

    #[test]
    fn wounded_npc_prefers_healing() {
        let mut me = npc();
        me.current_health = 20;
        let foe = npc();
        for seed in 0..20 {
            let choice = choose_action(&me, &foe, &catalog(), &mut Dice::from_seed(seed));
            assert_eq!(choice, Some(Action::ability("Mend")));
        }
    }
}
