use serde::{Deserialize, Serialize};

use crate::combatant::Combatant;
use crate::effects::{Effect, Status, add_stat_effect, apply_status};
use crate::stats::{Stat, effective_stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bloodline {
    Senju,
    Uzumaki,
    Hyuga,
    Uchiha,
    Nara,
}

impl Bloodline {
    pub fn name(self) -> &'static str {
        match self {
            Bloodline::Senju => "Senju",
            Bloodline::Uzumaki => "Uzumaki",
            Bloodline::Hyuga => "Hyuga",
            Bloodline::Uchiha => "Uchiha",
            Bloodline::Nara => "Nara",
        }
    }

    fn source(self) -> String {
        format!("{} Awakening", self.name())
    }

    /// Whether the awakening requirements hold right now. Does not check whether it was spent.
    pub fn can_awaken(self, holder: &Combatant, opponent: &Combatant) -> bool {
        let half = effective_stats(holder).max_health / 2;
        match self {
            Bloodline::Senju | Bloodline::Uzumaki | Bloodline::Uchiha => holder.current_health <= half,
            Bloodline::Hyuga => holder.chakra >= 15 && opponent.chakra > 0,
            Bloodline::Nara => holder.chakra >= 30,
        }
    }

    /// End-of-round trait.
    pub fn passive(self, holder: &mut Combatant, opponent: &mut Combatant, chakra_cap: i64, mut log: impl FnMut(String)) {
        let max = effective_stats(holder).max_health;
        match self {
            Bloodline::Senju => {
                holder.heal((max / 100).max(1), &mut log);
            }
            Bloodline::Uzumaki => {
                holder.heal((max / 10).max(1), &mut log);
            }
            Bloodline::Hyuga => {
                let taken = steal_chakra(holder, opponent, 1, chakra_cap);
                if taken > 0 {
                    log(format!("[CHAKRA][{}] drains {} chakra from {}", holder.name, taken, opponent.name));
                }
            }
            Bloodline::Uchiha => {
                let bonus = (effective_stats(holder).dodge / 2).max(5);
                let deltas = [(Stat::Dodge, bonus)].into_iter().collect();
                add_stat_effect(holder, Effect::buff(deltas, 1, "Sharingan"));
            }
            Bloodline::Nara => {
                holder.gain_chakra(3, chakra_cap);
            }
        }
    }

    /// Spend the awakening. The caller checks [`Bloodline::can_awaken`] and the spent flag.
    pub fn awaken(
        self,
        holder: &mut Combatant,
        opponent: &mut Combatant,
        chakra_cap: i64,
        mut log: impl FnMut(String),
    ) -> String {
        holder.flags.bloodline_awakened = true;
        let source = self.source();
        match self {
            Bloodline::Senju => {
                let max = effective_stats(holder).max_health;
                let healed = holder.heal(max / 2, &mut log);
                format!("{} awakens the Senju bloodline and recovers {} HP", holder.name, healed)
            }
            Bloodline::Uzumaki => {
                holder.chakra = holder.chakra.max(15).min(chakra_cap.max(0));
                apply_status(opponent, Status::named("stun"), 2, &source, false, &mut log);
                let cut = opponent.base.defense * 60 / 100;
                let deltas = [(Stat::Defense, -cut)].into_iter().collect();
                add_stat_effect(opponent, Effect::debuff(deltas, 2, source));
                format!("{} awakens the Uzumaki bloodline and seals {}", holder.name, opponent.name)
            }
            Bloodline::Hyuga => {
                let mut taken = steal_chakra(holder, opponent, 5, chakra_cap);
                if holder.chakra >= 20 {
                    taken += steal_chakra(holder, opponent, 30, chakra_cap);
                }
                format!("{} awakens the Byakugan and drains {} chakra", holder.name, taken)
            }
            Bloodline::Uchiha => {
                apply_status(opponent, Status::named("stun"), 2, &source, false, &mut log);
                let guard = holder.base.defense.saturating_mul(5);
                let deltas = [(Stat::Defense, guard)].into_iter().collect();
                add_stat_effect(holder, Effect::buff(deltas, 2, source));
                format!("{} awakens the Mangekyo Sharingan", holder.name)
            }
            Bloodline::Nara => {
                apply_status(opponent, Status::named("stun"), 2, &source, false, &mut log);
                format!("{} binds {} with the Nara shadow", holder.name, opponent.name)
            }
        }
    }
}

fn steal_chakra(holder: &mut Combatant, opponent: &mut Combatant, up_to: i64, cap: i64) -> i64 {
    let taken = up_to.min(opponent.chakra).max(0);
    opponent.chakra -= taken;
    holder.gain_chakra(taken, cap);
    taken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::disabling_status;
    use crate::stats::BaseStats;

    fn fighter(bloodline: Bloodline) -> Combatant {
        let mut c = Combatant::new("a", "A", BaseStats::new(100, 10, 10, 40));
        c.bloodline = Some(bloodline);
        c
    }

    #[test]
    fn senju_needs_half_health() {
        let mut a = fighter(Bloodline::Senju);
        let b = fighter(Bloodline::Nara);
        assert!(!Bloodline::Senju.can_awaken(&a, &b));
        a.current_health = 50;
        assert!(Bloodline::Senju.can_awaken(&a, &b));
    }

    #[test]
    fn hyuga_awakening_drains_in_two_steps() {
        let mut a = fighter(Bloodline::Hyuga);
        let mut b = fighter(Bloodline::Senju);
        a.chakra = 16;
        b.chakra = 100;
        let mut log = Vec::new();
        Bloodline::Hyuga.awaken(&mut a, &mut b, 999, |m| log.push(m));
        assert_eq!(a.chakra, 16 + 5 + 30);
        assert_eq!(b.chakra, 65);
        assert!(a.flags.bloodline_awakened);
    }

    #[test]
    fn nara_awakening_stuns() {
        let mut a = fighter(Bloodline::Nara);
        let mut b = fighter(Bloodline::Uchiha);
        Bloodline::Nara.awaken(&mut a, &mut b, 999, |_| {});
        assert!(disabling_status(&b).is_some());
    }
}
