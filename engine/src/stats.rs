use serde::{Deserialize, Serialize};

use crate::combatant::Combatant;
use crate::effects::{EffectKind, StatusKind};

pub const DEFAULT_ACCURACY: i64 = 100;
pub const DEFAULT_DODGE: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Power,
    Defense,
    Chakra,
    Health,
    Accuracy,
    Dodge,
}

/// Profile stats, fixed for the whole battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BaseStats {
    pub max_health: i64,
    pub power: i64,
    pub defense: i64,
    pub max_chakra: i64,
    #[serde(default = "default_accuracy")]
    pub accuracy: i64,
    #[serde(default = "default_dodge")]
    pub dodge: i64,
}

fn default_accuracy() -> i64 {
    DEFAULT_ACCURACY
}

fn default_dodge() -> i64 {
    DEFAULT_DODGE
}

impl BaseStats {
    pub fn new(max_health: i64, power: i64, defense: i64, max_chakra: i64) -> Self {
        Self {
            max_health,
            power,
            defense,
            max_chakra,
            accuracy: DEFAULT_ACCURACY,
            dodge: DEFAULT_DODGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectiveStats {
    pub power: i64,
    pub defense: i64,
    pub chakra: i64,
    pub max_health: i64,
    /// Current health, unclamped.
    pub health: i64,
    pub accuracy: i64,
    pub dodge: i64,
}

impl EffectiveStats {
    pub fn get(&self, stat: Stat) -> i64 {
        match stat {
            Stat::Power => self.power,
            Stat::Defense => self.defense,
            Stat::Chakra => self.chakra,
            Stat::Health => self.max_health,
            Stat::Accuracy => self.accuracy,
            Stat::Dodge => self.dodge,
        }
    }

    fn add(&mut self, stat: Stat, delta: i64) {
        let slot = match stat {
            Stat::Power => &mut self.power,
            Stat::Defense => &mut self.defense,
            Stat::Chakra => &mut self.chakra,
            Stat::Health => &mut self.max_health,
            Stat::Accuracy => &mut self.accuracy,
            Stat::Dodge => &mut self.dodge,
        };
        *slot = slot.saturating_add(delta);
    }
}

/// Base stats folded with every active buff, debuff and stat-bearing status.
///
/// Pure; call again after any effect change.
pub fn effective_stats(c: &Combatant) -> EffectiveStats {
    let mut s = EffectiveStats {
        power: c.base.power,
        defense: c.base.defense,
        chakra: c.chakra,
        max_health: c.base.max_health,
        health: c.current_health,
        accuracy: c.base.accuracy,
        dodge: c.base.dodge,
    };
    let mut frosted = false;

    for effect in &c.effects {
        match &effect.kind {
            EffectKind::Buff { stats } | EffectKind::Debuff { stats } => {
                for (stat, delta) in stats {
                    s.add(*stat, *delta);
                }
            }
            EffectKind::Status(status) => {
                if StatusKind::of(status) == StatusKind::Frost {
                    frosted = true;
                }
                s.accuracy = s.accuracy.saturating_add(status.accuracy_modifier);
                s.dodge = s.dodge.saturating_add(status.dodge);
            }
            EffectKind::ChakraDrain { .. } => {}
        }
    }

    if frosted {
        s.power = s.power.saturating_mul(85) / 100;
        s.defense = s.defense.saturating_mul(85) / 100;
    }

    s.power = s.power.max(0);
    s.defense = s.defense.max(0);
    s.chakra = s.chakra.max(0);
    s.max_health = s.max_health.max(1);
    s.accuracy = s.accuracy.clamp(5, 100);
    s.dodge = s.dodge.clamp(0, 80);
    s
}
