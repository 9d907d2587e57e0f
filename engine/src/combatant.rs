use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::bloodline::Bloodline;
use crate::effects::Effect;
use crate::stats::{BaseStats, DEFAULT_ACCURACY, DEFAULT_DODGE};

/// `rounds_left` given to an ongoing ability each time its routine keeps it alive.
pub const ONGOING_SENTINEL: u32 = 99;

/// One-off switches set and read by specific abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleFlags {
    /// Set when a once-per-battle revive fires. Read by the revive trigger, Hakai Release
    /// and Gold Experience Requiem, which only grant a revive while this is unset.
    pub has_revived_this_battle: bool,
    /// Izanami: lethal damage leaves this combatant at 1 HP. Set and cleared by the `immortal`
    /// status; cleared early by Banana Killer and Gods Possession.
    pub izanami_immortal: bool,
    /// Izanami can only be cast once per battle.
    pub izanami_used: bool,
    /// Gods Possession at ≤10% HP: permanent immortality. Cleared by Banana Killer.
    pub permanent_immortal: bool,
    /// Gods Possession: the divine awakening has already happened.
    pub divine_immortality_triggered: bool,
    /// Banana Killer and Gods Possession: the holder is made to backflip. Narrative only.
    pub force_backflip: bool,
    /// Gods Possession: the holder's next action is cancelled. Consumed by the orchestrator.
    pub action_negated: bool,
    /// Eight Gates: number of gates opened (0..=7).
    pub eight_gates_level: u8,
    /// Bloodline awakening already spent.
    pub bloodline_awakened: bool,
}

impl BattleFlags {
    pub fn is_immortal(&self) -> bool {
        self.izanami_immortal || self.permanent_immortal
    }
}

/// Bookkeeping for an ability that re-invokes itself each round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OngoingAbility {
    pub ability: String,
    pub rounds_left: u32,
    /// Battle round of the first activation.
    pub activated_round: u32,
}

/// Persistent player/NPC snapshot a combatant is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub health: i64,
    pub power: i64,
    pub defense: i64,
    pub chakra: i64,
    #[serde(default = "default_accuracy")]
    pub accuracy: i64,
    #[serde(default = "default_dodge")]
    pub dodge: i64,
    #[serde(default)]
    pub jutsu: Vec<String>,
    #[serde(default)]
    pub bloodline: Option<Bloodline>,
    #[serde(default)]
    pub immunities: Vec<String>,
}

fn default_accuracy() -> i64 {
    DEFAULT_ACCURACY
}

fn default_dodge() -> i64 {
    DEFAULT_DODGE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Combatant {
    pub id: String,
    pub name: String,
    pub base: BaseStats,
    /// Signed during a round; clamped to max only when healed or revived.
    pub current_health: i64,
    pub chakra: i64,
    pub effects: Vec<Effect>,
    pub ongoing: Vec<OngoingAbility>,
    pub flags: BattleFlags,
    pub moveset: Vec<String>,
    /// Status names this combatant can never receive.
    pub immunities: Vec<String>,
    pub bloodline: Option<Bloodline>,
    /// Abilities used since the last combo fired.
    pub combo_progress: IndexSet<String>,
    /// Wheel of Fate Adaptation: hits taken per technique or damage-over-time status.
    pub adapted: IndexMap<String, u32>,
}

impl Combatant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, base: BaseStats) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            current_health: base.max_health,
            chakra: base.max_chakra,
            base,
            effects: Vec::new(),
            ongoing: Vec::new(),
            flags: BattleFlags::default(),
            moveset: vec!["Attack".to_string()],
            immunities: Vec::new(),
            bloodline: None,
            combo_progress: IndexSet::new(),
            adapted: IndexMap::new(),
        }
    }

    pub fn from_profile(profile: &Profile) -> Self {
        let base = BaseStats {
            max_health: profile.health,
            power: profile.power,
            defense: profile.defense,
            max_chakra: profile.chakra,
            accuracy: profile.accuracy,
            dodge: profile.dodge,
        };
        let mut c = Combatant::new(profile.id.clone(), profile.name.clone(), base);
        if !profile.jutsu.is_empty() {
            c.moveset = profile.jutsu.clone();
        }
        c.bloodline = profile.bloodline;
        c.immunities = profile.immunities.clone();
        c
    }

    pub fn with_moveset<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.moveset = moves.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_down(&self) -> bool {
        self.current_health <= 0
    }

    pub fn knows(&self, ability: &str) -> bool {
        self.moveset.iter().any(|m| m == ability)
    }

    /// Heal, clamped to max health. Returns the amount actually restored.
    pub fn heal(&mut self, amount: i64, mut log: impl FnMut(String)) -> i64 {
        if amount <= 0 {
            return 0;
        }
        let max = crate::stats::effective_stats(self).max_health;
        let before = self.current_health;
        self.current_health = before.saturating_add(amount).min(max).max(before);
        let restored = self.current_health - before;
        log(format!("[HEAL][{}] {} → {} (+{})", self.name, before, self.current_health, restored));
        restored
    }

    pub fn gain_chakra(&mut self, amount: i64, cap: i64) {
        self.chakra = self.chakra.saturating_add(amount).clamp(0, cap.max(0));
    }

    pub fn spend_chakra(&mut self, amount: i64) {
        self.chakra = (self.chakra - amount.max(0)).max(0);
    }

    pub fn ongoing_entry(&self, ability: &str) -> Option<&OngoingAbility> {
        self.ongoing.iter().find(|o| o.ability == ability)
    }
}
