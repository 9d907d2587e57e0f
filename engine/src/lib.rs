use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod ability;
pub mod api;
pub mod bloodline;
pub mod combatant;
pub mod config;
pub mod content;
pub mod effects;
pub mod error;
pub mod formula;
pub mod npc;
pub mod orchestrator;
pub mod resolver;
pub mod scripts;
pub mod session;
pub mod stats;

pub use ability::{Ability, AbilityKind, Catalog, CostType, EffectSpec, Rulebook};
pub use bloodline::Bloodline;
pub use combatant::{BattleFlags, Combatant, OngoingAbility, Profile};
pub use config::{BattleConfig, TurnOrder};
pub use effects::{Effect, EffectKind, Status, StatusKind};
pub use error::{BattleError, ScriptFault};
pub use formula::Formula;
pub use orchestrator::Phase;
pub use resolver::{AbilityResult, KillKind, OngoingDirective};
pub use session::{Action, ActionOutcome, ActionReport, BattleSession, EndReason, Outcome, RoundSummary};
pub use stats::{BaseStats, EffectiveStats, Stat, effective_stats};

/// Source of every random decision in a battle.
#[derive(Debug, Clone)]
pub struct Dice {
    rng: ChaCha8Rng,
    scripted: VecDeque<u32>,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed), scripted: VecDeque::new() }
    }

    /// Percent rolls are served from `rolls` first, then from a fixed stream.
    pub fn from_scripted(rolls: Vec<u32>) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(0), scripted: rolls.into() }
    }

    /// Roll 1..=100.
    pub fn percent(&mut self) -> u32 {
        match self.scripted.pop_front() {
            Some(roll) => roll.clamp(1, 100),
            None => self.rng.gen_range(1..=100),
        }
    }

    /// True when a percent roll lands at or under `chance`.
    pub fn chance(&mut self, chance: f64) -> bool {
        if chance >= 100.0 {
            return true;
        }
        if chance <= 0.0 {
            return false;
        }
        f64::from(self.percent()) <= chance
    }

    /// Uniform index into a slice of `len` items. `len` must be non-zero.
    pub fn pick(&mut self, len: usize) -> usize {
        match self.scripted.pop_front() {
            Some(roll) => roll as usize % len.max(1),
            None => self.rng.gen_range(0..len.max(1)),
        }
    }
}
