mod ongoing;
mod strikes;
mod tricks;

use std::collections::HashMap;
use std::fmt;

use crate::ability::{Ability, Rulebook};
use crate::combatant::Combatant;
use crate::effects::{self, Application, Effect, StatDeltas, Status, add_stat_effect, apply_status};
use crate::error::ScriptFault;
use crate::formula::Formula;
use crate::resolver::{AbilityResult, Context};
use crate::stats::{EffectiveStats, Stat, effective_stats};
use crate::Dice;

pub type Routine = fn(&mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault>;

/// Everything a routine may read or touch during one invocation.
pub struct ScriptContext<'a> {
    pub user: &'a mut Combatant,
    pub target: &'a mut Combatant,
    pub ability: &'a Ability,
    pub rulebook: &'a Rulebook,
    pub dice: &'a mut Dice,
    pub round: u32,
    pub activation_round: u32,
    pub is_first_activation: bool,
    pub chakra_cap: i64,
    /// Chakra spent on this cast before the routine ran.
    pub paid: i64,
    pub effective_user: EffectiveStats,
    pub effective_target: EffectiveStats,
    notes: Vec<String>,
}

impl<'a> ScriptContext<'a> {
    pub fn new(
        user: &'a mut Combatant,
        target: &'a mut Combatant,
        ability: &'a Ability,
        ctx: &'a mut Context<'_>,
        paid: i64,
    ) -> Self {
        let effective_user = effective_stats(user);
        let effective_target = effective_stats(target);
        Self {
            user,
            target,
            ability,
            rulebook: ctx.rulebook,
            dice: &mut *ctx.dice,
            round: ctx.round,
            activation_round: ctx.activation_round,
            is_first_activation: ctx.is_first_activation,
            chakra_cap: ctx.chakra_cap,
            paid,
            effective_user,
            effective_target,
            notes: Vec::new(),
        }
    }

    /// Recompute effective stats after changing effects.
    pub fn refresh(&mut self) {
        self.effective_user = effective_stats(self.user);
        self.effective_target = effective_stats(self.target);
    }

    pub fn result(&self, description: impl Into<String>) -> AbilityResult {
        AbilityResult::new(&self.ability.name, description)
    }

    pub fn miss(&self, description: impl Into<String>, note: impl Into<String>) -> AbilityResult {
        AbilityResult::miss(&self.ability.name, description, note)
    }

    /// Fault for a routine that hit something it cannot handle.
    pub fn fault(&self, reason: impl Into<String>) -> ScriptFault {
        ScriptFault::Failed { routine: self.ability.name.clone(), reason: reason.into() }
    }

    pub fn formula(&self, text: &str) -> Result<Formula, ScriptFault> {
        text.parse().map_err(|e: crate::formula::FormulaError| self.fault(e.to_string()))
    }

    /// Effective power over effective defense; zero defense divides by one.
    pub fn ratio(&self) -> f64 {
        self.effective_user.power as f64 / self.effective_target.defense.max(1) as f64
    }

    /// `base * power / defense`, floored, never below 1.
    pub fn strike(&self, base: f64) -> i64 {
        ((base * self.ratio()).floor() as i64).max(1)
    }

    pub fn percent_of_max(&self, fraction: f64) -> i64 {
        (self.effective_user.max_health as f64 * fraction).floor() as i64
    }

    pub fn buff_user(&mut self, stats: StatDeltas, duration: u32) {
        add_stat_effect(self.user, Effect::buff(stats, duration, self.ability.name.clone()));
        self.refresh();
    }

    pub fn debuff_target(&mut self, stats: StatDeltas, duration: u32) {
        add_stat_effect(self.target, Effect::debuff(stats, duration, self.ability.name.clone()));
        self.refresh();
    }

    pub fn status_user(&mut self, status: Status, duration: u32) -> Application {
        let notes = &mut self.notes;
        let applied = apply_status(self.user, status, duration, &self.ability.name, false, |m| notes.push(m));
        self.refresh();
        applied
    }

    pub fn status_target(&mut self, status: Status, duration: u32) -> Application {
        let notes = &mut self.notes;
        let applied = apply_status(self.target, status, duration, &self.ability.name, false, |m| notes.push(m));
        self.refresh();
        applied
    }

    /// Named status that blocks negative statuses on the user.
    pub fn grant_immunity(&mut self, name: &str, duration: u32) -> Application {
        let mut status = Status::named(name);
        status.grants_immunity = true;
        self.status_user(status, duration)
    }

    pub fn cleanse_user(&mut self) -> Vec<String> {
        let notes = &mut self.notes;
        let removed = effects::cleanse(self.user, |m| notes.push(m));
        self.refresh();
        removed
    }

    /// Deduct upkeep chakra; `false` (and nothing spent) when the user cannot cover it.
    pub fn pay_upkeep(&mut self, cost: i64) -> bool {
        if self.user.chakra < cost {
            return false;
        }
        self.user.spend_chakra(cost);
        self.refresh();
        true
    }

    pub(crate) fn take_notes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notes)
    }
}

/// `[(Power, 10)]` → stat delta map.
pub fn deltas(entries: &[(Stat, i64)]) -> StatDeltas {
    entries.iter().copied().collect()
}

#[derive(Clone, Default)]
pub struct ScriptRegistry {
    routines: HashMap<String, Routine>,
}

impl fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.routines.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("ScriptRegistry").field("routines", &ids).finish()
    }
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every routine shipped with the engine.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.register("susano_slash", strikes::susano_slash);
        reg.register("indra_arrow", strikes::indra_arrow);
        reg.register("punisher_shield", strikes::punisher_shield);
        reg.register("world_cutting_slash", strikes::world_cutting_slash);
        reg.register("violent_fierce_god_slicer", strikes::violent_fierce_god_slicer);
        reg.register("perfect_sage", strikes::perfect_sage);
        reg.register("hakai_release", strikes::hakai_release);
        reg.register("vermillion_pulse", strikes::vermillion_pulse);
        reg.register("full_counter", strikes::full_counter);

        reg.register("shadow_possession", ongoing::shadow_possession);
        reg.register("water_prison", ongoing::water_prison);
        reg.register("ikari", ongoing::ikari);
        reg.register("creation_rebirth", ongoing::creation_rebirth);
        reg.register("gods_possession", ongoing::gods_possession);
        reg.register("planetary_devastation", ongoing::planetary_devastation);

        reg.register("banana_killer", tricks::banana_killer);
        reg.register("izanagi", tricks::izanagi);
        reg.register("izanami", tricks::izanami);
        reg.register("urashiki_jutsu_steal", tricks::urashiki_jutsu_steal);
        reg.register("raiders_tower", tricks::raiders_tower);
        reg.register("praise_jashin", tricks::praise_jashin);
        reg.register("gold_experience_requiem", tricks::gold_experience_requiem);
        reg.register("eight_gates", tricks::eight_gates);
        reg.register("flowing_red_scale", tricks::flowing_red_scale);
        reg.register("perfect_susanoo", tricks::perfect_susanoo);
        reg
    }

    /// Add or replace a routine.
    pub fn register(&mut self, id: impl Into<String>, routine: Routine) {
        self.routines.insert(id.into(), routine);
    }

    pub fn get(&self, id: &str) -> Option<Routine> {
        self.routines.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }
}
