use serde::Serialize;

use crate::ability::{Ability, AbilityKind, CostType, EffectSpec, Rulebook, StatValue};
use crate::combatant::{Combatant, ONGOING_SENTINEL};
use crate::effects::{
    self, Effect, StatDeltas, Status, StatusKind, add_stat_effect, apply_status, disabling_status,
    has_status,
};
use crate::error::ScriptFault;
use crate::formula::Scope;
use crate::scripts::ScriptContext;
use crate::stats::{EffectiveStats, Stat, effective_stats};
use crate::Dice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KillKind {
    /// Health drops to 0; revive and immortality still apply.
    Execute,
    /// Ends the battle outright.
    Absolute,
}

/// What an ongoing routine asks the orchestrator to do with its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OngoingDirective {
    Renew(u32),
    Terminate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AbilityResult {
    pub ability: String,
    pub hit: bool,
    /// Dealt to the opponent by the orchestrator.
    pub damage: i64,
    /// Restored to the user by the orchestrator.
    pub heal: i64,
    /// Dealt to the user by the orchestrator.
    pub self_damage: i64,
    pub kill: Option<KillKind>,
    pub chakra_used: i64,
    pub special_effects: Vec<String>,
    pub description: String,
    pub ongoing: Option<OngoingDirective>,
}

impl AbilityResult {
    pub fn new(ability: &str, description: impl Into<String>) -> Self {
        Self {
            ability: ability.to_string(),
            hit: true,
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn miss(ability: &str, description: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            ability: ability.to_string(),
            hit: false,
            description: description.into(),
            special_effects: vec![note.into()],
            ..Self::default()
        }
    }

    pub fn note(&mut self, msg: impl Into<String>) {
        self.special_effects.push(msg.into());
    }
}

pub struct Context<'a> {
    pub rulebook: &'a Rulebook,
    pub dice: &'a mut Dice,
    /// Battle round.
    pub round: u32,
    /// 1 on first activation, counting up across upkeep invocations.
    pub activation_round: u32,
    pub is_first_activation: bool,
    pub chakra_cap: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payment {
    Chakra(i64),
    Health(i64),
}

/// What the ability would cost `user` right now, or `None` when it is unaffordable.
pub fn cost_of(ability: &Ability, user: &Combatant) -> Option<Payment> {
    let listed = ability.chakra_cost.max(0);
    match ability.cost_type {
        CostType::Chakra => (user.chakra >= listed).then_some(Payment::Chakra(listed)),
        CostType::PercentChakra => {
            let pct = if listed == 0 { 30 } else { listed };
            let cost = user.chakra * pct / 100;
            (cost > 0 && user.chakra >= cost).then_some(Payment::Chakra(cost))
        }
        CostType::AllChakra => (user.chakra > 0).then_some(Payment::Chakra(user.chakra)),
        CostType::Health => (user.current_health >= listed).then_some(Payment::Health(listed)),
        CostType::PercentHealth => {
            let pct = if listed == 0 { 30 } else { listed };
            let cost = user.base.max_health * pct / 100;
            (user.current_health >= cost).then_some(Payment::Health(cost))
        }
    }
}

pub fn can_afford(ability: &Ability, user: &Combatant) -> bool {
    cost_of(ability, user).is_some()
}

/// Run `ability`: pay its cost (except on upkeep re-invocations), then interpret its effects or
/// call its routine.
pub fn execute(
    ability: &Ability,
    user: &mut Combatant,
    target: &mut Combatant,
    ctx: &mut Context<'_>,
) -> Result<AbilityResult, ScriptFault> {
    let upkeep = ability.ongoing && !ctx.is_first_activation;
    let mut paid = 0;
    let mut bled = 0;
    if !upkeep {
        let Some(payment) = cost_of(ability, user) else {
            return Ok(AbilityResult::miss(
                &ability.name,
                format!("{} failed to perform {} (not enough resources)", user.name, ability.name),
                "Not enough resources!",
            ));
        };
        match payment {
            Payment::Chakra(cost) => {
                user.spend_chakra(cost);
                paid = cost;
            }
            Payment::Health(cost) => {
                user.current_health -= cost;
                bled = cost;
            }
        }
    }

    let mut result = perform(ability, user, target, ctx, paid)?;

    if bled > 0 {
        result.note(format!("-{} Health was consumed to use {}.", bled, ability.name));
    }
    result.chakra_used += paid;
    if ability.ongoing && ctx.is_first_activation && result.hit && result.ongoing.is_none() {
        result.ongoing = Some(OngoingDirective::Renew(ONGOING_SENTINEL));
    }
    Ok(result)
}

/// Body of an ability without its cost. `paid` is the chakra already spent on it.
pub(crate) fn perform(
    ability: &Ability,
    user: &mut Combatant,
    target: &mut Combatant,
    ctx: &mut Context<'_>,
    paid: i64,
) -> Result<AbilityResult, ScriptFault> {
    match &ability.kind {
        AbilityKind::Declarative { .. } => Ok(run_declarative(ability, user, target, ctx)),
        AbilityKind::Scripted { routine } => {
            let routine_fn = ctx
                .rulebook
                .scripts
                .get(routine)
                .ok_or_else(|| ScriptFault::UnknownRoutine(routine.clone()))?;
            let mut sc = ScriptContext::new(user, target, ability, ctx, paid);
            let mut result = routine_fn(&mut sc)?;
            result.special_effects.extend(sc.take_notes());
            Ok(result)
        }
    }
}

fn run_declarative(
    ability: &Ability,
    user: &mut Combatant,
    target: &mut Combatant,
    ctx: &mut Context<'_>,
) -> AbilityResult {
    let description = ability
        .description
        .clone()
        .unwrap_or_else(|| format!("{} used {}", user.name, ability.name));
    let mut result = AbilityResult::new(&ability.name, description);
    let AbilityKind::Declarative { effects, random, random_effects } = &ability.kind else {
        return result;
    };

    let chosen: Vec<&EffectSpec> = if *random {
        let pool = if random_effects.is_empty() { effects } else { random_effects };
        if pool.is_empty() {
            Vec::new()
        } else {
            let pick = &pool[ctx.dice.pick(pool.len())];
            result.note(format!("Random effect activated: {}!", spec_name(pick)));
            vec![pick]
        }
    } else {
        effects.iter().collect()
    };

    for spec in chosen {
        apply_spec(spec, &ability.name, ability.accuracy, user, target, ctx, &mut result);
    }
    result
}

fn spec_name(spec: &EffectSpec) -> &'static str {
    match spec {
        EffectSpec::Damage { .. } => "damage",
        EffectSpec::Buff { .. } => "buff",
        EffectSpec::Debuff { .. } => "debuff",
        EffectSpec::Heal { .. } => "heal",
        EffectSpec::ChakraGain { .. } => "chakra_gain",
        EffectSpec::Status(_) => "status",
        EffectSpec::AutoKill { .. } => "auto_kill",
        EffectSpec::Revive { .. } => "revive",
        EffectSpec::ChakraDrain { .. } => "chakra_drain",
        EffectSpec::InstantKill { .. } => "instant_kill",
        EffectSpec::RemoveBuffs => "remove_buffs",
        EffectSpec::Cleanse => "cleanse",
    }
}

/// Apply one declarative effect. Effective stats are recomputed first so earlier effects of the
/// same ability are visible.
pub(crate) fn apply_spec(
    spec: &EffectSpec,
    source: &str,
    accuracy: Option<f64>,
    user: &mut Combatant,
    target: &mut Combatant,
    ctx: &mut Context<'_>,
    result: &mut AbilityResult,
) {
    let u = effective_stats(user);
    let t = effective_stats(target);
    let scope = Scope::new(&u, &t);

    match spec {
        EffectSpec::Damage { formula, lifesteal_percent, accuracy_bonus } => {
            if let Some(acc) = accuracy {
                if !roll_hit(acc + accuracy_bonus, target, &t, ctx.dice) {
                    result.hit = false;
                    result.note("Attack missed!");
                    return;
                }
            }
            let dmg = formula.eval_floor(&scope).max(0);
            result.damage = result.damage.saturating_add(dmg);
            result.note(format!("Dealt {} damage", dmg));
            if let Some(pct) = lifesteal_percent {
                let steal = (dmg as f64 * pct / 100.0).floor() as i64;
                if steal > 0 {
                    result.heal = result.heal.saturating_add(steal);
                    result.note(format!("Lifesteal: healed {} HP", steal));
                }
            }
        }
        EffectSpec::Buff { stats, duration } => {
            let deltas = resolve_deltas(stats, user, &scope, false);
            result.note(format!("Applied buff: {}", joined_keys(&deltas)));
            add_stat_effect(user, Effect::buff(deltas, *duration, source));
        }
        EffectSpec::Debuff { stats, duration } => {
            let deltas = resolve_deltas(stats, target, &scope, true);
            result.note(format!("Applied debuff: {}", joined_keys(&deltas)));
            add_stat_effect(target, Effect::debuff(deltas, *duration, source));
        }
        EffectSpec::Heal { formula } => {
            let amount = formula.eval_floor(&scope).max(0);
            result.heal = result.heal.saturating_add(amount);
            result.note(format!("Healed {} HP", amount));
        }
        EffectSpec::ChakraGain { formula } => {
            let gain = formula.eval_floor(&scope);
            user.gain_chakra(gain, ctx.chakra_cap);
            result.note(format!("Gained {} Chakra", gain));
        }
        EffectSpec::Status(spec) => {
            let holder = if spec.apply_to_user { &mut *user } else { &mut *target };
            if !ctx.dice.chance(spec.chance.unwrap_or(100.0)) {
                result.note(format!("{} resisted {}", holder.name, spec.status));
                return;
            }
            let mut status = Status::named(spec.status.clone());
            status.damage_per_turn = spec.damage_per_turn.clone();
            status.heal_per_turn = spec.heal_per_turn.clone();
            status.can_attack = spec.can_attack;
            status.replace_with = spec.replace_with.clone();
            status.reflect_percentage = spec.reflect_percentage;
            status.grants_immunity = spec.grants_immunity;
            status.chance = spec.proc_chance;
            let notes = &mut result.special_effects;
            apply_status(holder, status, spec.duration, source, spec.can_stack, |m| notes.push(m));
        }
        EffectSpec::AutoKill { on_round, health_threshold } => {
            let by_round = on_round.is_some_and(|r| r == ctx.round);
            let by_threshold = health_threshold
                .as_ref()
                .is_some_and(|f| t.health <= f.eval_floor(&scope));
            if by_round || by_threshold {
                result.kill = Some(KillKind::Execute);
                result.note(format!("{} was instantly killed by {}!", target.name, source));
            }
        }
        EffectSpec::Revive { heal_amount, heal_fraction, once_per_battle, duration } => {
            let status = Status::revive(*heal_amount, *heal_fraction, *once_per_battle);
            let notes = &mut result.special_effects;
            apply_status(user, status, *duration, source, false, |m| notes.push(m));
        }
        EffectSpec::ChakraDrain { amount, duration } => {
            user.effects.push(Effect::chakra_drain(*amount, *duration, source));
            result.note(format!("{:+} Chakra per round for {} rounds", amount, duration));
        }
        EffectSpec::InstantKill { chance } => {
            if ctx.dice.chance(*chance) {
                result.kill = Some(KillKind::Execute);
                result.note(format!("{} was instantly killed by {}!", target.name, source));
            }
        }
        EffectSpec::RemoveBuffs => {
            let removed = effects::remove_buffs(target);
            if !removed.is_empty() {
                result.note(format!("{}'s buffs were removed!", target.name));
            }
        }
        EffectSpec::Cleanse => {
            let notes = &mut result.special_effects;
            effects::cleanse(user, |m| notes.push(m));
        }
    }
}

fn joined_keys(deltas: &StatDeltas) -> String {
    deltas
        .keys()
        .map(|s| format!("{:?}", s).to_lowercase())
        .collect::<Vec<_>>()
        .join(", ")
}

fn base_value(c: &Combatant, stat: Stat) -> i64 {
    match stat {
        Stat::Power => c.base.power,
        Stat::Defense => c.base.defense,
        Stat::Chakra => c.chakra,
        Stat::Health => c.base.max_health,
        Stat::Accuracy => c.base.accuracy,
        Stat::Dodge => c.base.dodge,
    }
}

fn resolve_deltas(
    stats: &indexmap::IndexMap<Stat, StatValue>,
    holder: &Combatant,
    scope: &Scope<'_>,
    negative: bool,
) -> StatDeltas {
    stats
        .iter()
        .map(|(stat, value)| {
            let delta = match value {
                StatValue::Flat(v) => v.floor() as i64,
                StatValue::Target(f) => f.eval_floor(scope) - base_value(holder, *stat),
            };
            let delta = if negative { -delta.abs() } else { delta };
            (*stat, delta)
        })
        .collect()
}

/// Accuracy roll against the target's dodge.
pub fn roll_hit(accuracy: f64, target: &Combatant, t: &EffectiveStats, dice: &mut Dice) -> bool {
    let dodge = t.dodge as f64;
    let mut evade = (dodge / (dodge + 100.0)).min(0.8);
    if has_status(target, StatusKind::Mist) {
        evade += 0.15;
    }
    if disabling_status(target).is_some() {
        evade -= 0.3;
    }
    let chance = (accuracy * (1.0 - evade)).clamp(5.0, 95.0);
    dice.chance(chance)
}
