use crate::effects::{self, Effect, EffectKind, Status, StatusKind};
use crate::error::ScriptFault;
use crate::resolver::{self, AbilityResult, Context, KillKind};
use crate::stats::Stat;

use super::{ScriptContext, deltas};

const EIGHT_GATES: [(&str, i64, i64); 7] = [
    ("The Gate of Opening", 2000, 1000),
    ("The Gate of Healing", 4000, 2000),
    ("The Gate of Life", 6000, 3000),
    ("The Gate of Pain", 8000, 4000),
    ("The Gate of Limit", 10000, 5000),
    ("The Gate of View", 15000, 7500),
    ("The Gate of Wonder", 20000, 10000),
];
const EIGHT_GATES_HEALTH_PCT: f64 = 0.10;

/// Forced backflip; nothing survives it.
pub fn banana_killer(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    sc.target.flags.force_backflip = true;
    effects::strip_immortality(sc.target);
    let mut r = sc.result(format!("{} is forced into a fatal backflip", sc.target.name));
    r.damage = sc.target.current_health.max(1).saturating_mul(99_999);
    r.kill = Some(KillKind::Absolute);
    Ok(r)
}

fn is_beneficial(effect: &Effect) -> bool {
    match &effect.kind {
        EffectKind::Buff { .. } => true,
        EffectKind::Status(s) => {
            let name = s.name.to_lowercase();
            s.heal_per_turn.is_some()
                || matches!(s.kind(), StatusKind::Revive | StatusKind::Regeneration)
                || name == "haste"
                || name == "shield"
        }
        _ => false,
    }
}

/// Buffs the user and takes every beneficial effect the target holds.
pub fn izanagi(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let p = sc.effective_user.power.saturating_mul(19);
    let d = sc.effective_user.defense.saturating_mul(19);
    sc.buff_user(deltas(&[(Stat::Power, p), (Stat::Defense, d)]), 3);

    let (stolen, kept): (Vec<Effect>, Vec<Effect>) =
        std::mem::take(&mut sc.target.effects).into_iter().partition(is_beneficial);
    sc.target.effects = kept;
    let labels: Vec<String> = stolen.iter().map(Effect::label).collect();
    sc.user.effects.extend(stolen);
    sc.refresh();

    let mut r = sc.result(format!("{} rewrites reality with Izanagi", sc.user.name));
    r.note(format!("+{} Power, +{} Defense", p, d));
    if !labels.is_empty() {
        r.note(format!("Stole: {}", labels.join(", ")));
    }
    Ok(r)
}

/// Both sides become unkillable for three rounds. Once per battle.
pub fn izanami(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    if sc.user.flags.izanami_used {
        return Ok(sc.miss(
            format!("{} cannot cast Izanami again", sc.user.name),
            "Izanami already used",
        ));
    }
    sc.user.flags.izanami_used = true;
    sc.status_user(Status::named("immortal"), 3);
    sc.status_target(Status::named("immortal"), 3);
    let mut r = sc.result(format!("{} traps both fighters in the Izanami loop", sc.user.name));
    r.note("Neither side can fall for 3 rounds");
    Ok(r)
}

/// Copies a random ability from the target's moveset and performs it for free.
pub fn urashiki_jutsu_steal(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let own = sc.ability.routine();
    let candidates: Vec<String> = sc
        .target
        .moveset
        .iter()
        .filter(|m| m.as_str() != crate::ability::BASIC_ATTACK)
        .filter(|m| sc.rulebook.catalog.get(m).map_or(true, |a| a.routine() != own))
        .cloned()
        .collect();
    if candidates.is_empty() {
        return Ok(sc.result(format!(
            "{} tries to steal a jutsu, but {} has none to steal",
            sc.user.name, sc.target.name
        )));
    }
    let name = candidates[sc.dice.pick(candidates.len())].clone();
    let Some(stolen) = sc.rulebook.catalog.get(&name) else {
        return Ok(sc.miss(
            format!("{} failed to manifest the stolen jutsu: {}", sc.user.name, name),
            format!("Unknown jutsu '{}'", name),
        ));
    };

    let mut ctx = Context {
        rulebook: sc.rulebook,
        dice: &mut *sc.dice,
        round: sc.round,
        activation_round: 1,
        is_first_activation: true,
        chakra_cap: sc.chakra_cap,
    };
    let inner = resolver::perform(stolen, &mut *sc.user, &mut *sc.target, &mut ctx, 0)?;
    sc.refresh();

    let mut r = sc.result(format!("{} replicates {}!", sc.user.name, name));
    r.hit = inner.hit;
    r.damage = inner.damage;
    r.heal = inner.heal;
    r.self_damage = inner.self_damage;
    r.kill = inner.kill;
    r.note(format!("Stolen: {}", name));
    r.special_effects.extend(inner.special_effects);
    Ok(r)
}

/// Traps the target: acting while trapped incurs a debt that must be paid by resting.
pub fn raiders_tower(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    if !sc.status_target(Status::named("raiders_tower_trap"), 10).landed() {
        return Ok(sc.miss(format!("{} ignores the tower", sc.target.name), "Trap blocked"));
    }
    let mut r = sc.result(format!("{} is sealed inside Raiders Tower", sc.target.name));
    r.note("Acting incurs a debt; rest or perish");
    Ok(r)
}

pub fn praise_jashin(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    sc.status_user(Status::revive(None, Some(0.5), true), 99);
    let mut r = sc.result(format!("{} offers a prayer to Jashin", sc.user.name));
    r.note("Will revive at 50% health once");
    Ok(r)
}

/// Paid in health. Cleanses, grants immunity, and a full revive if none has been used yet.
pub fn gold_experience_requiem(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    sc.user.gain_chakra(10, sc.chakra_cap);
    sc.cleanse_user();
    sc.grant_immunity("Gold Experience Requiem", 3);
    let mut r = sc.result(format!("{} activates Gold Experience Requiem", sc.user.name));
    r.note("+10 Chakra");
    if !sc.user.flags.has_revived_this_battle {
        sc.status_user(Status::revive(None, Some(1.0), true), 99);
        r.note("Full revive granted (once per battle)");
    }
    Ok(r)
}

/// Opens the next gate, up to the seventh. Each gate replaces the previous one's buff.
pub fn eight_gates(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let level = usize::from(sc.user.flags.eight_gates_level);
    let Some(&(gate, power, defense)) = EIGHT_GATES.get(level) else {
        return Ok(sc.miss(
            format!("{} is already at the 7th gate and cannot open another!", sc.user.name),
            "Maximum gate reached!",
        ));
    };
    sc.user.flags.eight_gates_level += 1;
    sc.buff_user(deltas(&[(Stat::Power, power), (Stat::Defense, defense)]), 99);
    let cost = (sc.user.current_health.max(0) as f64 * EIGHT_GATES_HEALTH_PCT).floor() as i64;

    let mut r = sc.result(format!("{} opens {}! Their power surges!", sc.user.name, gate));
    r.self_damage = cost;
    r.note(format!("Opened Gate {}: {}", level + 1, gate));
    r.note(format!("+{} Power, +{} Defense, -{} Health", power, defense, cost));
    Ok(r)
}

/// Immunity with a price: 15% of max health is lost when it ends. Leaves the target vulnerable.
pub fn flowing_red_scale(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    sc.cleanse_user();
    let p = sc.effective_user.power.saturating_mul(19);
    let d = sc.effective_user.defense.saturating_mul(19);
    sc.buff_user(deltas(&[(Stat::Power, p), (Stat::Defense, d)]), 3);
    let mut scale = Status::named("Flowing Red Scale");
    scale.grants_immunity = true;
    scale.health_loss_on_expire = Some(0.15);
    sc.status_user(scale, 3);
    let exposed = sc.status_target(Status::named("Status Vulnerability"), 3).landed();

    let mut r = sc.result(format!("{} enters Flowing Red Scale", sc.user.name));
    if exposed {
        r.note(format!("{} takes 50% more damage over time", sc.target.name));
    }
    Ok(r)
}

/// While active, Attack resolves as Susano Slash. Recasting refreshes the duration.
pub fn perfect_susanoo(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let status = Status::named("Perfect Susanoo Active").replacing_attack("Susano Slash");
    let refreshed = matches!(sc.status_user(status, 3), effects::Application::Refreshed);
    let verb = if refreshed { "sustains" } else { "manifests" };
    Ok(sc.result(format!("{} {} the Perfect Susanoo", sc.user.name, verb)))
}
