use crate::effects::{self, Status, StatusKind, has_status};
use crate::error::ScriptFault;
use crate::resolver::AbilityResult;
use crate::stats::Stat;

use super::{ScriptContext, deltas};

pub fn susano_slash(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let dmg = sc.strike(2000.0);
    let mut r = sc.result(format!("{} cleaves {} with Susano Slash", sc.user.name, sc.target.name));
    r.damage = dmg;
    r.note(format!("Dealt {} damage", dmg));
    Ok(r)
}

/// Cleanses the user, turns the remaining chakra into damage and lowers the target's guard.
pub fn indra_arrow(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    sc.cleanse_user();
    sc.grant_immunity("Indra's Arrow", 3);

    let power_buffs = effects::strip(sc.user, |e| match &e.kind {
        effects::EffectKind::Buff { stats } => stats.contains_key(&Stat::Power),
        _ => false,
    });
    sc.refresh();
    let boost = sc.effective_user.power.saturating_mul(9);
    sc.buff_user(deltas(&[(Stat::Power, boost), (Stat::Accuracy, 50)]), 3);
    let cut = sc.effective_target.defense / 10;
    sc.debuff_target(deltas(&[(Stat::Defense, -cut)]), 3);

    let chakra_mult = (sc.user.chakra as f64 / 5.0).max(1.0);
    let dmg = ((2500.0 * sc.ratio() * chakra_mult).floor() as i64).max(1);

    let mut r = sc.result(format!(
        "{} looses Indra's Arrow, fuelled by {} chakra",
        sc.user.name, sc.user.chakra
    ));
    r.damage = dmg;
    if !power_buffs.is_empty() {
        r.note(format!("Replaced {} power buff(s)", power_buffs.len()));
    }
    r.note(format!("+{} Power, +50 Accuracy", boost));
    r.note(format!("{}'s defense reduced by {}", sc.target.name, cut));
    Ok(r)
}

pub fn punisher_shield(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let dmg = sc.strike(5000.0);
    let burn = Status::named("burn").with_damage(sc.formula("target.health * 0.1")?);
    let burned = sc.status_target(burn, 3).landed();
    sc.status_user(Status::named("punisher_shield_reflect").reflecting(1.0), 3);

    let mut r = sc.result(format!("{} raises the Punisher Shield", sc.user.name));
    r.damage = dmg;
    if burned {
        r.note(format!("{} is burning", sc.target.name));
    }
    r.note("Reflecting all incoming damage for 3 rounds");
    Ok(r)
}

pub fn world_cutting_slash(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    sc.cleanse_user();
    let dmg = sc.strike(3000.0);
    let boost = sc.effective_user.power.saturating_mul(20);
    sc.buff_user(deltas(&[(Stat::Power, boost)]), 3);
    let stunned = sc.status_target(Status::named("stun"), 2).landed();

    let mut r = sc.result(format!("{} splits the world itself", sc.user.name));
    r.damage = dmg;
    r.note(format!("+{} Power", boost));
    if stunned {
        r.note(format!("{} is stunned", sc.target.name));
    }
    Ok(r)
}

/// Three clones strike; the target bleeds while the user feeds on it.
pub fn violent_fierce_god_slicer(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let dmg = sc.strike(2000.0);
    let clone_power = sc.effective_user.power.saturating_mul(3);
    sc.buff_user(deltas(&[(Stat::Power, clone_power)]), 3);
    let cut = sc.effective_target.defense / 20;
    sc.debuff_target(deltas(&[(Stat::Defense, -cut)]), 3);
    let bleed = Status::named("bleed").with_damage(sc.formula("target.health * 0.05")?);
    sc.status_target(bleed, 3);

    let drain = (sc.effective_target.max_health as f64 * 0.05).floor();
    let scythe = Status::named("Godly Scythe").with_heal(crate::formula::Formula::constant(drain));
    sc.status_user(scythe, 3);

    let mut r = sc.result(format!("{} and three clones carve into {}", sc.user.name, sc.target.name));
    r.damage = dmg;
    r.note(format!("Heals {} per round for 3 rounds", drain as i64));
    Ok(r)
}

/// Damage scales with the chakra held before paying for the cast.
pub fn perfect_sage(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    sc.cleanse_user();
    let before = sc.user.chakra + sc.paid;
    let mult = 1.0 + before as f64 / 10.0;
    let dmg = ((2500.0 * sc.ratio()).floor() * mult).floor() as i64;

    let p = sc.effective_user.power.saturating_mul(19);
    let d = sc.effective_user.defense.saturating_mul(19);
    sc.buff_user(deltas(&[(Stat::Power, p), (Stat::Defense, d)]), 3);
    sc.grant_immunity("Perfect Sage", 3);

    let mut r = sc.result(format!("{} enters Perfect Sage Mode", sc.user.name));
    r.damage = dmg.max(1);
    r.note(format!("x{:.1} chakra multiplier", mult));
    Ok(r)
}

pub fn hakai_release(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let dmg = sc.strike(2500.0);
    let mut r = sc.result(format!("{} releases Hakai", sc.user.name));
    r.damage = dmg;

    if !sc.user.flags.has_revived_this_battle && !has_status(sc.user, StatusKind::Revive) {
        sc.status_user(Status::revive(None, Some(1.0), true), 99);
        r.note("Full revive granted (once per battle)");
    }
    if sc.status_target(Status::named("zap"), 3).landed() {
        r.note(format!("{} is crackling with destruction", sc.target.name));
    }
    Ok(r)
}

/// Paid in health rather than chakra; the buff lands before the damage is computed.
pub fn vermillion_pulse(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let cost = (sc.user.current_health.max(0) as f64 * 0.4).floor() as i64;
    sc.user.current_health -= cost;
    sc.user.gain_chakra(15, sc.chakra_cap);
    sc.refresh();

    let p = sc.effective_user.power.saturating_mul(20);
    let d = sc.effective_user.defense.saturating_mul(20);
    sc.buff_user(deltas(&[(Stat::Power, p), (Stat::Defense, d)]), 3);
    let dmg = sc.strike(2500.0);

    let mut r = sc.result(format!("{} fires a Tailed Beast Vermillion Pulse", sc.user.name));
    r.damage = dmg;
    r.note(format!("-{} Health, +15 Chakra", cost));
    Ok(r)
}

pub fn full_counter(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let boost = sc.effective_user.power.saturating_mul(19);
    sc.buff_user(deltas(&[(Stat::Power, boost)]), 5);
    sc.status_target(Status::named("stun"), 2);
    sc.status_user(Status::named("punisher_shield_reflect").reflecting(1.0), 3);

    let mut r = sc.result(format!("{} braces for a Full Counter", sc.user.name));
    r.note(format!("+{} Power for 5 rounds", boost));
    Ok(r)
}
