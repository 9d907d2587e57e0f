use crate::combatant::ONGOING_SENTINEL;
use crate::effects::{self, Status, find_status};
use crate::error::ScriptFault;
use crate::resolver::{AbilityResult, KillKind, OngoingDirective};
use crate::stats::Stat;

use super::{ScriptContext, deltas};

const SHADOW_UPKEEP: i64 = 5;
const WATER_PRISON_UPKEEP: i64 = 7;
const IKARI_UPKEEP: i64 = 15;
const IKARI_RESTRICTION_AT: i64 = 4;
const REBIRTH_UPKEEP: i64 = 10;
const GODS_UPKEEP: i64 = 10;
const OVERWHELMING_AT: i64 = 15;
const PLANETARY_FINAL_ROUND: u32 = 10;

fn renew(mut r: AbilityResult) -> AbilityResult {
    r.ongoing = Some(OngoingDirective::Renew(ONGOING_SENTINEL));
    r
}

fn terminate(mut r: AbilityResult) -> AbilityResult {
    r.ongoing = Some(OngoingDirective::Terminate);
    r
}

pub fn shadow_possession(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    if sc.is_first_activation {
        let caught = sc.status_target(Status::named("shadow_possession"), ONGOING_SENTINEL).landed();
        if !caught {
            let r = sc.miss(
                format!("{} slips out of {}'s shadow", sc.target.name, sc.user.name),
                "Shadow blocked",
            );
            return Ok(r);
        }
        let mut r = sc.result(format!(
            "{} extends their shadow and connects with {}!",
            sc.user.name, sc.target.name
        ));
        r.note(format!("{} must maintain the possession (-{} Chakra/turn)", sc.user.name, SHADOW_UPKEEP));
        return Ok(r);
    }

    if !sc.pay_upkeep(SHADOW_UPKEEP) {
        let r = sc.result(format!("{}'s shadow recedes", sc.user.name));
        return Ok(terminate(r));
    }
    let mut r = sc.result(format!("{} holds {} in place", sc.user.name, sc.target.name));
    r.chakra_used = SHADOW_UPKEEP;
    Ok(renew(r))
}

/// The target drowns for 10% of its current health each round and cannot act.
pub fn water_prison(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    if sc.is_first_activation {
        let drown = Status::named("drown").with_damage(sc.formula("target.health * 0.1")?).immobilizing();
        if !sc.status_target(drown, ONGOING_SENTINEL).landed() {
            return Ok(sc.miss(format!("{} resists the Water Prison", sc.target.name), "Prison blocked"));
        }
        let mut r = sc.result(format!("{} traps {} inside a Water Prison", sc.user.name, sc.target.name));
        r.note(format!("Upkeep: {} Chakra per round", WATER_PRISON_UPKEEP));
        return Ok(r);
    }

    if !sc.pay_upkeep(WATER_PRISON_UPKEEP) {
        let r = sc.result(format!("The Water Prison around {} collapses", sc.target.name));
        return Ok(terminate(r));
    }
    let mut r = sc.result(format!("{} keeps {} submerged", sc.user.name, sc.target.name));
    r.chakra_used = WATER_PRISON_UPKEEP;
    Ok(renew(r))
}

/// Huge buff plus regeneration; running dry locks the user into Full Power Strike.
pub fn ikari(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let heal = sc.percent_of_max(0.08);
    if sc.is_first_activation {
        let p = sc.user.base.power.saturating_mul(75);
        let d = sc.user.base.defense.saturating_mul(75);
        sc.buff_user(deltas(&[(Stat::Power, p), (Stat::Defense, d)]), ONGOING_SENTINEL);
        let mut r = sc.result(format!("{} activates Ikari! Overwhelming power surges through them!", sc.user.name));
        r.heal = heal;
        return Ok(r);
    }

    let mut r = sc.result(format!("{}'s Ikari regenerates health", sc.user.name));
    r.heal = heal;
    if find_status(sc.user, "Ikari Restriction").is_some() {
        r.note("Passive regeneration");
        return Ok(renew(r));
    }

    let after = (sc.user.chakra - IKARI_UPKEEP).max(0);
    r.chakra_used = sc.user.chakra - after;
    if after <= IKARI_RESTRICTION_AT {
        sc.status_user(Status::named("Ikari Restriction").replacing_attack("Full Power Strike"), 999);
        r.note("Chakra depleted: attacks become Full Power Strike");
    }
    sc.user.chakra = after;
    sc.refresh();
    Ok(renew(r))
}

pub fn creation_rebirth(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let heal = sc.percent_of_max(0.30);
    if sc.is_first_activation {
        let mut r = sc.result(format!("{} activates Creation Rebirth", sc.user.name));
        r.heal = heal;
        return Ok(r);
    }
    if !sc.pay_upkeep(REBIRTH_UPKEEP) {
        let r = sc.result(format!("{}'s Creation Rebirth fades", sc.user.name));
        return Ok(terminate(r));
    }
    let mut r = sc.result(format!("{}'s Creation Rebirth regenerates health", sc.user.name));
    r.heal = heal;
    r.chakra_used = REBIRTH_UPKEEP;
    r.ongoing = Some(OngoingDirective::Renew(10));
    Ok(r)
}

/// Permanent possession. Near death it grants divine immortality once; once chakra runs low it
/// unleashes Overwhelming Power.
pub fn gods_possession(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let heal = sc.percent_of_max(0.10);
    let low = sc.user.current_health <= sc.effective_user.max_health / 10;
    if low && !sc.user.flags.divine_immortality_triggered {
        sc.user.flags.divine_immortality_triggered = true;
        sc.user.flags.permanent_immortal = true;
        sc.status_user(Status::named("Divine Immortality"), 999);
        let mut r = sc.result(format!("{} awakens Divine Immortality!", sc.user.name));
        r.note("All lethal damage nullified");
        return Ok(renew(r));
    }

    if sc.is_first_activation {
        let erased = effects::strip_immortality(sc.target);
        sc.target.flags.action_negated = true;
        sc.target.flags.force_backflip = true;
        sc.status_target(Status::named("stun"), 1);
        let p = sc.user.base.power.saturating_mul(75);
        let d = sc.user.base.defense.saturating_mul(75);
        sc.buff_user(deltas(&[(Stat::Power, p), (Stat::Defense, d)]), ONGOING_SENTINEL);

        let mut r = sc.result(format!("{} is possessed by a god", sc.user.name));
        r.heal = heal;
        if !erased.is_empty() {
            r.note(format!("{}'s immortality was erased", sc.target.name));
        }
        r.note(format!("{}'s next action is negated", sc.target.name));
        return Ok(r);
    }

    let before = sc.user.chakra;
    sc.user.chakra = (sc.user.chakra - GODS_UPKEEP).max(0);
    sc.refresh();
    let mut r = sc.result(format!("{}'s divine power lingers", sc.user.name));
    r.heal = heal;
    r.chakra_used = before - sc.user.chakra;

    if sc.user.chakra <= OVERWHELMING_AT && find_status(sc.user, "Overwhelming Power Override").is_none() {
        sc.status_user(
            Status::named("Overwhelming Power Override").replacing_attack("Overwhelming Power"),
            999,
        );
        sc.status_target(Status::named("stun"), 2);
        sc.target.flags.action_negated = true;

        let chakra = sc.user.chakra.max(1) as f64;
        let dominance = (sc.effective_user.power.max(1) as f64 / sc.effective_target.defense.max(1) as f64)
            .powf(1.35);
        let scaling = (chakra / 3.0 + 5.0).powf(1.8);
        r.damage = (2500.0 * dominance * scaling).floor() as i64;

        let p = sc.effective_user.power.saturating_mul(74);
        let d = sc.effective_user.defense.saturating_mul(74);
        effects::add_stat_effect(
            sc.user,
            effects::Effect::buff(deltas(&[(Stat::Power, p), (Stat::Defense, d)]), 999, "Overwhelming Power"),
        );
        sc.status_user(Status::named("absolute_immunity"), 999);
        sc.status_user(Status::named("punisher_shield_reflect").reflecting(1.0), 999);
        sc.status_user(Status::named("overwhelming_reversal").reflecting(3.0), 999);
        r.description = format!("{} activates Overwhelming Power!", sc.user.name);
        r.note("Countering and reflection fully enabled");
    }
    Ok(renew(r))
}

/// Round 1 sets up, rounds 2–9 crush for 500 per round, round 10 kills.
pub fn planetary_devastation(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    let step = sc.activation_round;
    if step <= 1 {
        return Ok(sc.result(format!(
            "{} casts Planetary Devastation! A gravity sphere forms around {}",
            sc.user.name, sc.target.name
        )));
    }
    if step < PLANETARY_FINAL_ROUND {
        let dmg = 500 * i64::from(step);
        let mut r = sc.result(format!("The gravity sphere tightens around {}", sc.target.name));
        r.damage = dmg;
        r.note(format!("Planetary Devastation (Round {}/{})", step, PLANETARY_FINAL_ROUND));
        return Ok(renew(r));
    }
    let mut r = sc.result(format!("{} is crushed by Planetary Devastation", sc.target.name));
    r.kill = Some(KillKind::Absolute);
    Ok(terminate(r))
}
