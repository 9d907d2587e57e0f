use std::sync::Arc;

use jutsu_engine::effects::{apply_status, find_status};
use jutsu_engine::scripts::ScriptRegistry;
use jutsu_engine::{
    Action, ActionOutcome, BaseStats, BattleConfig, BattleSession, Catalog, Combatant, EndReason, Rulebook,
    Status, TurnOrder,
};

const CATALOG: &str = r#"{
  "abilities": [
    { "name": "Attack", "effects": [ { "type": "damage", "formula": "50" } ] },
    { "name": "Tailed Beast Bomb", "effects": [ { "type": "damage", "formula": "2500 * user.power / target.defense" } ] },
    { "name": "Expensive Bolt", "chakra_cost": 15, "effects": [
        { "type": "damage", "formula": "500" },
        { "type": "status", "status": "burn", "duration": 3 }
    ] },
    { "name": "Left Fang", "effects": [ { "type": "damage", "formula": "10" } ] },
    { "name": "Right Fang", "effects": [ { "type": "damage", "formula": "10" } ] },
    { "name": "Leech", "effects": [ { "type": "damage", "formula": "100", "lifesteal_percent": 50 } ] },
    { "name": "Reaper Seal", "effects": [ { "type": "auto_kill", "health_threshold": "target.max_health * 0.15" } ] },
    { "name": "Blood Seal", "chakra_cost": 40, "cost_type": "health", "effects": [ { "type": "damage", "formula": "10" } ] }
  ],
  "combos": [
    { "name": "Twin Fang", "requires": ["Left Fang", "Right Fang"], "damage": "100" }
  ]
}"#;

fn rulebook() -> Arc<Rulebook> {
    Arc::new(Rulebook::new(Catalog::from_json_str(CATALOG).unwrap(), ScriptRegistry::builtin()))
}

fn config() -> BattleConfig {
    BattleConfig { chakra_regen: 0, turn_order: TurnOrder::Seat, ..BattleConfig::default() }
}

fn all_moves(c: Combatant) -> Combatant {
    c.with_moveset(["Attack", "Tailed Beast Bomb", "Expensive Bolt", "Left Fang", "Right Fang", "Leech", "Reaper Seal", "Blood Seal"])
}

fn pair(a: Combatant, b: Combatant) -> BattleSession {
    BattleSession::new(all_moves(a), all_moves(b), rulebook(), config()).unwrap()
}

fn play(s: &mut BattleSession, a: Action, b: Action) -> jutsu_engine::RoundSummary {
    s.submit_action("a", a).unwrap();
    s.submit_action("b", b).unwrap();
    s.advance_round().unwrap()
}

#[test]
fn damage_formula_uses_power_over_defense() {
    let a = Combatant::new("a", "A", BaseStats::new(1000, 100, 10, 20));
    let b = Combatant::new("b", "B", BaseStats::new(10_000, 10, 50, 20));
    let mut s = pair(a, b);
    let summary = play(&mut s, Action::ability("Tailed Beast Bomb"), Action::Rest);

    let report = summary.action_of("a").unwrap();
    assert_eq!(report.damage_dealt, 5000);
    match &report.outcome {
        ActionOutcome::Resolved { result } => {
            assert!(result.hit);
            assert_eq!(result.damage, 5000);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(s.combatant("b").unwrap().current_health, 5000);
}

#[test]
fn unaffordable_ability_misses_and_changes_nothing() {
    let a = Combatant::new("a", "A", BaseStats::new(1000, 100, 10, 10));
    let b = Combatant::new("b", "B", BaseStats::new(1000, 10, 50, 20));
    let mut s = pair(a, b);
    let summary = play(&mut s, Action::ability("Expensive Bolt"), Action::Rest);

    match &summary.action_of("a").unwrap().outcome {
        ActionOutcome::Resolved { result } => {
            assert!(!result.hit);
            assert_eq!(result.damage, 0);
            assert_eq!(result.chakra_used, 0);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    let a = s.combatant("a").unwrap();
    let b = s.combatant("b").unwrap();
    assert_eq!(a.chakra, 10);
    assert_eq!(b.current_health, 1000);
    assert!(b.effects.is_empty());
}

#[test]
fn revive_catches_lethal_damage() {
    let a = Combatant::new("a", "A", BaseStats::new(200, 10, 10, 20));
    let b = Combatant::new("b", "B", BaseStats::new(1000, 10, 10, 20));
    let mut s = pair(a, b);
    {
        let a = s.combatant_mut("a").unwrap();
        a.current_health = 40;
        apply_status(a, Status::revive(Some(100), None, true), 5, "Edo Tensei Seal", false, |_| {});
    }
    let summary = play(&mut s, Action::Rest, Action::ability("Attack"));

    let a = s.combatant("a").unwrap();
    assert_eq!(a.current_health, 100);
    assert!(a.flags.has_revived_this_battle);
    assert!(find_status(a, "revive").is_none());
    assert!(summary.outcome.is_none());
    assert!(summary.narrative.iter().any(|l| l.starts_with("[REVIVE][A]")));
}

#[test]
fn once_per_battle_revive_only_fires_once() {
    let a = Combatant::new("a", "A", BaseStats::new(200, 10, 10, 20));
    let b = Combatant::new("b", "B", BaseStats::new(1000, 10, 10, 20));
    let mut s = pair(a, b);
    {
        let a = s.combatant_mut("a").unwrap();
        a.current_health = 40;
        apply_status(a, Status::revive(Some(30), None, true), 5, "Edo Tensei Seal", false, |_| {});
    }
    play(&mut s, Action::Rest, Action::ability("Attack"));
    assert_eq!(s.combatant("a").unwrap().current_health, 30);

    {
        let a = s.combatant_mut("a").unwrap();
        apply_status(a, Status::revive(Some(30), None, true), 5, "Edo Tensei Seal", false, |_| {});
    }
    let summary = play(&mut s, Action::Rest, Action::ability("Attack"));
    let outcome = summary.outcome.expect("second lethal hit should stick");
    assert_eq!(outcome.winner.as_deref(), Some("b"));
    assert_eq!(outcome.reason, EndReason::Knockout);
}

#[test]
fn reflect_sends_damage_back() {
    let a = Combatant::new("a", "A", BaseStats::new(1000, 10, 10, 20));
    let b = Combatant::new("b", "B", BaseStats::new(1000, 10, 10, 20));
    let mut s = pair(a, b);
    {
        let b = s.combatant_mut("b").unwrap();
        apply_status(b, Status::named("mirror").reflecting(0.5), 3, "Full Counter", false, |_| {});
    }
    let summary = play(&mut s, Action::ability("Attack"), Action::Rest);

    assert_eq!(summary.action_of("a").unwrap().damage_dealt, 0);
    assert_eq!(s.combatant("b").unwrap().current_health, 1000);
    assert_eq!(s.combatant("a").unwrap().current_health, 975);
    assert!(summary.narrative.iter().any(|l| l.starts_with("[REFLECT][B]")));
}

#[test]
fn lifesteal_heals_the_user() {
    let a = Combatant::new("a", "A", BaseStats::new(1000, 10, 10, 20));
    let b = Combatant::new("b", "B", BaseStats::new(1000, 10, 10, 20));
    let mut s = pair(a, b);
    s.combatant_mut("a").unwrap().current_health = 500;
    play(&mut s, Action::ability("Leech"), Action::Rest);
    assert_eq!(s.combatant("a").unwrap().current_health, 550);
    assert_eq!(s.combatant("b").unwrap().current_health, 900);
}

#[test]
fn execute_threshold_kills_weak_targets() {
    let a = Combatant::new("a", "A", BaseStats::new(1000, 10, 10, 20));
    let b = Combatant::new("b", "B", BaseStats::new(1000, 10, 10, 20));
    let mut s = pair(a, b);
    s.combatant_mut("b").unwrap().current_health = 150;
    let summary = play(&mut s, Action::ability("Reaper Seal"), Action::Rest);
    let outcome = summary.outcome.unwrap();
    assert_eq!(outcome.winner.as_deref(), Some("a"));
    assert_eq!(outcome.reason, EndReason::Knockout);
}

#[test]
fn combo_fires_once_both_parts_land() {
    let a = Combatant::new("a", "A", BaseStats::new(1000, 10, 10, 20));
    let b = Combatant::new("b", "B", BaseStats::new(1000, 10, 10, 20));
    let mut s = pair(a, b);

    let first = play(&mut s, Action::ability("Left Fang"), Action::Rest);
    assert_eq!(first.actions.len(), 2);
    assert!(s.combatant("a").unwrap().combo_progress.contains("Left Fang"));

    let second = play(&mut s, Action::ability("Right Fang"), Action::Rest);
    let combo = second
        .actions
        .iter()
        .find(|r| r.resolved.as_deref() == Some("Twin Fang"))
        .expect("combo report");
    assert_eq!(combo.action, None);
    assert_eq!(combo.damage_dealt, 100);
    assert_eq!(s.combatant("b").unwrap().current_health, 880);
    assert!(s.combatant("a").unwrap().combo_progress.is_empty());
}

#[test]
fn health_cost_down_to_zero_still_triggers_revive() {
    let a = Combatant::new("a", "A", BaseStats::new(200, 10, 10, 20));
    let b = Combatant::new("b", "B", BaseStats::new(1000, 10, 10, 20));
    let mut s = pair(a, b);
    {
        let a = s.combatant_mut("a").unwrap();
        a.current_health = 40;
        apply_status(a, Status::revive(Some(100), None, true), 5, "Edo Tensei Seal", false, |_| {});
    }
    let summary = play(&mut s, Action::ability("Blood Seal"), Action::Rest);

    assert!(summary.outcome.is_none());
    let a = s.combatant("a").unwrap();
    assert_eq!(a.current_health, 100);
    assert!(a.flags.has_revived_this_battle);
    assert_eq!(s.combatant("b").unwrap().current_health, 990);
}

#[test]
fn health_cost_down_to_zero_is_held_by_immortality() {
    let a = Combatant::new("a", "A", BaseStats::new(200, 10, 10, 20));
    let b = Combatant::new("b", "B", BaseStats::new(1000, 10, 10, 20));
    let mut s = pair(a, b);
    {
        let a = s.combatant_mut("a").unwrap();
        a.current_health = 40;
        a.flags.permanent_immortal = true;
    }
    let summary = play(&mut s, Action::ability("Blood Seal"), Action::Rest);
    assert!(summary.outcome.is_none());
    assert_eq!(s.combatant("a").unwrap().current_health, 1);
}
