use std::sync::Arc;

use jutsu_engine::scripts::{ScriptContext, ScriptRegistry};
use jutsu_engine::{
    AbilityResult, Action, ActionOutcome, BaseStats, BattleConfig, BattleSession, Catalog, Combatant, Rulebook,
    ScriptFault, TurnOrder,
};

const CATALOG: &str = r#"{
  "abilities": [
    { "name": "Attack", "effects": [ { "type": "damage", "formula": "30" } ] },
    { "name": "Broken Seal", "chakra_cost": 5, "script_ref": "broken_seal" },
    { "name": "Unstable Seal", "chakra_cost": 5, "script_ref": "unstable_seal" },
    { "name": "Lost Seal", "script_ref": "never_registered" }
  ]
}"#;

fn broken_seal(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    sc.target.chakra = 0;
    sc.user.current_health = 1;
    Err(sc.fault("seal shattered"))
}

fn unstable_seal(sc: &mut ScriptContext<'_>) -> Result<AbilityResult, ScriptFault> {
    sc.target.effects.clear();
    panic!("chakra backlash");
}

fn session() -> BattleSession {
    let mut scripts = ScriptRegistry::new();
    scripts.register("broken_seal", broken_seal);
    scripts.register("unstable_seal", unstable_seal);
    let rulebook = Rulebook::new(Catalog::from_json_str(CATALOG).unwrap(), scripts);
    let moves = ["Attack", "Broken Seal", "Unstable Seal", "Lost Seal"];
    let a = Combatant::new("a", "A", BaseStats::new(500, 10, 10, 20)).with_moveset(moves);
    let b = Combatant::new("b", "B", BaseStats::new(500, 10, 10, 20)).with_moveset(moves);
    let cfg = BattleConfig { chakra_regen: 0, turn_order: TurnOrder::Seat, ..BattleConfig::default() };
    BattleSession::new(a, b, Arc::new(rulebook), cfg).unwrap()
}

#[test]
fn failing_routine_is_a_no_op_and_the_opponent_still_acts() {
    let mut s = session();
    s.submit_action("a", Action::ability("Broken Seal")).unwrap();
    s.submit_action("b", Action::ability("Attack")).unwrap();
    let summary = s.advance_round().unwrap();

    let report = summary.action_of("a").unwrap();
    assert!(matches!(report.outcome, ActionOutcome::Fault { .. }));
    assert_eq!(report.damage_dealt, 0);
    assert_eq!(summary.action_of("b").unwrap().damage_dealt, 30);

    let a = s.combatant("a").unwrap();
    let b = s.combatant("b").unwrap();
    // rolled back, cost included
    assert_eq!(a.chakra, 20);
    assert_eq!(a.current_health, 470);
    assert_eq!(b.chakra, 20);
    assert!(summary.narrative.iter().any(|l| l.starts_with("[FAULT][A]")));
}

#[test]
fn panicking_routine_is_contained() {
    let mut s = session();
    s.submit_action("a", Action::ability("Unstable Seal")).unwrap();
    s.submit_action("b", Action::ability("Attack")).unwrap();
    let summary = s.advance_round().unwrap();

    match &summary.action_of("a").unwrap().outcome {
        ActionOutcome::Fault { ability, reason } => {
            assert_eq!(ability, "Unstable Seal");
            assert!(reason.contains("panicked"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(s.combatant("a").unwrap().chakra, 20);
    assert_eq!(s.combatant("a").unwrap().current_health, 470);
    assert!(s.is_over().is_none());
}

#[test]
fn unregistered_routine_faults() {
    let mut s = session();
    s.submit_action("a", Action::ability("Lost Seal")).unwrap();
    s.submit_action("b", Action::Rest).unwrap();
    let summary = s.advance_round().unwrap();
    match &summary.action_of("a").unwrap().outcome {
        ActionOutcome::Fault { reason, .. } => assert!(reason.contains("never_registered")),
        other => panic!("unexpected outcome {:?}", other),
    }
}
