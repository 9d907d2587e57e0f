use jutsu_engine::effects::find_status;
use jutsu_engine::{
    Action, ActionOutcome, BaseStats, BattleConfig, BattleSession, Combatant, EndReason, Rulebook, TurnOrder,
};

fn config() -> BattleConfig {
    BattleConfig { chakra_regen: 0, turn_order: TurnOrder::Seat, ..BattleConfig::default() }
}

fn session(a: Combatant, b: Combatant) -> BattleSession {
    BattleSession::new(a, b, Rulebook::builtin().unwrap(), config()).unwrap()
}

fn caster(chakra: i64, jutsu: &str) -> Combatant {
    Combatant::new("a", "Caster", BaseStats::new(5000, 100, 100, chakra)).with_moveset(["Attack", jutsu])
}

fn dummy(hp: i64) -> Combatant {
    Combatant::new("b", "Dummy", BaseStats::new(hp, 10, 100, 20))
}

#[test]
fn water_prison_collapses_without_upkeep_chakra() {
    let mut s = session(caster(10, "Water Prison Jutsu"), dummy(5000));
    s.submit_action("a", Action::ability("Water Prison Jutsu")).unwrap();
    s.submit_action("b", Action::Rest).unwrap();
    let first = s.advance_round().unwrap();

    assert_eq!(s.combatant("a").unwrap().chakra, 0);
    assert!(s.combatant("a").unwrap().ongoing_entry("Water Prison Jutsu").is_some());
    let b = s.combatant("b").unwrap();
    assert!(find_status(b, "drown").is_some());
    // drown ticks for 10% of current health
    assert_eq!(b.current_health, 4500);
    assert!(matches!(
        first.action_of("b").unwrap().outcome,
        ActionOutcome::Disabled { .. }
    ));

    assert_eq!(s.awaiting(), vec!["a"]);
    s.submit_action("a", Action::Rest).unwrap();
    let second = s.advance_round().unwrap();

    assert_eq!(second.upkeep.len(), 1);
    assert!(s.combatant("a").unwrap().ongoing_entry("Water Prison Jutsu").is_none());
    let b = s.combatant("b").unwrap();
    assert!(find_status(b, "drown").is_none());
    assert_eq!(b.current_health, 4500);
    assert!(second.expired.iter().any(|c| c.combatant == "b" && c.effect == "drown"));
}

#[test]
fn shadow_possession_drains_upkeep_each_round() {
    let mut s = session(caster(30, "Shadow Possession Jutsu"), dummy(5000));
    s.submit_action("a", Action::ability("Shadow Possession Jutsu")).unwrap();
    s.submit_action("b", Action::Rest).unwrap();
    s.advance_round().unwrap();
    assert_eq!(s.combatant("a").unwrap().chakra, 20);

    s.submit_action("a", Action::Rest).unwrap();
    let summary = s.advance_round().unwrap();
    // +1 from resting, -5 upkeep
    assert_eq!(s.combatant("a").unwrap().chakra, 16);
    assert!(matches!(
        summary.action_of("b").unwrap().outcome,
        ActionOutcome::Disabled { ref status } if status == "shadow_possession"
    ));
    let entry = s.combatant("a").unwrap().ongoing_entry("Shadow Possession Jutsu").unwrap();
    assert!(entry.rounds_left > 0);
    assert_eq!(entry.activated_round, 1);
}

#[test]
fn planetary_devastation_crushes_on_the_tenth_round() {
    let mut s = session(caster(25, "Planetary Devastation"), dummy(1_000_000));
    s.submit_action("a", Action::ability("Planetary Devastation")).unwrap();
    s.submit_action("b", Action::Rest).unwrap();
    s.advance_round().unwrap();

    let mut last = None;
    while s.is_over().is_none() {
        s.submit_action("a", Action::Rest).unwrap();
        s.submit_action("b", Action::Rest).unwrap();
        last = Some(s.advance_round().unwrap());
    }
    let outcome = last.unwrap().outcome.unwrap();
    assert_eq!(outcome.winner.as_deref(), Some("a"));
    assert_eq!(outcome.reason, EndReason::Absolute);
    assert_eq!(outcome.rounds, 10);
    assert_eq!(s.combatant("b").unwrap().current_health, 0);
}

#[test]
fn planetary_devastation_ramps_its_damage() {
    let mut s = session(caster(25, "Planetary Devastation"), dummy(1_000_000));
    s.submit_action("a", Action::ability("Planetary Devastation")).unwrap();
    s.submit_action("b", Action::Rest).unwrap();
    s.advance_round().unwrap();
    for _ in 0..3 {
        s.submit_action("a", Action::Rest).unwrap();
        s.submit_action("b", Action::Rest).unwrap();
        s.advance_round().unwrap();
    }
    // rounds 2, 3 and 4: 1000 + 1500 + 2000
    assert_eq!(s.combatant("b").unwrap().current_health, 1_000_000 - 4500);
}
