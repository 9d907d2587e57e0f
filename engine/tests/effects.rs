use std::sync::Arc;

use jutsu_engine::effects::{
    ADAPTATION, Application, adapt_hit, add_stat_effect, apply_status, cleanse, disabling_status, find_status,
    tick_effects,
};
use jutsu_engine::scripts::{ScriptRegistry, deltas};
use jutsu_engine::{
    Action, BaseStats, BattleConfig, BattleSession, Catalog, Combatant, Dice, Effect, Rulebook, Stat, Status,
    TurnOrder,
};

const CATALOG: &str = r#"{
  "abilities": [
    { "name": "Attack", "effects": [ { "type": "damage", "formula": "100" } ] }
  ]
}"#;

fn fighter() -> Combatant {
    Combatant::new("f", "Fighter", BaseStats::new(1000, 100, 80, 50))
}

fn session() -> BattleSession {
    let rulebook = Rulebook::new(Catalog::from_json_str(CATALOG).unwrap(), ScriptRegistry::builtin());
    let cfg = BattleConfig { chakra_regen: 0, turn_order: TurnOrder::Seat, ..BattleConfig::default() };
    let a = Combatant::new("a", "A", BaseStats::new(1000, 10, 10, 20));
    let b = Combatant::new("b", "B", BaseStats::new(1000, 10, 10, 20));
    BattleSession::new(a, b, Arc::new(rulebook), cfg).unwrap()
}

fn play(s: &mut BattleSession, a: Action, b: Action) {
    s.submit_action("a", a).unwrap();
    s.submit_action("b", b).unwrap();
    s.advance_round().unwrap();
}

fn hp(s: &BattleSession, id: &str) -> i64 {
    s.combatant(id).unwrap().current_health
}

#[test]
fn immunity_status_blocks_new_negative_statuses() {
    let mut c = fighter();
    apply_status(&mut c, Status::named("Perfect Sage"), 3, "Perfect Sage Mode", false, |_| {});
    let outcome = apply_status(&mut c, Status::named("burn"), 3, "Fireball Jutsu", false, |_| {});
    assert_eq!(outcome, Application::Blocked { by: "Perfect Sage".to_string() });
    assert!(find_status(&c, "burn").is_none());

    let mist = apply_status(&mut c, Status::named("mist"), 3, "Hidden Mist", false, |_| {});
    assert_eq!(mist, Application::Applied);
}

#[test]
fn cleanse_strips_negative_statuses_and_debuffs_only() {
    let mut c = fighter();
    apply_status(&mut c, Status::named("burn"), 3, "Fireball Jutsu", false, |_| {});
    add_stat_effect(&mut c, Effect::debuff(deltas(&[(Stat::Defense, -20)]), 3, "Armor Break"));
    add_stat_effect(&mut c, Effect::buff(deltas(&[(Stat::Power, 20)]), 3, "Iron Fist"));

    let removed = cleanse(&mut c, |_| {});
    assert_eq!(removed, vec!["burn".to_string(), "debuff(defense)".to_string()]);
    assert_eq!(c.effects.len(), 1);
    assert!(c.effects[0].is_buff());
}

#[test]
fn chakra_drain_with_a_positive_amount_adds_chakra_each_round() {
    let mut c = fighter();
    c.chakra = 6;
    c.effects.push(Effect::chakra_drain(2, 3, "Chakra Absorption"));
    let mut dice = Dice::from_seed(1);

    let report = tick_effects(&mut c, &mut dice, 999, |_| {});
    assert_eq!(report.chakra, 2);
    assert_eq!(report.damage, 0);
    assert_eq!(c.chakra, 8);

    tick_effects(&mut c, &mut dice, 999, |_| {});
    assert_eq!(c.chakra, 10);
}

#[test]
fn unknown_status_neither_disables_nor_damages() {
    let mut c = fighter();
    let outcome = apply_status(&mut c, Status::named("glitter"), 2, "Parade", false, |_| {});
    assert_eq!(outcome, Application::Applied);
    assert!(disabling_status(&c).is_none());

    let mut dice = Dice::from_seed(1);
    let report = tick_effects(&mut c, &mut dice, 999, |_| {});
    assert_eq!(report.damage, 0);
    assert_eq!(report.heal, 0);
}

#[test]
fn health_loss_on_expire_costs_a_share_of_max_health() {
    let mut c = fighter();
    let mut overdrive = Status::named("overdrive");
    overdrive.health_loss_on_expire = Some(0.15);
    apply_status(&mut c, overdrive, 1, "Overdrive", false, |_| {});
    let mut dice = Dice::from_seed(1);

    let report = tick_effects(&mut c, &mut dice, 999, |_| {});
    assert_eq!(report.damage, 150);
    assert_eq!(report.expired, vec!["overdrive".to_string()]);
}

#[test]
fn status_vulnerability_raises_damage_over_time_by_half() {
    let mut dice = Dice::from_seed(1);

    let mut plain = fighter();
    apply_status(&mut plain, Status::named("burn"), 3, "Fireball Jutsu", false, |_| {});
    assert_eq!(tick_effects(&mut plain, &mut dice, 999, |_| {}).damage, 25);

    let mut exposed = fighter();
    apply_status(&mut exposed, Status::named("burn"), 3, "Fireball Jutsu", false, |_| {});
    apply_status(&mut exposed, Status::named("status_vulnerability"), 3, "Flowing Red Scale", false, |_| {});
    assert_eq!(tick_effects(&mut exposed, &mut dice, 999, |_| {}).damage, 37);
}

#[test]
fn adaptation_shuts_out_every_new_status() {
    let mut c = fighter();
    let first = apply_status(&mut c, Status::named(ADAPTATION), 5, "Wheel of Fate", false, |_| {});
    assert_eq!(first, Application::Applied);

    let burn = apply_status(&mut c, Status::named("burn"), 3, "Fireball Jutsu", false, |_| {});
    assert_eq!(burn, Application::Blocked { by: ADAPTATION.to_string() });
    let revive = apply_status(&mut c, Status::revive(Some(100), None, true), 3, "Edo Tensei Seal", false, |_| {});
    assert!(!revive.landed());

    let again = apply_status(&mut c, Status::named(ADAPTATION), 5, "Wheel of Fate", false, |_| {});
    assert_eq!(again, Application::Refreshed);
}

#[test]
fn adaptation_counts_hits_per_technique() {
    let mut c = fighter();
    let taken: Vec<(i64, i64)> = (0..5)
        .map(|_| adapt_hit(&mut c, "Rasengan", 100))
        .map(|a| (a.taken, a.reflected))
        .collect();
    assert_eq!(taken, vec![(100, 0), (67, 0), (34, 25), (0, 50), (0, 50)]);

    let fresh = adapt_hit(&mut c, "Chidori", 100);
    assert_eq!((fresh.taken, fresh.reflected, fresh.hits), (100, 0, 1));
}

#[test]
fn adapted_defender_wears_down_a_repeated_attack() {
    let mut s = session();
    apply_status(s.combatant_mut("b").unwrap(), Status::named(ADAPTATION), 10, "Wheel of Fate", false, |_| {});

    let mut seen = Vec::new();
    for _ in 0..4 {
        play(&mut s, Action::ability("Attack"), Action::Rest);
        seen.push((hp(&s, "a"), hp(&s, "b")));
    }
    assert_eq!(seen, vec![(1000, 900), (1000, 833), (975, 799), (925, 799)]);
}

#[test]
fn adaptation_also_applies_to_damage_over_time() {
    let mut s = session();
    {
        let b = s.combatant_mut("b").unwrap();
        let burn = Status::named("burn").with_damage("100".parse().unwrap());
        apply_status(b, burn, 10, "Fireball Jutsu", false, |_| {});
        apply_status(b, Status::named(ADAPTATION), 10, "Wheel of Fate", false, |_| {});
    }

    for _ in 0..3 {
        play(&mut s, Action::Rest, Action::Rest);
    }
    assert_eq!(hp(&s, "b"), 799);
    assert_eq!(hp(&s, "a"), 975);
    assert_eq!(s.combatant("b").unwrap().adapted.get("burn"), Some(&3));
}
