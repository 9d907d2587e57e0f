use jutsu_engine::api::{MatchConfig, builtin_fighter_ids, load_profile, run_many, simulate_match, simulate_match_many};
use jutsu_engine::{BattleConfig, Bloodline, EndReason, Rulebook};

fn cfg(first: &str, second: &str, seed: u64) -> MatchConfig {
    MatchConfig {
        first: first.into(),
        second: second.into(),
        seed: Some(seed),
        ..MatchConfig::default()
    }
}

#[test]
fn builtin_catalog_loads_with_every_routine() {
    let rulebook = Rulebook::builtin().unwrap();
    assert!(rulebook.catalog.get("Attack").is_some());
    for ability in rulebook.catalog.abilities() {
        if let Some(routine) = ability.routine() {
            assert!(rulebook.scripts.get(routine).is_some(), "{} has no routine", ability.name);
        }
    }
    assert_eq!(rulebook.scripts.len(), 25);
}

#[test]
fn builtin_fighters_only_know_catalog_moves() {
    let rulebook = Rulebook::builtin().unwrap();
    for id in builtin_fighter_ids() {
        let profile = load_profile(id).unwrap();
        assert_eq!(profile.id, id);
        for jutsu in &profile.jutsu {
            assert!(rulebook.catalog.get(jutsu).is_some(), "{} knows unknown {}", id, jutsu);
        }
    }
    assert_eq!(load_profile("hinata").unwrap().bloodline, Some(Bloodline::Hyuga));
}

#[test]
fn match_with_builtins_runs_to_an_end() {
    let res = simulate_match(&cfg("naruto", "bandit", 2025)).unwrap();
    assert!(res.rounds > 0);
    assert!(res.winner == "naruto" || res.winner == "bandit" || res.winner == "draw");
    assert!(res.log.first().unwrap().starts_with("[START]"));
    assert!(res.log.last().unwrap().starts_with("[FINAL]"));
}

#[test]
fn matches_are_reproducible() {
    let a = simulate_match(&cfg("sasuke", "shikamaru", 99)).unwrap();
    let b = simulate_match(&cfg("sasuke", "shikamaru", 99)).unwrap();
    assert_eq!(a.winner, b.winner);
    assert_eq!(a.rounds, b.rounds);
    assert_eq!(a.log, b.log);
}

#[test]
fn mirror_match_gets_distinct_ids() {
    let res = simulate_match(&cfg("bandit", "bandit", 5)).unwrap();
    assert_eq!(res.first, "bandit");
    assert_eq!(res.second, "bandit-2");
    if res.reason == EndReason::RoundLimit {
        assert_eq!(res.winner, "draw");
    }
}

#[test]
fn many_summary_makes_sense() {
    let stats = simulate_match_many(&cfg("hinata", "bandit", 1), 20).unwrap();
    assert_eq!(stats.samples, 20);
    assert_eq!(stats.first_wins + stats.second_wins + stats.draws, 20);
    assert!(stats.avg_rounds > 0.0);
}

#[test]
fn batch_runner_handles_mirror_matches() {
    let bandit = load_profile("bandit").unwrap();
    let cfg = BattleConfig { max_rounds: 30, seed: 7, ..BattleConfig::default() };
    let stats = run_many(&bandit, &bandit, Rulebook::builtin().unwrap(), cfg, 12).unwrap();
    assert_eq!(stats.first_wins + stats.second_wins + stats.draws, 12);
    assert!(stats.absolute_endings <= 12);
    assert!((1..=30).contains(&stats.median_rounds));
    if stats.first_wins == 0 {
        assert_eq!(stats.avg_first_hp_left, 0.0);
    } else {
        assert!(stats.avg_first_hp_left > 0.0);
    }
}

#[test]
fn missing_profile_is_reported() {
    let err = load_profile("no/such/fighter.json").unwrap_err();
    assert!(format!("{:#}", err).contains("failed to read fighter JSON"));
}
