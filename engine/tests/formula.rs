use jutsu_engine::formula::Scope;
use jutsu_engine::{EffectiveStats, Formula};

fn stats(power: i64, defense: i64, health: i64) -> EffectiveStats {
    EffectiveStats {
        power,
        defense,
        chakra: 20,
        max_health: 1000,
        health,
        accuracy: 100,
        dodge: 1,
    }
}

#[test]
fn formulas_normalize_and_evaluate() {
    let user = stats(100, 40, 800);
    let target = stats(60, 50, 300);
    let scope = Scope::new(&user, &target);
    let sources = [
        "2500*user.power/target.defense",
        "max(1,user.power-target.defense*0.5)",
        "10 - (4 - 3)",
        "(10 - 4) - 3",
        "-(user.power + 1)",
        "pow(target.health, 2) / 4",
    ];
    let mut out = String::new();
    for src in sources {
        let f: Formula = src.parse().unwrap();
        out.push_str(&format!("{} = {}\n", f, f.eval_floor(&scope)));
    }
    insta::assert_snapshot!(out, @r"
    2500 * user.power / target.defense = 5000
    max(1, user.power - target.defense * 0.5) = 75
    10 - (4 - 3) = 9
    10 - 4 - 3 = 3
    -(user.power + 1) = -101
    pow(target.health, 2) / 4 = 22500
    ");
}

#[test]
fn formulas_survive_a_catalog_round_trip() {
    let f: Formula = "user.max_health * 0.15".parse().unwrap();
    let json = serde_json::to_string(&f).unwrap();
    assert_eq!(json, "\"user.max_health * 0.15\"");
    let back: Formula = serde_json::from_str(&json).unwrap();
    assert_eq!(back, f);
}

#[test]
fn bad_formulas_point_at_the_problem() {
    let err = "user.power * banana".parse::<Formula>().unwrap_err();
    assert_eq!(err.source_text, "user.power * banana");
    assert!(err.pos >= 13);
}
