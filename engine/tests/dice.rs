use jutsu_engine::Dice;

#[test]
fn same_seed_same_rolls() {
    let mut a = Dice::from_seed(7);
    let mut b = Dice::from_seed(7);
    let ra: Vec<u32> = (0..20).map(|_| a.percent()).collect();
    let rb: Vec<u32> = (0..20).map(|_| b.percent()).collect();
    assert_eq!(ra, rb);
    assert!(ra.iter().all(|r| (1..=100).contains(r)));
}

#[test]
fn chance_matches_its_percentage() {
    let mut dice = Dice::from_seed(2024);
    let trials = 20_000;
    let hits = (0..trials).filter(|_| dice.chance(35.0)).count();
    let rate = hits as f64 / trials as f64;
    assert!((0.33..=0.37).contains(&rate), "rate was {}", rate);
}

#[test]
fn certain_and_impossible_chances_do_not_roll() {
    let mut dice = Dice::from_scripted(vec![100, 1]);
    assert!(dice.chance(100.0));
    assert!(!dice.chance(0.0));
    // the scripted rolls are still queued
    assert_eq!(dice.percent(), 100);
    assert_eq!(dice.percent(), 1);
}

#[test]
fn scripted_rolls_drive_hits() {
    let mut dice = Dice::from_scripted(vec![30, 31]);
    assert!(dice.chance(30.0));
    assert!(!dice.chance(30.0));
}

#[test]
fn pick_stays_in_range() {
    let mut dice = Dice::from_seed(3);
    for len in 1..10 {
        assert!(dice.pick(len) < len);
    }
    let mut scripted = Dice::from_scripted(vec![7]);
    assert_eq!(scripted.pick(3), 1);
}
