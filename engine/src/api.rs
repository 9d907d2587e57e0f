use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::ability::{Catalog, Rulebook};
use crate::combatant::{Combatant, Profile};
use crate::config::{BattleConfig, load_config};
use crate::content::builtin_fighters;
use crate::npc::choose_action;
use crate::scripts::ScriptRegistry;
use crate::session::{Action, BattleSession, EndReason};
use crate::Dice;

/// Offsets the move-picking stream from the battle's own dice.
const BRAIN_SEED_SALT: u64 = 0x6a75_7473;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MatchConfig {
    /// Built-in fighter id or a profile JSON path.
    pub first: String,
    pub second: String,
    #[serde(default)]
    pub config_path: Option<String>,
    #[serde(default)]
    pub catalog_path: Option<String>,
    /// Overrides the seed from `config_path` when set.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MatchResult {
    pub first: String,
    pub second: String,
    /// Winner id, or "draw".
    pub winner: String,
    pub reason: EndReason,
    pub rounds: u32,
    pub first_hp_end: i64,
    pub second_hp_end: i64,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ManyStats {
    pub samples: u32,
    pub first_wins: u32,
    pub second_wins: u32,
    pub draws: u32,
    /// Battles ended by an absolute kill.
    pub absolute_endings: u32,
    pub avg_rounds: f64,
    pub median_rounds: u32,
    /// Average health the first fighter had left in the battles it won.
    pub avg_first_hp_left: f64,
}

/// Play one computer-vs-computer battle to the end.
pub fn simulate_match(cfg: &MatchConfig) -> Result<MatchResult> {
    let battle = battle_config(cfg)?;
    let rulebook = load_rulebook(cfg.catalog_path.as_deref())?;
    let (first, second) = pair_up(&load_profile(&cfg.first)?, &load_profile(&cfg.second)?);
    run_match(first, second, rulebook, battle)
}

/// Run `samples` battles, reseeding each one with `seed + i`.
pub fn simulate_match_many(cfg: &MatchConfig, samples: u32) -> Result<ManyStats> {
    let battle = battle_config(cfg)?;
    let rulebook = load_rulebook(cfg.catalog_path.as_deref())?;
    let first = load_profile(&cfg.first)?;
    let second = load_profile(&cfg.second)?;
    run_many(&first, &second, rulebook, battle, samples)
}

/// Run `samples` battles between two profiles; trial `i` uses `config.seed + i`.
pub fn run_many(
    first: &Profile,
    second: &Profile,
    rulebook: Arc<Rulebook>,
    config: BattleConfig,
    samples: u32,
) -> Result<ManyStats> {
    let mut stats = ManyStats { samples, ..ManyStats::default() };
    let mut rounds: Vec<u32> = Vec::with_capacity(samples as usize);
    let mut first_hp_left = 0i64;

    for i in 0..samples {
        let trial = config.clone().with_seed(config.seed.wrapping_add(u64::from(i)));
        let (a, b) = pair_up(first, second);
        let res = run_match(a, b, Arc::clone(&rulebook), trial)?;
        if res.reason == EndReason::Absolute {
            stats.absolute_endings += 1;
        }
        if res.winner == res.first {
            stats.first_wins += 1;
            first_hp_left += res.first_hp_end;
        } else if res.winner == res.second {
            stats.second_wins += 1;
        } else {
            stats.draws += 1;
        }
        rounds.push(res.rounds);
    }

    if !rounds.is_empty() {
        rounds.sort_unstable();
        let total: u64 = rounds.iter().map(|&r| u64::from(r)).sum();
        stats.avg_rounds = total as f64 / rounds.len() as f64;
        let mid = rounds.len() / 2;
        stats.median_rounds = if rounds.len() % 2 == 1 { rounds[mid] } else { (rounds[mid - 1] + rounds[mid]) / 2 };
    }
    if stats.first_wins > 0 {
        stats.avg_first_hp_left = first_hp_left as f64 / f64::from(stats.first_wins);
    }
    Ok(stats)
}

fn battle_config(cfg: &MatchConfig) -> Result<BattleConfig> {
    let battle = match &cfg.config_path {
        Some(path) => load_config(path)?,
        None => BattleConfig::default(),
    };
    Ok(match cfg.seed {
        Some(seed) => battle.with_seed(seed),
        None => battle,
    })
}

/// Session ids must differ, so a mirror match renames the second fighter.
fn pair_up(first: &Profile, second: &Profile) -> (Combatant, Combatant) {
    let a = Combatant::from_profile(first);
    let mut b = Combatant::from_profile(second);
    if a.id == b.id {
        b.id = format!("{}-2", b.id);
    }
    (a, b)
}

pub fn run_match(
    first: Combatant,
    second: Combatant,
    rulebook: Arc<Rulebook>,
    config: BattleConfig,
) -> Result<MatchResult> {
    let mut brain = Dice::from_seed(config.seed ^ BRAIN_SEED_SALT);
    let max_rounds = config.max_rounds;
    let mut session = BattleSession::new(first, second, rulebook, config)?;
    let mut log = Vec::new();

    {
        let [a, b] = session.fighters();
        log.push(format!(
            "[START] {} (HP {}, CK {}) vs {} (HP {}, CK {})",
            a.name, a.current_health, a.chakra, b.name, b.current_health, b.chakra
        ));
    }

    // One extra pass so a session that somehow never ends cannot spin forever.
    for _ in 0..=max_rounds {
        if session.is_over().is_some() {
            break;
        }
        let picks: Vec<(String, Action)> = {
            let fighters = session.fighters();
            let catalog = &session.rulebook().catalog;
            session
                .awaiting()
                .into_iter()
                .filter_map(|id| {
                    let seat = usize::from(fighters[1].id == id);
                    choose_action(&fighters[seat], &fighters[1 - seat], catalog, &mut brain)
                        .map(|action| (id.to_string(), action))
                })
                .collect()
        };
        for (id, action) in picks {
            if let Err(err) = session.submit_action(&id, action) {
                tracing::debug!(combatant = %id, %err, "choice rejected, resting instead");
                session.submit_action(&id, Action::Rest)?;
            }
        }
        let summary = session.advance_round()?;
        log.extend(summary.narrative);
    }

    let outcome = session
        .is_over()
        .cloned()
        .ok_or_else(|| anyhow!("battle did not finish within {} rounds", max_rounds))?;
    let [a, b] = session.fighters();
    let winner = outcome.winner.unwrap_or_else(|| "draw".to_string());
    log.push(format!(
        "[FINAL] winner={} {}_hp={} {}_hp={} rounds={}",
        winner, a.id, a.current_health, b.id, b.current_health, outcome.rounds
    ));

    Ok(MatchResult {
        first: a.id.clone(),
        second: b.id.clone(),
        winner,
        reason: outcome.reason,
        rounds: outcome.rounds,
        first_hp_end: a.current_health,
        second_hp_end: b.current_health,
        log,
    })
}

/// Resolve a built-in fighter id, falling back to a profile JSON path.
pub fn load_profile(id_or_path: &str) -> Result<Profile> {
    if let Some(text) = builtin_fighters().get(id_or_path) {
        return serde_json::from_str(text)
            .with_context(|| format!("failed to parse built-in fighter: {}", id_or_path));
    }
    let text = fs::read_to_string(id_or_path)
        .with_context(|| format!("failed to read fighter JSON: {}", id_or_path))?;
    let profile = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse fighter JSON: {}", id_or_path))?;
    Ok(profile)
}

/// Load a catalog file and pair it with every built-in routine.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Rulebook> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog JSON: {}", path.display()))?;
    let catalog = Catalog::from_json_str(&text)
        .with_context(|| format!("failed to parse catalog JSON: {}", path.display()))?;
    Ok(Rulebook::new(catalog, ScriptRegistry::builtin()))
}

fn load_rulebook(path: Option<&str>) -> Result<Arc<Rulebook>> {
    match path {
        Some(p) => Ok(Arc::new(load_catalog(p)?)),
        None => Ok(Rulebook::builtin()?),
    }
}

pub fn builtin_fighter_ids() -> Vec<&'static str> {
    let mut ids: Vec<_> = builtin_fighters().into_keys().collect();
    ids.sort_unstable();
    ids
}

/// Install a stderr `tracing` subscriber. Safe to call more than once.
pub fn init_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
