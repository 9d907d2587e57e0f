use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ROUNDS: u32 = 50;
pub const DEFAULT_CHAKRA_REGEN: i64 = 2;
pub const DEFAULT_CHAKRA_CAP: i64 = 999;

/// Who acts first within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOrder {
    /// Higher effective power first; ties go to the first seat.
    #[default]
    PowerThenSeat,
    /// Always the first seat, then the second.
    Seat,
    /// Whoever submitted first.
    Submission,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct BattleConfig {
    /// The battle is a draw once this many rounds resolve without a winner.
    pub max_rounds: u32,
    pub turn_order: TurnOrder,
    /// Chakra both sides regain at the end of every round.
    pub chakra_regen: i64,
    pub chakra_cap: i64,
    pub seed: u64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            turn_order: TurnOrder::default(),
            chakra_regen: DEFAULT_CHAKRA_REGEN,
            chakra_cap: DEFAULT_CHAKRA_CAP,
            seed: 0,
        }
    }
}

impl BattleConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Read a battle config; `.yaml`/`.yml` files are YAML, anything else JSON.
pub fn load_config(path: impl AsRef<Path>) -> Result<BattleConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read battle config: {}", path.display()))?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let cfg = if yaml {
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse battle config YAML: {}", path.display()))?
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse battle config JSON: {}", path.display()))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: BattleConfig = serde_yaml::from_str("max_rounds: 12\nturn_order: seat\n").unwrap();
        assert_eq!(cfg.max_rounds, 12);
        assert_eq!(cfg.turn_order, TurnOrder::Seat);
        assert_eq!(cfg.chakra_regen, DEFAULT_CHAKRA_REGEN);
        assert_eq!(cfg.chakra_cap, DEFAULT_CHAKRA_CAP);
    }

    #[test]
    fn json_config_reads_turn_order() {
        let cfg: BattleConfig = serde_json::from_str(r#"{"turn_order":"submission","seed":9}"#).unwrap();
        assert_eq!(cfg.turn_order, TurnOrder::Submission);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.max_rounds, DEFAULT_MAX_ROUNDS);
    }
}
