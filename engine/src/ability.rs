use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::BattleError;
use crate::formula::Formula;
use crate::scripts::ScriptRegistry;
use crate::stats::Stat;

/// Name of the basic attack every moveset may contain.
pub const BASIC_ATTACK: &str = "Attack";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostType {
    #[default]
    Chakra,
    /// `chakra_cost` is a percentage of current chakra.
    PercentChakra,
    AllChakra,
    Health,
    /// `chakra_cost` is a percentage of max health.
    PercentHealth,
}

/// Stat entry of a buff/debuff: a flat delta, or a target value whose difference from base
/// becomes the delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Flat(f64),
    Target(Formula),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatusSpec {
    pub status: String,
    #[serde(default = "one_round")]
    pub duration: u32,
    #[serde(default)]
    pub chance: Option<f64>,
    #[serde(default)]
    pub damage_per_turn: Option<Formula>,
    #[serde(default)]
    pub heal_per_turn: Option<Formula>,
    #[serde(default)]
    pub can_stack: bool,
    #[serde(default)]
    pub apply_to_user: bool,
    #[serde(default = "yes")]
    pub can_attack: bool,
    #[serde(default)]
    pub replace_with: Option<String>,
    #[serde(default)]
    pub reflect_percentage: Option<f64>,
    #[serde(default)]
    pub grants_immunity: bool,
    #[serde(default)]
    pub proc_chance: Option<f64>,
}

fn one_round() -> u32 {
    1
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectSpec {
    Damage {
        formula: Formula,
        #[serde(default)]
        lifesteal_percent: Option<f64>,
        #[serde(default)]
        accuracy_bonus: f64,
    },
    Buff {
        stats: IndexMap<Stat, StatValue>,
        #[serde(default = "one_round")]
        duration: u32,
    },
    Debuff {
        stats: IndexMap<Stat, StatValue>,
        #[serde(default = "one_round")]
        duration: u32,
    },
    Heal {
        formula: Formula,
    },
    ChakraGain {
        formula: Formula,
    },
    Status(StatusSpec),
    AutoKill {
        #[serde(default)]
        on_round: Option<u32>,
        #[serde(default)]
        health_threshold: Option<Formula>,
    },
    Revive {
        #[serde(default)]
        heal_amount: Option<i64>,
        #[serde(default)]
        heal_fraction: Option<f64>,
        #[serde(default)]
        once_per_battle: bool,
        #[serde(default = "one_round")]
        duration: u32,
    },
    ChakraDrain {
        amount: i64,
        #[serde(default = "one_round")]
        duration: u32,
    },
    InstantKill {
        chance: f64,
    },
    RemoveBuffs,
    Cleanse,
}

impl EffectSpec {
    pub fn heals_or_guards(&self) -> bool {
        match self {
            EffectSpec::Heal { .. } | EffectSpec::Revive { .. } => true,
            EffectSpec::Buff { stats, .. } => stats.contains_key(&Stat::Defense),
            EffectSpec::Status(s) => s.apply_to_user && s.heal_per_turn.is_some(),
            _ => false,
        }
    }

    pub fn is_offensive(&self) -> bool {
        matches!(
            self,
            EffectSpec::Damage { .. } | EffectSpec::AutoKill { .. } | EffectSpec::InstantKill { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AbilityKind {
    Declarative {
        effects: Vec<EffectSpec>,
        /// When set, one of `random_effects` (or `effects`) is picked per use.
        random: bool,
        random_effects: Vec<EffectSpec>,
    },
    Scripted {
        routine: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "AbilityDef")]
pub struct Ability {
    pub name: String,
    pub description: Option<String>,
    pub chakra_cost: i64,
    pub cost_type: CostType,
    /// Hit chance before dodge; abilities without one always connect.
    pub accuracy: Option<f64>,
    /// Registered for per-round upkeep after its first successful cast.
    pub ongoing: bool,
    pub kind: AbilityKind,
}

impl Ability {
    pub fn declarative(name: impl Into<String>, chakra_cost: i64, effects: Vec<EffectSpec>) -> Self {
        Self {
            name: name.into(),
            description: None,
            chakra_cost,
            cost_type: CostType::Chakra,
            accuracy: None,
            ongoing: false,
            kind: AbilityKind::Declarative { effects, random: false, random_effects: Vec::new() },
        }
    }

    pub fn scripted(name: impl Into<String>, chakra_cost: i64, routine: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            chakra_cost,
            cost_type: CostType::Chakra,
            accuracy: None,
            ongoing: false,
            kind: AbilityKind::Scripted { routine: routine.into() },
        }
    }

    pub fn ongoing(mut self) -> Self {
        self.ongoing = true;
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_cost_type(mut self, cost_type: CostType) -> Self {
        self.cost_type = cost_type;
        self
    }

    pub fn routine(&self) -> Option<&str> {
        match &self.kind {
            AbilityKind::Scripted { routine } => Some(routine),
            AbilityKind::Declarative { .. } => None,
        }
    }

    pub fn effects(&self) -> &[EffectSpec] {
        match &self.kind {
            AbilityKind::Declarative { effects, .. } => effects,
            AbilityKind::Scripted { .. } => &[],
        }
    }
}

/// Wire shape of a catalog entry: either `effects` or `script_ref`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
struct AbilityDef {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "chakraCost")]
    chakra_cost: i64,
    #[serde(default)]
    cost_type: CostType,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    ongoing: bool,
    #[serde(default)]
    effects: Option<Vec<EffectSpec>>,
    #[serde(default)]
    random: bool,
    #[serde(default)]
    random_effects: Vec<EffectSpec>,
    #[serde(default, alias = "scriptRef")]
    script_ref: Option<String>,
}

impl TryFrom<AbilityDef> for Ability {
    type Error = BattleError;

    fn try_from(def: AbilityDef) -> Result<Self, Self::Error> {
        let kind = match (def.effects, def.script_ref) {
            (Some(_), Some(_)) => {
                return Err(BattleError::Catalog(format!(
                    "'{}' has both effects and script_ref",
                    def.name
                )));
            }
            (None, Some(routine)) => AbilityKind::Scripted { routine },
            (effects, None) => AbilityKind::Declarative {
                effects: effects.unwrap_or_default(),
                random: def.random,
                random_effects: def.random_effects,
            },
        };
        Ok(Ability {
            name: def.name,
            description: def.description,
            chakra_cost: def.chakra_cost,
            cost_type: def.cost_type,
            accuracy: def.accuracy,
            ongoing: def.ongoing,
            kind,
        })
    }
}

/// Fires once every ability in `requires` has been used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Combo {
    pub name: String,
    pub requires: Vec<String>,
    #[serde(default)]
    pub damage: Option<Formula>,
    #[serde(default)]
    pub effects: Vec<EffectSpec>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    abilities: IndexMap<String, Ability>,
    combos: Vec<Combo>,
}

#[derive(Deserialize)]
struct CatalogFile {
    abilities: Vec<Ability>,
    #[serde(default)]
    combos: Vec<Combo>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self, BattleError> {
        let file: CatalogFile =
            serde_json::from_str(text).map_err(|e| BattleError::Catalog(e.to_string()))?;
        let mut catalog = Catalog::new();
        for ability in file.abilities {
            if catalog.abilities.contains_key(&ability.name) {
                return Err(BattleError::Catalog(format!("duplicate ability '{}'", ability.name)));
            }
            catalog.insert(ability);
        }
        catalog.combos = file.combos;
        Ok(catalog)
    }

    pub fn insert(&mut self, ability: Ability) {
        self.abilities.insert(ability.name.clone(), ability);
    }

    pub fn add_combo(&mut self, combo: Combo) {
        self.combos.push(combo);
    }

    pub fn get(&self, name: &str) -> Option<&Ability> {
        self.abilities.get(name)
    }

    pub fn abilities(&self) -> impl Iterator<Item = &Ability> {
        self.abilities.values()
    }

    pub fn combos(&self) -> &[Combo] {
        &self.combos
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}

/// Read-only rules shared by every battle session: the catalog plus the routine registry.
#[derive(Debug, Clone)]
pub struct Rulebook {
    pub catalog: Catalog,
    pub scripts: ScriptRegistry,
}

impl Rulebook {
    pub fn new(catalog: Catalog, scripts: ScriptRegistry) -> Self {
        for ability in catalog.abilities() {
            if let Some(routine) = ability.routine() {
                if scripts.get(routine).is_none() {
                    tracing::warn!(ability = %ability.name, routine, "ability references an unregistered routine");
                }
            }
        }
        Self { catalog, scripts }
    }

    /// Built-in catalog with every built-in routine, shared process-wide.
    pub fn builtin() -> Result<Arc<Rulebook>, BattleError> {
        static BUILTIN: std::sync::OnceLock<Result<Arc<Rulebook>, BattleError>> = std::sync::OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                let catalog = Catalog::from_json_str(crate::content::builtin_catalog())?;
                Ok(Arc::new(Rulebook::new(catalog, ScriptRegistry::builtin())))
            })
            .clone()
    }
}
