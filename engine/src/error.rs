use thiserror::Error;

use crate::formula::FormulaError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BattleError {
    #[error("combatant '{0}' is not part of this battle")]
    UnknownCombatant(String),
    #[error("both combatants share the id '{0}'")]
    DuplicateCombatant(String),
    #[error("ability '{0}' is not in the catalog")]
    UnknownAbility(String),
    #[error("'{combatant}' does not know '{ability}'")]
    NotInMoveset { combatant: String, ability: String },
    #[error("'{combatant}' cannot act this round ({status})")]
    ActionDisabled { combatant: String, status: String },
    #[error("'{0}' has no bloodline ready to awaken")]
    BloodlineUnavailable(String),
    #[error("still waiting on an action from '{0}'")]
    AwaitingAction(String),
    #[error("the battle is already over")]
    BattleOver,
    #[error("catalog: {0}")]
    Catalog(String),
    #[error(transparent)]
    Formula(#[from] FormulaError),
}

/// Returned by a custom routine that could not complete.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptFault {
    #[error("no routine registered as '{0}'")]
    UnknownRoutine(String),
    #[error("routine '{routine}' failed: {reason}")]
    Failed { routine: String, reason: String },
    #[error("routine '{0}' panicked")]
    Panicked(String),
}
