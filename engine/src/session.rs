use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ability::Rulebook;
use crate::combatant::Combatant;
use crate::config::BattleConfig;
use crate::effects::disabling_status;
use crate::error::BattleError;
use crate::orchestrator::{Orchestrator, Phase};
use crate::resolver::AbilityResult;
use crate::Dice;

/// What a combatant does with its turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Ability(String),
    /// Skip the turn for one chakra.
    Rest,
    /// Give up; the opponent wins.
    Flee,
    /// Spend the bloodline awakening.
    Awaken,
}

impl Action {
    pub fn ability(name: impl Into<String>) -> Self {
        Action::Ability(name.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Knockout,
    /// An effect that nothing can intercept.
    Absolute,
    Fled,
    RoundLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Outcome {
    /// `None` on a draw.
    pub winner: Option<String>,
    pub reason: EndReason,
    pub rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ActionOutcome {
    Resolved { result: AbilityResult },
    Disabled { status: String },
    /// A negation effect ate the action.
    Negated,
    /// The routine failed; its changes were rolled back.
    Fault { ability: String, reason: String },
    Rested { chakra: i64 },
    Fled,
    Awakened { description: String },
    Cancelled { reason: String },
    /// The actor was already down when its turn came.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ActionReport {
    pub actor: String,
    pub action: Option<Action>,
    /// Ability that actually resolved once overrides were applied.
    pub resolved: Option<String>,
    pub outcome: ActionOutcome,
    /// Health the opponent lost to this action.
    pub damage_dealt: i64,
}

impl ActionReport {
    pub fn new(actor: &str, action: Option<Action>, outcome: ActionOutcome) -> Self {
        Self { actor: actor.to_string(), action, resolved: None, outcome, damage_dealt: 0 }
    }

    pub fn hit(&self) -> bool {
        matches!(&self.outcome, ActionOutcome::Resolved { result } if result.hit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EffectChange {
    pub combatant: String,
    pub effect: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Standing {
    pub id: String,
    pub health: i64,
    pub chakra: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RoundSummary {
    pub round: u32,
    pub actions: Vec<ActionReport>,
    /// Re-invocations of ongoing abilities.
    pub upkeep: Vec<ActionReport>,
    pub expired: Vec<EffectChange>,
    /// Health lost this round, per combatant id.
    pub damage_taken: IndexMap<String, i64>,
    pub standings: Vec<Standing>,
    pub narrative: Vec<String>,
    pub outcome: Option<Outcome>,
}

impl RoundSummary {
    pub fn new(round: u32) -> Self {
        Self { round, ..Self::default() }
    }

    pub fn action_of(&self, actor: &str) -> Option<&ActionReport> {
        self.actions.iter().find(|a| a.actor == actor)
    }
}

#[derive(Debug)]
pub struct BattleSession {
    fighters: [Combatant; 2],
    rulebook: Arc<Rulebook>,
    config: BattleConfig,
    dice: Dice,
    round: u32,
    phase: Phase,
    pending: [Option<Action>; 2],
    /// Seats in the order their actions arrived.
    submitted: Vec<usize>,
    outcome: Option<Outcome>,
}

impl BattleSession {
    pub fn new(
        first: Combatant,
        second: Combatant,
        rulebook: Arc<Rulebook>,
        config: BattleConfig,
    ) -> Result<Self, BattleError> {
        if first.id == second.id {
            return Err(BattleError::DuplicateCombatant(first.id));
        }
        tracing::debug!(first = %first.id, second = %second.id, seed = config.seed, "battle created");
        Ok(Self {
            fighters: [first, second],
            rulebook,
            dice: Dice::from_seed(config.seed),
            config,
            round: 1,
            phase: Phase::AwaitingActions,
            pending: [None, None],
            submitted: Vec::new(),
            outcome: None,
        })
    }

    /// Swap the random source, e.g. for scripted rolls.
    pub fn with_dice(mut self, dice: Dice) -> Self {
        self.dice = dice;
        self
    }

    fn seat_of(&self, id: &str) -> Result<usize, BattleError> {
        self.fighters
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| BattleError::UnknownCombatant(id.to_string()))
    }

    /// Queue this round's action for `id`. Rejected submissions leave the session untouched.
    pub fn submit_action(&mut self, id: &str, action: Action) -> Result<(), BattleError> {
        if self.outcome.is_some() {
            return Err(BattleError::BattleOver);
        }
        let seat = self.seat_of(id)?;
        let me = &self.fighters[seat];
        let other = &self.fighters[1 - seat];

        if let Some(status) = disabling_status(me) {
            return Err(BattleError::ActionDisabled {
                combatant: id.to_string(),
                status: status.name.clone(),
            });
        }
        match &action {
            Action::Ability(name) => {
                if !me.knows(name) {
                    return Err(BattleError::NotInMoveset {
                        combatant: id.to_string(),
                        ability: name.clone(),
                    });
                }
                if self.rulebook.catalog.get(name).is_none() {
                    return Err(BattleError::UnknownAbility(name.clone()));
                }
            }
            Action::Awaken => {
                let ready = me
                    .bloodline
                    .is_some_and(|b| !me.flags.bloodline_awakened && b.can_awaken(me, other));
                if !ready {
                    return Err(BattleError::BloodlineUnavailable(id.to_string()));
                }
            }
            Action::Rest | Action::Flee => {}
        }

        self.pending[seat] = Some(action);
        self.submitted.retain(|s| *s != seat);
        self.submitted.push(seat);
        Ok(())
    }

    /// Resolve the round. Every combatant able to act must have submitted.
    pub fn advance_round(&mut self) -> Result<RoundSummary, BattleError> {
        if self.outcome.is_some() {
            return Err(BattleError::BattleOver);
        }
        for (seat, fighter) in self.fighters.iter().enumerate() {
            let waiting = self.pending[seat].is_none() && disabling_status(fighter).is_none();
            if waiting && !fighter.is_down() {
                return Err(BattleError::AwaitingAction(fighter.id.clone()));
            }
        }

        self.phase = Phase::Resolving;
        let actions = std::mem::take(&mut self.pending);
        let order = std::mem::take(&mut self.submitted);
        let summary = Orchestrator::new(&mut self.fighters, &self.rulebook, &mut self.dice, &self.config, self.round)
            .run(actions, &order);

        self.phase = Phase::RoundComplete;
        match &summary.outcome {
            Some(outcome) => {
                tracing::debug!(round = self.round, winner = ?outcome.winner, reason = ?outcome.reason, "battle over");
                self.outcome = Some(outcome.clone());
                self.phase = Phase::BattleOver;
            }
            None => {
                self.round += 1;
                self.phase = Phase::AwaitingActions;
            }
        }
        Ok(summary)
    }

    pub fn is_over(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Round that the next `advance_round` resolves.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn combatant(&self, id: &str) -> Option<&Combatant> {
        self.fighters.iter().find(|c| c.id == id)
    }

    /// Direct access for setting up scenarios between rounds.
    pub fn combatant_mut(&mut self, id: &str) -> Option<&mut Combatant> {
        self.fighters.iter_mut().find(|c| c.id == id)
    }

    pub fn fighters(&self) -> &[Combatant; 2] {
        &self.fighters
    }

    pub fn rulebook(&self) -> &Rulebook {
        &self.rulebook
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Seats that still owe an action this round.
    pub fn awaiting(&self) -> Vec<&str> {
        self.fighters
            .iter()
            .enumerate()
            .filter(|(seat, c)| self.pending[*seat].is_none() && disabling_status(c).is_none() && !c.is_down())
            .map(|(_, c)| c.id.as_str())
            .collect()
    }
}
