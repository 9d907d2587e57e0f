use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use crate::ability::{Ability, BASIC_ATTACK, Rulebook};
use crate::combatant::{Combatant, OngoingAbility};
use crate::config::{BattleConfig, TurnOrder};
use crate::effects::{
    self, ADAPTATION, Effect, Status, StatusKind, attack_override, disabling_status, has_status, reflect_of,
    tick_effects, try_revive,
};
use crate::error::ScriptFault;
use crate::formula::Scope;
use crate::resolver::{self, AbilityResult, Context, KillKind, OngoingDirective};
use crate::session::{Action, ActionOutcome, ActionReport, EffectChange, EndReason, Outcome, RoundSummary, Standing};
use crate::stats::effective_stats;
use crate::Dice;

const RAIDERS_DEBT_ROUNDS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingActions,
    Resolving,
    RoundComplete,
    BattleOver,
}

/// Seats in the order they act this round.
pub fn turn_order(policy: TurnOrder, fighters: &[Combatant; 2], submitted: &[usize]) -> [usize; 2] {
    match policy {
        TurnOrder::PowerThenSeat => {
            let first = effective_stats(&fighters[0]).power;
            let second = effective_stats(&fighters[1]).power;
            if second > first { [1, 0] } else { [0, 1] }
        }
        TurnOrder::Seat => [0, 1],
        TurnOrder::Submission => {
            if submitted.first() == Some(&1) { [1, 0] } else { [0, 1] }
        }
    }
}

fn pair_mut(fighters: &mut [Combatant; 2], seat: usize) -> (&mut Combatant, &mut Combatant) {
    let (a, b) = fighters.split_at_mut(1);
    if seat == 0 { (&mut a[0], &mut b[0]) } else { (&mut b[0], &mut a[0]) }
}

pub(crate) struct Orchestrator<'s> {
    fighters: &'s mut [Combatant; 2],
    rulebook: &'s Rulebook,
    dice: &'s mut Dice,
    config: &'s BattleConfig,
    round: u32,
    summary: RoundSummary,
}

impl<'s> Orchestrator<'s> {
    pub(crate) fn new(
        fighters: &'s mut [Combatant; 2],
        rulebook: &'s Rulebook,
        dice: &'s mut Dice,
        config: &'s BattleConfig,
        round: u32,
    ) -> Self {
        Self { fighters, rulebook, dice, config, round, summary: RoundSummary::new(round) }
    }

    pub(crate) fn run(mut self, mut actions: [Option<Action>; 2], submitted: &[usize]) -> RoundSummary {
        tracing::debug!(round = self.round, "resolving round");
        self.log(format!("[ROUND] {}", self.round));

        for seat in turn_order(self.config.turn_order, self.fighters, submitted) {
            if self.over() {
                break;
            }
            let action = actions[seat].take();
            let report = self.turn(seat, action);
            let combo_trigger = match (&report.outcome, &report.resolved) {
                (ActionOutcome::Resolved { result }, Some(name)) if result.hit => Some(name.clone()),
                _ => None,
            };
            self.summary.actions.push(report);
            self.check_knockouts();
            if let Some(name) = combo_trigger {
                if !self.over() {
                    self.advance_combos(seat, &name);
                    self.check_knockouts();
                }
            }
        }

        if !self.over() {
            self.end_of_round();
        }
        if !self.over() && self.round >= self.config.max_rounds {
            self.log(format!("[END] round limit of {} reached", self.config.max_rounds));
            self.finish(None, EndReason::RoundLimit);
        }

        self.summary.standings = self
            .fighters
            .iter()
            .map(|c| Standing { id: c.id.clone(), health: c.current_health, chakra: c.chakra })
            .collect();
        self.summary
    }

    fn log(&mut self, line: String) {
        self.summary.narrative.push(line);
    }

    fn over(&self) -> bool {
        self.summary.outcome.is_some()
    }

    fn finish(&mut self, winner: Option<usize>, reason: EndReason) {
        if self.over() {
            return;
        }
        let winner = winner.map(|seat| self.fighters[seat].id.clone());
        match &winner {
            Some(id) => self.log(format!("[END] {} wins ({:?})", id, reason)),
            None => self.log(format!("[END] draw ({:?})", reason)),
        }
        self.summary.outcome = Some(Outcome { winner, reason, rounds: self.round });
    }

    fn check_knockouts(&mut self) {
        if self.over() {
            return;
        }
        match (self.fighters[0].is_down(), self.fighters[1].is_down()) {
            (true, true) => self.finish(None, EndReason::Knockout),
            (true, false) => self.finish(Some(1), EndReason::Knockout),
            (false, true) => self.finish(Some(0), EndReason::Knockout),
            (false, false) => {}
        }
    }

    fn turn(&mut self, seat: usize, action: Option<Action>) -> ActionReport {
        let id = self.fighters[seat].id.clone();
        let name = self.fighters[seat].name.clone();
        if self.fighters[seat].is_down() {
            return ActionReport::new(&id, action, ActionOutcome::Skipped);
        }
        if self.fighters[seat].flags.action_negated {
            self.fighters[seat].flags.action_negated = false;
            self.log(format!("[COND][{}] action negated", name));
            return ActionReport::new(&id, action, ActionOutcome::Negated);
        }
        if let Some(status) = disabling_status(&self.fighters[seat]) {
            let status = status.name.clone();
            self.log(format!("[COND][{}] cannot act ({})", name, status));
            return ActionReport::new(&id, action, ActionOutcome::Disabled { status });
        }
        let Some(action) = action else {
            return ActionReport::new(&id, None, ActionOutcome::Skipped);
        };
        if let Some(reason) = self.raiders_tower(seat, &action) {
            return ActionReport::new(&id, Some(action), ActionOutcome::Cancelled { reason });
        }

        let outcome = match &action {
            Action::Rest => {
                let before = self.fighters[seat].chakra;
                self.fighters[seat].gain_chakra(1, self.config.chakra_cap);
                let gained = self.fighters[seat].chakra - before;
                self.log(format!("[CHAKRA][{}] rests (+{})", name, gained));
                ActionOutcome::Rested { chakra: gained }
            }
            Action::Flee => {
                self.log(format!("[ACT][{}] flees", name));
                self.finish(Some(1 - seat), EndReason::Fled);
                ActionOutcome::Fled
            }
            Action::Awaken => self.awaken(seat),
            Action::Ability(requested) => {
                let requested = requested.clone();
                return self.use_ability(seat, action, &requested);
            }
        };
        ActionReport::new(&id, Some(action), outcome)
    }

    /// Trap holders who act fall into debt; debtors who act again instead of resting die.
    fn raiders_tower(&mut self, seat: usize, action: &Action) -> Option<String> {
        let round = self.round;
        let holder = &mut self.fighters[seat];
        let name = holder.name.clone();

        let debt = holder.effects.iter().position(|e| {
            e.as_status().is_some_and(|s| s.kind() == StatusKind::RaidersDebt && s.triggered_round.is_some_and(|r| r < round))
        });
        if let Some(idx) = debt {
            holder.effects.remove(idx);
            if *action == Action::Rest {
                self.log(format!("[COND][{}] pays the Raiders Tower debt", name));
                return None;
            }
            let lost = holder.current_health.max(0);
            holder.current_health = 0;
            let id = holder.id.clone();
            *self.summary.damage_taken.entry(id).or_insert(0) += lost;
            self.log(format!("[DMG][{}] is claimed by Raiders Tower", name));
            self.finish(Some(1 - seat), EndReason::Absolute);
            return Some("Raiders Tower debt".to_string());
        }

        if matches!(action, Action::Rest | Action::Flee) {
            return None;
        }
        let trap = holder
            .effects
            .iter()
            .position(|e| e.as_status().is_some_and(|s| s.kind() == StatusKind::RaidersTrap))?;
        let source = holder.effects.remove(trap).source;
        let mut status = Status::named("raiders_tower_debt");
        status.triggered_round = Some(round);
        holder.effects.push(Effect::status(status, RAIDERS_DEBT_ROUNDS, source));
        self.log(format!("[COND][{}] acted inside Raiders Tower and is now in debt", name));
        None
    }

    fn awaken(&mut self, seat: usize) -> ActionOutcome {
        let (me, other) = pair_mut(self.fighters, seat);
        let Some(bloodline) = me.bloodline else {
            return ActionOutcome::Cancelled { reason: "no bloodline".to_string() };
        };
        if me.flags.bloodline_awakened || !bloodline.can_awaken(me, other) {
            return ActionOutcome::Cancelled { reason: "awakening requirements not met".to_string() };
        }
        let narrative = &mut self.summary.narrative;
        let description = bloodline.awaken(me, other, self.config.chakra_cap, |m| narrative.push(m));
        narrative.push(format!("[ACT][{}] {}", me.name, description));
        ActionOutcome::Awakened { description }
    }

    fn use_ability(&mut self, seat: usize, action: Action, requested: &str) -> ActionReport {
        let id = self.fighters[seat].id.clone();
        let mut name = requested.to_string();
        if name == BASIC_ATTACK {
            if let Some(forced) = attack_override(&self.fighters[seat]) {
                name = forced.to_string();
            }
        }
        let mut report = ActionReport::new(&id, Some(action), ActionOutcome::Skipped);
        report.resolved = Some(name.clone());

        let rulebook = self.rulebook;
        let Some(ability) = rulebook.catalog.get(&name) else {
            report.outcome = ActionOutcome::Cancelled { reason: format!("unknown ability '{}'", name) };
            return report;
        };

        match self.invoke(seat, ability, true, 1) {
            Ok(result) => {
                self.narrate(seat, &result);
                report.damage_dealt = self.commit(seat, &result);
                if ability.ongoing {
                    if let Some(OngoingDirective::Renew(rounds_left)) = result.ongoing {
                        self.register_ongoing(seat, &name, rounds_left);
                    }
                }
                report.outcome = ActionOutcome::Resolved { result };
            }
            Err(fault) => {
                report.outcome = ActionOutcome::Fault { ability: name, reason: fault.to_string() };
            }
        }
        report
    }

    /// Run the resolver with both combatants snapshotted; a fault or panic restores them.
    fn invoke(
        &mut self,
        seat: usize,
        ability: &Ability,
        first: bool,
        activation_round: u32,
    ) -> Result<AbilityResult, ScriptFault> {
        let rulebook = self.rulebook;
        let round = self.round;
        let chakra_cap = self.config.chakra_cap;
        let (user, target) = pair_mut(self.fighters, seat);
        let snapshot = (user.clone(), target.clone());
        let dice = &mut *self.dice;

        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = Context {
                rulebook,
                dice,
                round,
                activation_round,
                is_first_activation: first,
                chakra_cap,
            };
            resolver::execute(ability, user, target, &mut ctx)
        }));
        let outcome = caught.unwrap_or_else(|_| Err(ScriptFault::Panicked(ability.name.clone())));

        if let Err(fault) = &outcome {
            let (user, target) = pair_mut(self.fighters, seat);
            *user = snapshot.0;
            *target = snapshot.1;
            tracing::warn!(ability = %ability.name, combatant = %user.id, %fault, "script fault; action dropped");
            let line = format!("[FAULT][{}] {} did nothing ({})", user.name, ability.name, fault);
            self.log(line);
        } else {
            // Health costs are paid inside the resolver.
            self.settle(seat);
        }
        outcome
    }

    fn narrate(&mut self, seat: usize, result: &AbilityResult) {
        let name = self.fighters[seat].name.clone();
        let tail = if result.hit { "" } else { " (missed)" };
        self.log(format!("[ACT][{}] {}{}", name, result.description, tail));
    }

    /// Apply what a result asks for. Returns the health the opponent lost.
    fn commit(&mut self, seat: usize, result: &AbilityResult) -> i64 {
        let other = 1 - seat;
        if result.kill == Some(KillKind::Absolute) {
            let victim = &mut self.fighters[other];
            let lost = victim.current_health.max(0);
            victim.current_health = 0;
            let (id, name) = (victim.id.clone(), victim.name.clone());
            *self.summary.damage_taken.entry(id).or_insert(0) += lost;
            self.log(format!("[DMG][{}] is destroyed by {}", name, result.ability));
            self.finish(Some(seat), EndReason::Absolute);
            return lost;
        }

        let mut dealt = 0;
        if result.damage > 0 {
            dealt += self.deliver(seat, other, result.damage, &result.ability);
        }
        if result.kill == Some(KillKind::Execute) {
            let lost = self.fighters[other].current_health.max(0);
            dealt += self.hurt(other, lost.max(1), &result.ability);
        }
        if result.heal > 0 {
            let narrative = &mut self.summary.narrative;
            self.fighters[seat].heal(result.heal, |m| narrative.push(m));
        }
        if result.self_damage > 0 {
            self.hurt(seat, result.self_damage, &result.ability);
        }
        dealt
    }

    /// Damage from `attacker` to `victim`, bounced back whole-cloth by an active reflect and worn
    /// down by an active adaptation.
    fn deliver(&mut self, attacker: usize, victim: usize, amount: i64, source: &str) -> i64 {
        if let Some(pct) = reflect_of(&self.fighters[victim]) {
            let bounced = (amount as f64 * pct).floor() as i64;
            let name = self.fighters[victim].name.clone();
            self.log(format!("[REFLECT][{}] returns {} of {} damage", name, bounced, amount));
            self.hurt(attacker, bounced, source);
            return 0;
        }
        let amount = if has_status(&self.fighters[victim], StatusKind::Adaptation) {
            self.adapt(victim, attacker, source, amount)
        } else {
            amount
        };
        self.hurt(victim, amount, source)
    }

    /// Damage `holder` still takes from `technique` after adapting; reflected damage goes to `other`.
    fn adapt(&mut self, holder: usize, other: usize, technique: &str, amount: i64) -> i64 {
        if amount <= 0 {
            return amount;
        }
        let adapted = effects::adapt_hit(&mut self.fighters[holder], technique, amount);
        let name = self.fighters[holder].name.clone();
        self.log(format!(
            "[COND][{}] adapts to {} (hit {}): {} of {} damage",
            name, technique, adapted.hits, adapted.taken, amount
        ));
        if adapted.reflected > 0 && !self.fighters[other].is_down() {
            self.log(format!("[REFLECT][{}] the wheel returns {} damage", name, adapted.reflected));
            self.hurt(other, adapted.reflected, ADAPTATION);
        }
        adapted.taken
    }

    fn hurt(&mut self, idx: usize, amount: i64, source: &str) -> i64 {
        if amount <= 0 {
            return 0;
        }
        let c = &mut self.fighters[idx];
        let before = c.current_health;
        c.current_health = before.saturating_sub(amount);
        let line = format!("[DMG][{}] {} → {} (-{}, {})", c.name, before, c.current_health, amount, source);
        let id = c.id.clone();
        self.log(line);
        let taken = self.summary.damage_taken.entry(id).or_insert(0);
        *taken = taken.saturating_add(amount);
        self.settle(idx);
        amount
    }

    /// Immortality and revives get their chance whenever health reaches zero.
    fn settle(&mut self, idx: usize) {
        let c = &mut self.fighters[idx];
        if c.current_health > 0 {
            return;
        }
        if c.flags.is_immortal() {
            c.current_health = 1;
            let line = format!("[COND][{}] refuses to fall (immortal)", c.name);
            self.log(line);
            return;
        }
        let narrative = &mut self.summary.narrative;
        try_revive(c, |m| narrative.push(m));
    }

    fn register_ongoing(&mut self, seat: usize, ability: &str, rounds_left: u32) {
        let round = self.round;
        let holder = &mut self.fighters[seat];
        holder.ongoing.retain(|o| o.ability != ability);
        holder.ongoing.push(OngoingAbility { ability: ability.to_string(), rounds_left, activated_round: round });
        let line = format!("[ONGOING][{}] {} sustained", holder.name, ability);
        self.log(line);
    }

    fn set_rounds_left(&mut self, seat: usize, ability: &str, rounds_left: u32) {
        if let Some(entry) = self.fighters[seat].ongoing.iter_mut().find(|o| o.ability == ability) {
            entry.rounds_left = rounds_left;
        }
    }

    fn advance_combos(&mut self, seat: usize, used: &str) {
        let rulebook = self.rulebook;
        let combos = rulebook.catalog.combos();
        if !combos.iter().any(|c| c.requires.iter().any(|r| r == used)) {
            return;
        }
        let progress = &mut self.fighters[seat].combo_progress;
        progress.insert(used.to_string());
        let Some(combo) = combos.iter().find(|c| c.requires.iter().all(|r| progress.contains(r))) else {
            return;
        };
        progress.clear();

        let (user, target) = pair_mut(self.fighters, seat);
        let id = user.id.clone();
        let mut result = AbilityResult::new(&combo.name, format!("{} completes the {} combo!", user.name, combo.name));
        if let Some(formula) = &combo.damage {
            let (u, t) = (effective_stats(user), effective_stats(target));
            result.damage = formula.eval_floor(&Scope::new(&u, &t)).max(0);
        }
        let mut ctx = Context {
            rulebook,
            dice: &mut *self.dice,
            round: self.round,
            activation_round: 1,
            is_first_activation: true,
            chakra_cap: self.config.chakra_cap,
        };
        for spec in &combo.effects {
            resolver::apply_spec(spec, &combo.name, None, user, target, &mut ctx, &mut result);
        }

        self.narrate(seat, &result);
        let dealt = self.commit(seat, &result);
        let mut report = ActionReport::new(&id, None, ActionOutcome::Resolved { result });
        report.resolved = Some(combo.name.clone());
        report.damage_dealt = dealt;
        self.summary.actions.push(report);
    }

    fn end_of_round(&mut self) {
        for seat in 0..2 {
            self.upkeep(seat);
            if self.over() {
                return;
            }
        }
        self.expire_ongoing();

        for seat in 0..2 {
            self.tick(seat);
            self.check_knockouts();
            if self.over() {
                return;
            }
        }

        let cap = self.config.chakra_cap;
        for seat in 0..2 {
            if self.fighters[seat].is_down() {
                continue;
            }
            let Some(bloodline) = self.fighters[seat].bloodline else {
                continue;
            };
            let (me, other) = pair_mut(self.fighters, seat);
            let narrative = &mut self.summary.narrative;
            bloodline.passive(me, other, cap, |m| narrative.push(m));
        }

        let regen = self.config.chakra_regen;
        if regen != 0 {
            for fighter in self.fighters.iter_mut().filter(|f| !f.is_down()) {
                fighter.gain_chakra(regen, cap);
            }
        }
        self.check_knockouts();
    }

    /// Re-invoke every ongoing ability registered before this round.
    fn upkeep(&mut self, seat: usize) {
        let round = self.round;
        let due: Vec<OngoingAbility> = self.fighters[seat]
            .ongoing
            .iter()
            .filter(|o| o.activated_round < round && o.rounds_left > 0)
            .cloned()
            .collect();
        let rulebook = self.rulebook;

        for entry in due {
            if self.over() || self.fighters[seat].is_down() {
                return;
            }
            let id = self.fighters[seat].id.clone();
            let mut report = ActionReport::new(&id, Some(Action::Ability(entry.ability.clone())), ActionOutcome::Skipped);
            report.resolved = Some(entry.ability.clone());
            let Some(ability) = rulebook.catalog.get(&entry.ability) else {
                self.set_rounds_left(seat, &entry.ability, 0);
                report.outcome = ActionOutcome::Cancelled { reason: format!("unknown ability '{}'", entry.ability) };
                self.summary.upkeep.push(report);
                continue;
            };

            let activation_round = round - entry.activated_round + 1;
            match self.invoke(seat, ability, false, activation_round) {
                Ok(result) => {
                    self.narrate(seat, &result);
                    report.damage_dealt = self.commit(seat, &result);
                    match result.ongoing {
                        Some(OngoingDirective::Renew(n)) => self.set_rounds_left(seat, &entry.ability, n),
                        Some(OngoingDirective::Terminate) => self.set_rounds_left(seat, &entry.ability, 0),
                        None => {}
                    }
                    report.outcome = ActionOutcome::Resolved { result };
                }
                Err(fault) => {
                    self.set_rounds_left(seat, &entry.ability, 0);
                    report.outcome = ActionOutcome::Fault { ability: entry.ability.clone(), reason: fault.to_string() };
                }
            }
            self.summary.upkeep.push(report);
            self.check_knockouts();
        }
    }

    /// Count every ongoing entry down; finished ones take their target-side statuses with them.
    fn expire_ongoing(&mut self) {
        for seat in 0..2 {
            let (holder, opponent) = pair_mut(self.fighters, seat);
            for entry in holder.ongoing.iter_mut() {
                entry.rounds_left = entry.rounds_left.saturating_sub(1);
            }
            let (done, live): (Vec<OngoingAbility>, Vec<OngoingAbility>) =
                std::mem::take(&mut holder.ongoing).into_iter().partition(|o| o.rounds_left == 0);
            holder.ongoing = live;

            for entry in done {
                let released = effects::strip(opponent, |e| e.source == entry.ability && e.as_status().is_some());
                self.summary.narrative.push(format!("[ONGOING][{}] {} ends", holder.name, entry.ability));
                self.summary.expired.push(EffectChange { combatant: holder.id.clone(), effect: entry.ability.clone() });
                for label in released {
                    self.summary.expired.push(EffectChange { combatant: opponent.id.clone(), effect: label });
                }
            }
        }
    }

    fn tick(&mut self, seat: usize) {
        let adapting = has_status(&self.fighters[seat], StatusKind::Adaptation);
        let cap = self.config.chakra_cap;
        let narrative = &mut self.summary.narrative;
        let report = tick_effects(&mut self.fighters[seat], self.dice, cap, |m| narrative.push(m));
        let id = self.fighters[seat].id.clone();
        for label in report.expired {
            self.summary.expired.push(EffectChange { combatant: id.clone(), effect: label });
        }
        if report.heal > 0 {
            let narrative = &mut self.summary.narrative;
            self.fighters[seat].heal(report.heal, |m| narrative.push(m));
        }
        let mut damage = report.damage;
        if adapting {
            for (status, dot) in &report.dots {
                damage -= dot - self.adapt(seat, 1 - seat, status, *dot);
            }
        }
        if damage > 0 {
            self.hurt(seat, damage, "effects");
        }
    }
}
