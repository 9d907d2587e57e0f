use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::combatant::Combatant;
use crate::formula::{Formula, Scope};
use crate::stats::{EffectiveStats, Stat, effective_stats};
use crate::Dice;

pub type StatDeltas = IndexMap<Stat, i64>;

/// Statuses that make their holder immune to new negative statuses.
const IMMUNITY_STATUSES: &[&str] = &[
    "perfect sage",
    "indra's arrow",
    "gold experience requiem",
    "flowing red scale",
    "absolute_immunity",
];

/// Adapts to repeated techniques and shuts out every other status while active.
pub const ADAPTATION: &str = "Wheel of Fate Adaptation";

/// Damage multiplier and reflected share for the 1st, 2nd, 3rd and later hits of one technique.
const ADAPTATION_STAGES: [(f64, f64); 4] = [(1.0, 0.0), (0.67, 0.0), (0.34, 0.25), (0.0, 0.5)];

const ZAP_STUN_CHANCE: f64 = 35.0;
const VULNERABILITY_NUM: i64 = 3;
const VULNERABILITY_DEN: i64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Effect {
    pub kind: EffectKind,
    /// Rounds remaining; the effect is removed when this reaches 0.
    pub duration: u32,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    Buff { stats: StatDeltas },
    Debuff { stats: StatDeltas },
    Status(Status),
    /// Added to the holder's chakra every round; negative values drain.
    ChakraDrain { amount: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Status {
    pub name: String,
    #[serde(default)]
    pub damage_per_turn: Option<Formula>,
    #[serde(default)]
    pub heal_per_turn: Option<Formula>,
    /// Per-round proc chance for kinds that have one (zap).
    #[serde(default)]
    pub chance: Option<f64>,
    #[serde(default = "yes")]
    pub can_attack: bool,
    /// Ability that resolves whenever the holder submits `Attack`.
    #[serde(default)]
    pub replace_with: Option<String>,
    #[serde(default)]
    pub reflect_percentage: Option<f64>,
    #[serde(default)]
    pub heal_amount: Option<i64>,
    #[serde(default)]
    pub heal_fraction: Option<f64>,
    #[serde(default)]
    pub once_per_battle: bool,
    #[serde(default)]
    pub grants_immunity: bool,
    /// Fraction of max health lost when the status runs out.
    #[serde(default)]
    pub health_loss_on_expire: Option<f64>,
    #[serde(default)]
    pub accuracy_modifier: i64,
    #[serde(default)]
    pub dodge: i64,
    /// Round a Raiders Tower debt was incurred.
    #[serde(default)]
    pub triggered_round: Option<u32>,
}

fn yes() -> bool {
    true
}

impl Status {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            damage_per_turn: None,
            heal_per_turn: None,
            chance: None,
            can_attack: true,
            replace_with: None,
            reflect_percentage: None,
            heal_amount: None,
            heal_fraction: None,
            once_per_battle: false,
            grants_immunity: false,
            health_loss_on_expire: None,
            accuracy_modifier: 0,
            dodge: 0,
            triggered_round: None,
        }
    }

    pub fn with_damage(mut self, formula: Formula) -> Self {
        self.damage_per_turn = Some(formula);
        self
    }

    pub fn with_heal(mut self, formula: Formula) -> Self {
        self.heal_per_turn = Some(formula);
        self
    }

    pub fn immobilizing(mut self) -> Self {
        self.can_attack = false;
        self
    }

    pub fn replacing_attack(mut self, ability: impl Into<String>) -> Self {
        self.replace_with = Some(ability.into());
        self
    }

    pub fn reflecting(mut self, pct: f64) -> Self {
        self.reflect_percentage = Some(pct);
        self
    }

    pub fn revive(heal_amount: Option<i64>, heal_fraction: Option<f64>, once_per_battle: bool) -> Self {
        let mut s = Status::named("revive");
        s.heal_amount = heal_amount;
        s.heal_fraction = heal_fraction;
        s.once_per_battle = once_per_battle;
        s
    }

    pub fn kind(&self) -> StatusKind {
        StatusKind::of(self)
    }
}

impl Effect {
    pub fn buff(stats: StatDeltas, duration: u32, source: impl Into<String>) -> Self {
        Self { kind: EffectKind::Buff { stats }, duration, source: source.into() }
    }

    pub fn debuff(stats: StatDeltas, duration: u32, source: impl Into<String>) -> Self {
        Self { kind: EffectKind::Debuff { stats }, duration, source: source.into() }
    }

    pub fn status(status: Status, duration: u32, source: impl Into<String>) -> Self {
        Self { kind: EffectKind::Status(status), duration, source: source.into() }
    }

    pub fn chakra_drain(amount: i64, duration: u32, source: impl Into<String>) -> Self {
        Self { kind: EffectKind::ChakraDrain { amount }, duration, source: source.into() }
    }

    pub fn as_status(&self) -> Option<&Status> {
        match &self.kind {
            EffectKind::Status(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_buff(&self) -> bool {
        matches!(self.kind, EffectKind::Buff { .. })
    }

    pub fn is_debuff(&self) -> bool {
        matches!(self.kind, EffectKind::Debuff { .. })
    }

    pub fn label(&self) -> String {
        match &self.kind {
            EffectKind::Buff { stats } => format!("buff({})", stat_names(stats)),
            EffectKind::Debuff { stats } => format!("debuff({})", stat_names(stats)),
            EffectKind::Status(s) => s.name.clone(),
            EffectKind::ChakraDrain { amount } => format!("chakra_drain({:+})", amount),
        }
    }
}

fn stat_names(stats: &StatDeltas) -> String {
    stats
        .keys()
        .map(|s| format!("{:?}", s).to_lowercase())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Behaviour class of a status, looked up by name and then by the fields it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Stun,
    Flinch,
    Stumble,
    Possessed,
    Drown,
    ShadowPossession,
    /// Any other status with `can_attack: false`.
    Restraint,
    Burn,
    Bleed,
    Poison,
    Curse,
    Zap,
    /// Any other status carrying `damage_per_turn`.
    Affliction,
    Frost,
    Mist,
    StatusVulnerability,
    Regeneration,
    Immunity,
    Reflect,
    Revive,
    Immortal,
    AttackOverride,
    RaidersTrap,
    RaidersDebt,
    Adaptation,
    Unknown,
}

/// Per-round yield of a status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tick {
    pub damage: i64,
    pub heal: i64,
    pub inflict: Option<Status>,
}

impl StatusKind {
    pub fn of(status: &Status) -> StatusKind {
        use StatusKind::*;
        let name = status.name.to_lowercase();
        let by_name = match name.as_str() {
            "stun" => Some(Stun),
            "flinch" => Some(Flinch),
            "stumble" => Some(Stumble),
            "possessed" | "possession" => Some(Possessed),
            "drown" => Some(Drown),
            "shadow_possession" | "shadow possession" => Some(ShadowPossession),
            "burn" => Some(Burn),
            "bleed" => Some(Bleed),
            "poison" => Some(Poison),
            "curse" => Some(Curse),
            "zap" => Some(Zap),
            "frost" => Some(Frost),
            "mist" => Some(Mist),
            "status_vulnerability" | "status vulnerability" => Some(StatusVulnerability),
            "regeneration" => Some(Regeneration),
            "revive" => Some(Revive),
            "reflect" | "punisher_shield_reflect" => Some(Reflect),
            "immortal" | "izanami" => Some(Immortal),
            "raiders_tower_trap" => Some(RaidersTrap),
            "raiders_tower_debt" => Some(RaidersDebt),
            "wheel of fate adaptation" => Some(Adaptation),
            n if IMMUNITY_STATUSES.contains(&n) => Some(Immunity),
            _ => None,
        };
        if let Some(kind) = by_name {
            return kind;
        }
        if status.grants_immunity {
            Immunity
        } else if status.reflect_percentage.is_some() {
            Reflect
        } else if status.replace_with.is_some() {
            AttackOverride
        } else if !status.can_attack {
            Restraint
        } else if status.damage_per_turn.is_some() {
            Affliction
        } else if status.heal_per_turn.is_some() {
            Regeneration
        } else {
            Unknown
        }
    }

    /// Blocked by immunity and stripped by cleanse.
    pub fn is_negative(self) -> bool {
        use StatusKind::*;
        matches!(
            self,
            Stun | Flinch
                | Stumble
                | Possessed
                | Drown
                | ShadowPossession
                | Restraint
                | Burn
                | Bleed
                | Poison
                | Curse
                | Zap
                | Affliction
                | Frost
                | StatusVulnerability
                | RaidersTrap
                | RaidersDebt
        )
    }

    pub fn disables_action(self, status: &Status) -> bool {
        use StatusKind::*;
        matches!(self, Stun | Flinch | Stumble | Possessed | Drown | ShadowPossession | Restraint)
            || (self != Unknown && !status.can_attack)
    }

    fn default_dot(self) -> Option<f64> {
        use StatusKind::*;
        match self {
            Bleed => Some(0.03),
            Poison => Some(0.02),
            Burn => Some(0.025),
            Drown => Some(0.04),
            Curse => Some(0.035),
            Zap => Some(0.08),
            _ => None,
        }
    }

    pub fn on_apply(self, holder: &mut Combatant, _status: &Status) {
        if self == StatusKind::Immortal {
            holder.flags.izanami_immortal = true;
        }
    }

    /// Damage/heal the status yields this round, evaluated against the holder.
    pub fn on_tick(self, status: &Status, holder: &EffectiveStats, vulnerable: bool, dice: &mut Dice) -> Tick {
        use StatusKind::*;
        let mut tick = Tick::default();
        if self == Unknown {
            return tick;
        }
        let scope = Scope::holder(holder);
        let dot = match (&status.damage_per_turn, self.default_dot()) {
            (Some(formula), _) => Some(formula.eval_floor(&scope)),
            (None, Some(frac)) => Some((holder.health.max(0) as f64 * frac).floor() as i64),
            (None, None) => None,
        };
        if let Some(mut dmg) = dot {
            if vulnerable {
                dmg = dmg.saturating_mul(VULNERABILITY_NUM) / VULNERABILITY_DEN;
            }
            tick.damage = dmg.max(0);
        }
        if let Some(formula) = &status.heal_per_turn {
            tick.heal = formula.eval_floor(&scope).max(0);
        }
        if self == Zap && dice.chance(status.chance.unwrap_or(ZAP_STUN_CHANCE)) {
            tick.inflict = Some(Status::named("stun"));
        }
        tick
    }

    /// Returns health lost on expiry.
    pub fn on_expire(self, holder: &mut Combatant, status: &Status) -> i64 {
        if self == StatusKind::Immortal {
            holder.flags.izanami_immortal = false;
        }
        match status.health_loss_on_expire {
            Some(frac) => (effective_stats(holder).max_health as f64 * frac).floor() as i64,
            None => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Application {
    Applied,
    Refreshed,
    Stacked,
    Blocked { by: String },
}

impl Application {
    pub fn landed(&self) -> bool {
        !matches!(self, Application::Blocked { .. })
    }
}

/// Name of the first active immunity status on `holder`.
pub fn immunity_of(holder: &Combatant) -> Option<&str> {
    holder
        .effects
        .iter()
        .filter_map(Effect::as_status)
        .find(|s| s.kind() == StatusKind::Immunity)
        .map(|s| s.name.as_str())
}

/// Attach a status, honouring immunity and stacking rules.
pub fn apply_status(
    holder: &mut Combatant,
    status: Status,
    duration: u32,
    source: &str,
    can_stack: bool,
    mut log: impl FnMut(String),
) -> Application {
    let kind = status.kind();
    if kind != StatusKind::Adaptation && has_status(holder, StatusKind::Adaptation) {
        log(format!("[COND][{}] has adapted; {} does not take hold", holder.name, status.name));
        return Application::Blocked { by: ADAPTATION.to_string() };
    }
    if kind.is_negative() {
        let blocker = immunity_of(holder).map(str::to_string).or_else(|| {
            holder
                .immunities
                .iter()
                .find(|i| i.eq_ignore_ascii_case(&status.name))
                .cloned()
        });
        if let Some(by) = blocker {
            log(format!("[COND][{}] is immune to {} ({})", holder.name, status.name, by));
            return Application::Blocked { by };
        }
    }

    let duration = duration.max(1);
    let existing = holder
        .effects
        .iter()
        .position(|e| e.as_status().is_some_and(|s| s.name == status.name));

    let outcome = match existing {
        Some(idx) if !can_stack => {
            holder.effects[idx] = Effect::status(status.clone(), duration, source);
            log(format!("[COND][{}] {} refreshed ({} rounds)", holder.name, status.name, duration));
            Application::Refreshed
        }
        Some(_) => {
            holder.effects.push(Effect::status(status.clone(), duration, source));
            log(format!("[COND][{}] gains another {}", holder.name, status.name));
            Application::Stacked
        }
        None => {
            holder.effects.push(Effect::status(status.clone(), duration, source));
            log(format!("[COND][{}] gains {} ({} rounds)", holder.name, status.name, duration));
            Application::Applied
        }
    };
    kind.on_apply(holder, &status);
    outcome
}

/// Push a buff/debuff, replacing one of the same kind from the same source.
pub fn add_stat_effect(holder: &mut Combatant, effect: Effect) {
    let same = holder.effects.iter().position(|e| {
        e.source == effect.source
            && ((e.is_buff() && effect.is_buff()) || (e.is_debuff() && effect.is_debuff()))
    });
    match same {
        Some(idx) => holder.effects[idx] = effect,
        None => holder.effects.push(effect),
    }
}

/// First status that stops the holder from acting.
pub fn disabling_status(holder: &Combatant) -> Option<&Status> {
    holder
        .effects
        .iter()
        .filter_map(Effect::as_status)
        .find(|s| s.kind().disables_action(s))
}

pub fn attack_override(holder: &Combatant) -> Option<&str> {
    holder
        .effects
        .iter()
        .filter_map(Effect::as_status)
        .find_map(|s| s.replace_with.as_deref())
}

/// Strongest active reflect fraction, if any.
pub fn reflect_of(holder: &Combatant) -> Option<f64> {
    holder
        .effects
        .iter()
        .filter_map(Effect::as_status)
        .filter(|s| s.kind() == StatusKind::Reflect)
        .map(|s| s.reflect_percentage.unwrap_or(1.0))
        .reduce(f64::max)
}

pub fn has_status(holder: &Combatant, kind: StatusKind) -> bool {
    holder.effects.iter().filter_map(Effect::as_status).any(|s| s.kind() == kind)
}

pub fn find_status<'a>(holder: &'a Combatant, name: &str) -> Option<&'a Status> {
    holder
        .effects
        .iter()
        .filter_map(Effect::as_status)
        .find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Remove every effect matching `pred`, returning their labels.
pub fn strip(holder: &mut Combatant, mut pred: impl FnMut(&Effect) -> bool) -> Vec<String> {
    let mut removed = Vec::new();
    let mut kept = Vec::with_capacity(holder.effects.len());
    for effect in holder.effects.drain(..) {
        if pred(&effect) {
            removed.push(effect);
        } else {
            kept.push(effect);
        }
    }
    holder.effects = kept;
    let mut labels = Vec::with_capacity(removed.len());
    for effect in removed {
        if let EffectKind::Status(s) = &effect.kind {
            if s.kind() == StatusKind::Immortal {
                holder.flags.izanami_immortal = false;
            }
        }
        labels.push(effect.label());
    }
    labels
}

/// Strip negative statuses and debuffs.
pub fn cleanse(holder: &mut Combatant, mut log: impl FnMut(String)) -> Vec<String> {
    let removed = strip(holder, |e| {
        e.is_debuff() || e.as_status().is_some_and(|s| s.kind().is_negative())
    });
    if !removed.is_empty() {
        log(format!("[COND][{}] cleansed: {}", holder.name, removed.join(", ")));
    }
    removed
}

pub fn remove_buffs(holder: &mut Combatant) -> Vec<String> {
    strip(holder, Effect::is_buff)
}

/// Strip statuses whose name mentions immortality or invincibility and clear the matching flags.
pub fn strip_immortality(holder: &mut Combatant) -> Vec<String> {
    holder.flags.izanami_immortal = false;
    holder.flags.permanent_immortal = false;
    strip(holder, |e| {
        e.as_status().is_some_and(|s| {
            let n = s.name.to_lowercase();
            s.kind() == StatusKind::Immortal || n.contains("immortal") || n.contains("invincible")
        })
    })
}

/// Intercept a lethal health drop with an unconsumed revive.
pub fn try_revive(holder: &mut Combatant, mut log: impl FnMut(String)) -> bool {
    if holder.current_health > 0 {
        return false;
    }
    let already = holder.flags.has_revived_this_battle;
    let found = holder.effects.iter().position(|e| {
        e.duration > 0
            && e.as_status().is_some_and(|s| s.kind() == StatusKind::Revive && !(s.once_per_battle && already))
    });
    let Some(idx) = found else {
        return false;
    };
    let Some(status) = holder.effects[idx].as_status().cloned() else {
        return false;
    };

    let max = effective_stats(holder).max_health;
    let mut restored = match (status.heal_amount, status.heal_fraction) {
        (Some(amount), _) => amount,
        (None, Some(frac)) => (max as f64 * frac).floor() as i64,
        (None, None) => 0,
    };
    if restored <= 0 {
        restored = max / 4;
    }
    let before = holder.current_health;
    holder.current_health = restored.min(max);

    if status.once_per_battle {
        holder.effects.remove(idx);
        holder.flags.has_revived_this_battle = true;
    }
    log(format!(
        "[REVIVE][{}] {} → {}{}",
        holder.name,
        before,
        holder.current_health,
        if status.once_per_battle { " (consumed)" } else { "" }
    ));
    true
}

/// How much of one hit an adapted holder takes and how much it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adapted {
    pub taken: i64,
    pub reflected: i64,
    /// Hits from this technique so far, this one included.
    pub hits: u32,
}

/// Count a hit from `technique` against the holder's adaptation. The caller checks that
/// [`StatusKind::Adaptation`] is active.
pub fn adapt_hit(holder: &mut Combatant, technique: &str, amount: i64) -> Adapted {
    let hits = holder.adapted.entry(technique.to_string()).or_insert(0);
    let stage = (*hits as usize).min(ADAPTATION_STAGES.len() - 1);
    let (multiplier, share) = ADAPTATION_STAGES[stage];
    *hits = hits.saturating_add(1);
    Adapted {
        taken: (amount as f64 * multiplier).floor() as i64,
        reflected: (amount as f64 * share).floor() as i64,
        hits: *hits,
    }
}

/// Totals from one end-of-round pass over a combatant's effects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub damage: i64,
    pub heal: i64,
    pub chakra: i64,
    /// Damage-over-time per status name, already included in `damage`.
    pub dots: Vec<(String, i64)>,
    pub expired: Vec<String>,
}

/// Tick every effect once, decrement durations and expire the finished ones.
///
/// Chakra changes are applied here; damage and healing are returned for the caller to commit.
pub fn tick_effects(
    holder: &mut Combatant,
    dice: &mut Dice,
    chakra_cap: i64,
    mut log: impl FnMut(String),
) -> TickReport {
    let mut report = TickReport::default();
    let stats = effective_stats(holder);
    let vulnerable = has_status(holder, StatusKind::StatusVulnerability);
    let mut inflicted = Vec::new();

    for effect in &holder.effects {
        match &effect.kind {
            EffectKind::Status(status) => {
                let tick = status.kind().on_tick(status, &stats, vulnerable, dice);
                if tick.damage > 0 {
                    log(format!("[DOT][{}] {} deals {}", holder.name, status.name, tick.damage));
                    report.dots.push((status.name.clone(), tick.damage));
                }
                if tick.heal > 0 {
                    log(format!("[HOT][{}] {} heals {}", holder.name, status.name, tick.heal));
                }
                report.damage = report.damage.saturating_add(tick.damage);
                report.heal = report.heal.saturating_add(tick.heal);
                if let Some(extra) = tick.inflict {
                    inflicted.push((extra, effect.source.clone()));
                }
            }
            EffectKind::ChakraDrain { amount } => {
                report.chakra = report.chakra.saturating_add(*amount);
            }
            EffectKind::Buff { .. } | EffectKind::Debuff { .. } => {}
        }
    }

    if report.chakra != 0 {
        let before = holder.chakra;
        holder.chakra = (holder.chakra + report.chakra).clamp(0, chakra_cap);
        log(format!("[CHAKRA][{}] {} → {}", holder.name, before, holder.chakra));
    }

    for effect in holder.effects.iter_mut() {
        effect.duration = effect.duration.saturating_sub(1);
    }
    let mut to_remove = vec![];
    for (idx, e) in holder.effects.iter().enumerate() {
        if e.duration == 0 {
            to_remove.push(idx);
        }
    }
    for idx in to_remove.into_iter().rev() {
        let removed = holder.effects.remove(idx);
        if let EffectKind::Status(status) = &removed.kind {
            let loss = status.kind().on_expire(holder, status);
            report.damage = report.damage.saturating_add(loss);
            if loss > 0 {
                log(format!("[COND][{}] {} fades, costing {} HP", holder.name, status.name, loss));
            }
        }
        log(format!("[COND][{}] {} ends", holder.name, removed.label()));
        report.expired.push(removed.label());
    }

    for (status, source) in inflicted {
        let name = holder.name.clone();
        apply_status(holder, status, 1, &source, false, |m| log(m));
        tracing::debug!(combatant = %name, "zap stun proc");
    }

    report
}
