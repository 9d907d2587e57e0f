use clap::{Parser, Subcommand, ValueEnum};
use jutsu_engine::api::{builtin_fighter_ids, init_logging, load_catalog, load_profile, run_match};
use jutsu_engine::config::load_config;
use jutsu_engine::{BattleConfig, Combatant, Dice, Rulebook, TurnOrder};
use std::{path::PathBuf, sync::Arc};

#[derive(Copy, Clone, ValueEnum)]
enum Order {
    PowerThenSeat,
    Seat,
    Submission,
}

#[derive(Subcommand)]
enum Cmd {
    /// Roll percent dice
    Roll {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Number of rolls
        #[arg(long, default_value_t = 5)]
        rolls: u32,
    },
    /// Let two computer fighters battle it out
    Fight {
        /// Built-in fighter id or profile JSON path
        first: String,
        /// Built-in fighter id or profile JSON path
        second: String,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Battle config (JSON or YAML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Ability catalog JSON replacing the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Turn order within a round
        #[arg(long, value_enum)]
        order: Option<Order>,
        /// Print the result as JSON instead of the log
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the abilities in the catalog
    Catalog {
        /// Ability catalog JSON replacing the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// List the built-in fighters
    Fighters,
    /// Print a fighter profile as JSON
    Inspect {
        /// Built-in fighter id or profile JSON path
        fighter: String,
    },
}

#[derive(Parser)]
#[command(name = "jutsu-cli")]
#[command(about = "Jutsu battle engine harness")]
struct Cli {
    /// Debug logging on stderr
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

fn to_turn_order(o: Order) -> TurnOrder {
    match o {
        Order::PowerThenSeat => TurnOrder::PowerThenSeat,
        Order::Seat => TurnOrder::Seat,
        Order::Submission => TurnOrder::Submission,
    }
}

fn rulebook(path: Option<&PathBuf>) -> anyhow::Result<Arc<Rulebook>> {
    match path {
        Some(p) => Ok(Arc::new(load_catalog(p)?)),
        None => Ok(Rulebook::builtin()?),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Cmd::Roll { seed, rolls } => {
            let mut dice = Dice::from_seed(seed);
            for _ in 0..rolls {
                println!("{}", dice.percent());
            }
        }
        Cmd::Fight {
            first,
            second,
            seed,
            config,
            catalog,
            order,
            json,
        } => {
            let mut battle = match &config {
                Some(p) => load_config(p)?,
                None => BattleConfig::default(),
            }
            .with_seed(seed);
            if let Some(o) = order {
                battle.turn_order = to_turn_order(o);
            }
            let a = Combatant::from_profile(&load_profile(&first)?);
            let mut b = Combatant::from_profile(&load_profile(&second)?);
            if a.id == b.id {
                b.id = format!("{}-2", b.id);
            }
            let res = run_match(a, b, rulebook(catalog.as_ref())?, battle)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&res)?);
            } else {
                for line in &res.log {
                    println!("{}", line);
                }
            }
        }
        Cmd::Catalog { catalog } => {
            let book = rulebook(catalog.as_ref())?;
            for ability in book.catalog.abilities() {
                let kind = if ability.routine().is_some() { "scripted" } else { "declarative" };
                println!(
                    "{:<36} cost={:<4} {:?} {}{}",
                    ability.name,
                    ability.chakra_cost,
                    ability.cost_type,
                    kind,
                    if ability.ongoing { " ongoing" } else { "" }
                );
            }
            for combo in book.catalog.combos() {
                println!("combo {:<30} requires {}", combo.name, combo.requires.join(" + "));
            }
        }
        Cmd::Fighters => {
            for id in builtin_fighter_ids() {
                let p = load_profile(id)?;
                println!("{:<10} {} (HP {}, power {})", id, p.name, p.health, p.power);
            }
        }
        Cmd::Inspect { fighter } => {
            let profile = load_profile(&fighter)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }
    Ok(())
}
