use clap::Parser;
use encoding_rs::Encoding;
use jutsu_engine::api::{init_logging, load_catalog, load_profile, run_many};
use jutsu_engine::{BattleConfig, Profile, Rulebook};
use std::{fs, path::Path, path::PathBuf, sync::Arc};

#[derive(Parser)]
#[command(name = "simulate-vs")]
#[command(about = "Monte Carlo sim: many computer battles between two fighters")]
struct Args {
    /// First fighter: built-in id or profile JSON path
    #[arg(long)]
    first: String,

    /// Second fighter: built-in id or profile JSON path
    #[arg(long)]
    second: String,

    /// Number of trials
    #[arg(long, default_value_t = 200)]
    trials: u32,

    /// Round limit per trial (a draw once reached)
    #[arg(long, default_value_t = 50)]
    max_rounds: u32,

    /// Chakra regained by each fighter at the end of a round
    #[arg(long, default_value_t = 2)]
    chakra_regen: i64,

    /// Optional ability catalog JSON (falls back to the built-in one)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// RNG base seed (trial i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,
}

fn read_text_auto(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

// Profiles saved by editors on Windows often carry a BOM, so files go through the sniffing reader.
fn read_profile_auto(id_or_path: &str) -> anyhow::Result<Profile> {
    let path = Path::new(id_or_path);
    if path.is_file() {
        let text = read_text_auto(path)?;
        Ok(serde_json::from_str(&text)?)
    } else {
        load_profile(id_or_path)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(false);

    let first = read_profile_auto(&args.first)?;
    let second = read_profile_auto(&args.second)?;
    let rulebook: Arc<Rulebook> = match &args.catalog {
        Some(p) => Arc::new(load_catalog(p)?),
        None => Rulebook::builtin()?,
    };

    let config = BattleConfig {
        max_rounds: args.max_rounds,
        chakra_regen: args.chakra_regen,
        seed: args.seed,
        ..BattleConfig::default()
    };
    let stats = run_many(&first, &second, rulebook, config, args.trials)?;
    let trials_f = f64::from(args.trials.max(1));

    println!("simulate-vs results");
    println!("-------------------");
    println!("trials:             {}", args.trials);
    println!("first:              {} (HP {})", first.name, first.health);
    println!("second:             {} (HP {})", second.name, second.health);
    println!();
    println!("first win rate:     {:.1}%", f64::from(stats.first_wins) / trials_f * 100.0);
    println!("second win rate:    {:.1}%", f64::from(stats.second_wins) / trials_f * 100.0);
    println!("draw rate:          {:.1}%", f64::from(stats.draws) / trials_f * 100.0);
    println!("absolute endings:   {}", stats.absolute_endings);
    println!("avg hp left (wins): {:.1}", stats.avg_first_hp_left);
    println!("avg rounds:         {:.2}", stats.avg_rounds);
    println!("median rounds:      {}", stats.median_rounds);

    Ok(())
}
