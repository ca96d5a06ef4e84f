//! Writes train/val/test splits of random 2D matching instances.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use mwm2d::{create_dataset, memory, GeneratorConfig, Only};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnlyArg {
    Train,
    Val,
    Test,
    All,
    None,
}

impl From<OnlyArg> for Only {
    fn from(only: OnlyArg) -> Self {
        match only {
            OnlyArg::Train => Only::Train,
            OnlyArg::Val => Only::Val,
            OnlyArg::Test => Only::Test,
            OnlyArg::All => Only::All,
            OnlyArg::None => Only::None,
        }
    }
}

/// `true` and `1` enable a flag; anything else disables it.
fn str2bool(v: &str) -> Result<bool, String> {
    Ok(matches!(v.to_lowercase().as_str(), "true" | "1"))
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value_t = 0)]
    train_size: usize,
    #[arg(long, default_value_t = 0)]
    val_size: usize,
    #[arg(long, default_value_t = 0)]
    test_size: usize,
    #[arg(long)]
    data_dir: PathBuf,
    /// Points per side of every instance.
    #[arg(short = 'n', long)]
    n: usize,
    #[arg(long)]
    seed: Option<u64>,
    /// Label the training split too.
    #[arg(
        long,
        default_value = "false",
        action = clap::ArgAction::Set,
        value_parser = str2bool
    )]
    supervised: bool,
    #[arg(long, value_enum, default_value_t = OnlyArg::All)]
    only: OnlyArg,
}

impl From<Args> for GeneratorConfig {
    fn from(args: Args) -> Self {
        Self {
            train_size: args.train_size,
            val_size: args.val_size,
            test_size: args.test_size,
            data_dir: args.data_dir,
            n: args.n,
            seed: args.seed,
            supervised: args.supervised,
            only: args.only.into(),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = GeneratorConfig::from(Args::parse());
    let mut rng = config.rng();
    match create_dataset(&config, &mut rng) {
        Ok(dirs) => {
            log::info!("{:<32}{}", "train", dirs.train.display());
            log::info!("{:<32}{}", "val", dirs.val.display());
            log::info!("{:<32}{}", "test", dirs.test.display());
            log::info!("{:<32}{:.1} MB", "resident memory", memory::memory_usage());
        }
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
