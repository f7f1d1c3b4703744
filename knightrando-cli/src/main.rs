use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use knightrando_core::{run, GenerationSettings, StartLocationType};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StartType {
    Fixed,
    Random,
    RandomExcludingKingsPass,
}

impl From<StartType> for StartLocationType {
    fn from(value: StartType) -> Self {
        match value {
            StartType::Fixed => StartLocationType::Fixed,
            StartType::Random => StartLocationType::Random,
            StartType::RandomExcludingKingsPass => StartLocationType::RandomExcludingKingsPass,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "knightrando", version, about = "Hollow Knight item randomiser")]
struct Args {
    /// World logic file (terms, items, locations, starts).
    #[arg(long)]
    world: PathBuf,

    /// Settings JSON. Flags below override values read from it.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, required_unless_present = "dump_settings")]
    output: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum)]
    start_location_type: Option<StartType>,

    #[arg(long)]
    start_location: Option<String>,

    #[arg(long, default_value_t = false)]
    randomize_notch_costs: bool,

    #[arg(long)]
    min_notch_cost: Option<i32>,

    #[arg(long)]
    max_notch_cost: Option<i32>,

    #[arg(long, default_value_t = false)]
    transition_shuffle: bool,

    #[arg(long, default_value_t = false)]
    cursed_notches: bool,

    #[arg(long, default_value_t = false)]
    cursed_masks: bool,

    /// Enables a logic flag term, e.g. SHADESKIPS. Repeatable.
    #[arg(long = "logic-flag", value_name = "TERM")]
    logic_flags: Vec<String>,

    /// Print the effective settings as JSON and exit.
    #[arg(long, default_value_t = false)]
    dump_settings: bool,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl Args {
    fn generation_settings(&self) -> knightrando_core::Result<GenerationSettings> {
        let mut settings = match &self.settings {
            Some(path) => GenerationSettings::from_path(path)?,
            None => GenerationSettings::default(),
        };

        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(kind) = self.start_location_type {
            settings.start_location.start_location_type = kind.into();
        }
        if let Some(start) = &self.start_location {
            settings.start_location.start_location = start.clone();
        }

        let misc = &mut settings.misc;
        misc.randomize_notch_costs |= self.randomize_notch_costs;
        if let Some(min) = self.min_notch_cost {
            misc.min_notch_cost = min;
        }
        if let Some(max) = self.max_notch_cost {
            misc.max_notch_cost = max;
        }
        misc.transition_shuffle |= self.transition_shuffle;

        settings.cursed.cursed_notches |= self.cursed_notches;
        settings.cursed.cursed_masks |= self.cursed_masks;
        settings.logic_flags.extend(self.logic_flags.iter().cloned());

        settings.clamp();
        Ok(settings)
    }
}

fn main() {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let settings = match args.generation_settings() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    if args.dump_settings {
        match serde_json::to_string_pretty(&settings) {
            Ok(json) => println!("{}", json),
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        }
        return;
    }

    let Some(output) = args.output.as_deref() else {
        eprintln!("Error: --output is required");
        std::process::exit(1);
    };

    info!(seed = settings.seed, world = %args.world.display(), "generating");
    match run(settings, &args.world, output) {
        Ok(record) => {
            println!("seed {} hash {}", record.ctx.settings.seed, record.hash);
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
