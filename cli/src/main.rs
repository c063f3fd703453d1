use clap::{Parser, Subcommand, ValueEnum};
use gr_common::util::config::Config;
use gr_common::util::{generator, logger, visualization};
use gr_router::{GlobalRouter, Mode, check};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum CliMode {
    #[default]
    Balanced,
    Congestion,
    Wirelength,
}

impl From<CliMode> for Mode {
    fn from(m: CliMode) -> Self {
        match m {
            CliMode::Balanced => Mode::Balanced,
            CliMode::Congestion => Mode::Congestion,
            CliMode::Wirelength => Mode::Wirelength,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Route an ISPD 2008 benchmark and report overflow / wirelength.
    Route {
        /// Benchmark file; falls back to the config's input section.
        input: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "balanced")]
        mode: CliMode,

        /// Write a congestion heat map here after routing.
        #[arg(long, value_name = "PNG")]
        map: Option<PathBuf>,

        /// Write a per-net route map here after routing.
        #[arg(long, value_name = "PNG")]
        net_map: Option<PathBuf>,

        /// Disable the history-driven window search phase.
        #[arg(long)]
        no_hum: bool,

        /// Override the tie-break RNG seed from the config.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Generate a random benchmark for smoke testing.
    Generate {
        #[arg(long, default_value = "inputs/random.gr")]
        output: String,
        #[arg(long, default_value_t = 32)]
        width: i32,
        #[arg(long, default_value_t = 32)]
        height: i32,
        #[arg(long, default_value_t = 200)]
        nets: usize,
        #[arg(long, default_value_t = 3)]
        pins: usize,
        #[arg(long, default_value_t = 20)]
        capacity: i32,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    match args.command {
        Commands::Generate {
            output,
            width,
            height,
            nets,
            pins,
            capacity,
        } => {
            prepare_output_dir(&output)?;
            generator::generate_random_gr(&output, width, height, nets, pins, capacity)?;
        }
        Commands::Route {
            input,
            mode,
            map,
            net_map,
            no_hum,
            seed,
        } => {
            let input = input.unwrap_or_else(|| PathBuf::from(&config.input.gr_file));
            if !input.exists() {
                return Err(anyhow::anyhow!("Input benchmark missing: {:?}", input));
            }

            let mut routing_cfg = config.routing.clone();
            if let Some(seed) = seed {
                routing_cfg.seed = seed;
            }

            let mut router = GlobalRouter::new(routing_cfg);
            router.set_mode(mode.into());
            router.enable_hum(!no_hum);

            log::info!("Parsing benchmark: {:?}", input);
            router.load(&input)?;

            log::info!("Starting routing...");
            let outcome = router.route()?;
            let m = router.get_performance_metrics();
            log::info!(
                "Routing finished ({:?}): overflow {} (max {}), wirelength {}, {:.2}s",
                outcome,
                m.total_overflow,
                m.max_overflow,
                m.wirelength_2d,
                m.runtime_sec
            );

            let engine = router
                .engine()
                .expect("routing just completed, engine must exist");
            check::run(engine).map_err(|e| anyhow::anyhow!("Verification failed: {}", e))?;

            if let Some(map) = map {
                let map = map.to_string_lossy().into_owned();
                prepare_output_dir(&map)?;
                let (w, h) = router.grid_size().unwrap();
                let (vert, hori) = engine.utilization();
                log::info!("Writing congestion map to {}", map);
                visualization::draw_congestion_map(&map, w, h, &vert, &hori);
            }

            if let Some(net_map) = net_map {
                let net_map = net_map.to_string_lossy().into_owned();
                prepare_output_dir(&net_map)?;
                let (w, h) = router.grid_size().unwrap();
                let merged: Vec<Vec<_>> = router
                    .nets()
                    .iter()
                    .map(|n| {
                        n.two_pins
                            .iter()
                            .flat_map(|tp| tp.path.iter().copied())
                            .collect()
                    })
                    .collect();
                let paths: Vec<&[_]> = merged.iter().map(|v| v.as_slice()).collect();
                log::info!("Writing net map to {}", net_map);
                visualization::draw_net_map(&net_map, w, h, &paths);
            }
        }
    }

    Ok(())
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent() {
        if !parent.exists() {
            log::info!("Creating output directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
