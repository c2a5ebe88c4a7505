use clap::{Parser, Subcommand};
use pd_common::util::config::Config;
use pd_common::util::profiler::ScopedTimer;
use pd_common::util::visualization::{self, PlacedRect};
use pd_common::util::logger;
use pd_floorplan::{simulate_annealing, AnnealingParams, SlicingTree};
use pd_partition::FmPartitioner;
use pd_pathfinder::find_path;
use pd_router::Router;
use std::path::{Path, PathBuf};

mod output;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Two-way min-cut partitioning of a cell netlist
    Partition { input: PathBuf, output: PathBuf },
    /// Slicing floorplan by simulated annealing
    Floorplan {
        input: PathBuf,
        output: PathBuf,
        /// Outputs only the area
        #[arg(short, long)]
        area_only: bool,
    },
    /// Left-edge channel routing against rectilinear boundaries
    Route { input: PathBuf, output: PathBuf },
    /// Transistor pairing and Euler-path ordering
    Euler { input: PathBuf, output: PathBuf },
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
        Commands::Partition { input, output } => run_partition(&input, &output, &config),
        Commands::Floorplan {
            input,
            output,
            area_only,
        } => run_floorplan(&input, &output, area_only, &config),
        Commands::Route { input, output } => run_route(&input, &output),
        Commands::Euler { input, output } => run_euler(&input, &output, &config),
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read input file {:?}: {}", path, e))
}

fn run_partition(input: &Path, output: &Path, config: &Config) -> anyhow::Result<()> {
    let text = read_input(input)?;
    let (balance_factor, netlist) = pd_partition::parse(&text)?;
    log::info!(
        "Partitioning {} cells over {} nets, balance factor {}",
        netlist.num_cells(),
        netlist.num_nets(),
        balance_factor
    );

    let mut fm = FmPartitioner::new(balance_factor, netlist, config.partition.seed);
    {
        let _timer = ScopedTimer::new("partitioning");
        fm.partition();
    }
    log::info!("Final cut size: {}", fm.cut_size());

    std::fs::write(output, output::format_partition(&fm))?;
    Ok(())
}

fn run_floorplan(input: &Path, output: &Path, area_only: bool, config: &Config) -> anyhow::Result<()> {
    let text = read_input(input)?;
    let instance = pd_floorplan::parse(&text)?;
    log::info!(
        "Floorplanning {} blocks, aspect ratio in ({}, {})",
        instance.blocks.len(),
        instance.aspect_ratio.lower,
        instance.aspect_ratio.upper
    );

    let params = AnnealingParams {
        cooling_factor: config.floorplan.cooling_factor,
        initial_temp_per_block: config.floorplan.initial_temp_per_block,
        freezing_temp: config.floorplan.freezing_temp,
        reject_threshold: config.floorplan.reject_threshold,
        moves_per_block: config.floorplan.moves_per_block,
    };
    let mut tree = SlicingTree::new(instance.blocks.clone(), config.floorplan.seed)?;
    let placement = {
        let _timer = ScopedTimer::new("annealing");
        simulate_annealing(
            &mut tree,
            &instance.aspect_ratio,
            &params,
            // Keep the acceptance draws off the move-selection stream.
            config.floorplan.seed.map(|s| s.wrapping_add(1)),
        )
    };
    log::info!(
        "Best area {} ({} x {})",
        placement.area,
        placement.width,
        placement.height
    );

    if let Some(png) = &config.floorplan.render_png {
        let rects: Vec<PlacedRect> = instance
            .blocks
            .iter()
            .zip(&placement.coords)
            .map(|(block, point)| PlacedRect {
                x: point.x,
                y: point.y,
                width: block.width,
                height: block.height,
            })
            .collect();
        log::info!("Rendering floorplan to {}", png);
        visualization::draw_floorplan(&rects, png, 1000, 1000);
    }

    let report = if area_only {
        format!("{}\n", placement.area)
    } else {
        output::format_floorplan(&instance.blocks, &placement)
    };
    std::fs::write(output, report)?;
    Ok(())
}

fn run_route(input: &Path, output: &Path) -> anyhow::Result<()> {
    let text = read_input(input)?;
    let instance = pd_router::parse(&text)?;
    log::info!(
        "Routing {} nets over {} columns",
        instance.num_nets(),
        instance.num_columns()
    );

    let mut router = Router::new(instance)?;
    let result = {
        let _timer = ScopedTimer::new("routing");
        router.route()?
    };
    log::info!("Channel density: {}", result.channel_density());

    std::fs::write(output, output::format_routing(&result))?;
    Ok(())
}

fn run_euler(input: &Path, output: &Path, config: &Config) -> anyhow::Result<()> {
    let text = read_input(input)?;
    let circuit = pd_pathfinder::parse(&text)?;
    log::info!(
        "Ordering {} transistors over {} nets",
        circuit.mos.len(),
        circuit.nets.len()
    );

    let outcome = {
        let _timer = ScopedTimer::new("path search");
        find_path(circuit, config.pathfinder.seed)?
    };
    log::info!("HPWL: {}", outcome.hpwl);

    std::fs::write(output, output::format_path(&outcome))?;
    Ok(())
}
