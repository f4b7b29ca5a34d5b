use cgra_common::db::core::RoutingDB;
use cgra_common::db::parser;
use cgra_common::util::config::Config;
use cgra_common::util::{check, generator, logger, visualization};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Route,
    /// Verifies a previously exported route file against the design.
    Check {
        #[arg(long, value_name = "FILE")]
        routes: Option<String>,
    },
    Generate {
        #[arg(long, default_value_t = 8)]
        width: u32,
        #[arg(long, default_value_t = 8)]
        height: u32,
        #[arg(long, default_value_t = 4)]
        tracks: u32,
        #[arg(long, default_value_t = 20)]
        nets: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value = "inputs")]
        output: String,
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

    let command = args.command.unwrap_or(Commands::Route);

    match command {
        Commands::Generate {
            width,
            height,
            tracks,
            nets,
            seed,
            output,
        } => {
            std::fs::create_dir_all(&output)?;
            generator::generate_random_design(&output, width, height, tracks, nets, seed)?;
            log::info!("Generated benchmark in {}", output);
        }
        Commands::Check { routes } => {
            validate_input_paths(&config)?;
            let routes = routes.unwrap_or_else(|| config.input.output_route.clone());
            if let Err(e) = run_check(&config, &routes) {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Route => {
            validate_input_paths(&config)?;
            prepare_output_dir(&config.input.output_route)?;

            if let Err(e) = run_routing(&config) {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn validate_input_paths(config: &Config) -> anyhow::Result<()> {
    for (what, path) in [
        ("routing graph", &config.input.graph_file),
        ("placement", &config.input.placement_file),
        ("netlist", &config.input.netlist_file),
    ] {
        if !Path::new(path).exists() {
            return Err(anyhow::anyhow!("Input {} file missing: {}", what, path));
        }
    }
    Ok(())
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent() {
        if !parent.exists() && !parent.as_os_str().is_empty() {
            log::info!("Creating output directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn load_design(config: &Config) -> anyhow::Result<RoutingDB> {
    let graph = parser::graph::parse(&config.input.graph_file)?;
    let mut db = RoutingDB::new(graph);

    for (block, x, y) in parser::placement::parse(&config.input.placement_file)? {
        db.bind_block(x, y, &block)?;
    }
    log::info!("Placed {} blocks", db.placement.len());

    let mut skipped = 0;
    for desc in parser::netlist::parse(&config.input.netlist_file)? {
        // Nets of other widths run on a separate interconnect.
        if desc.width != config.input.route_width {
            skipped += 1;
            continue;
        }
        db.register_net(&desc)?;
    }
    log::info!(
        "Registered {} nets ({} skipped for width)",
        db.num_nets(),
        skipped
    );
    Ok(db)
}

fn run_routing(config: &Config) -> anyhow::Result<()> {
    let mut db = load_design(config)?;

    log::info!("Starting Routing...");
    let result = cgra_router::route(&mut db, &config.routing);

    if let Some(heatmap) = &config.input.heatmap {
        log::info!("Generating congestion map...");
        visualization::draw_congestion(&db, heatmap, 1000, 1000);
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if e.is_retryable() {
                log::warn!("Consider a larger routing.max_iterations or a bigger device.");
            }
            return Err(anyhow::anyhow!(e));
        }
    };
    log::info!(
        "Routed {} nets in {} iterations: {} nodes used, critical delay {:.2}",
        db.num_nets(),
        report.iterations,
        report.wirelength,
        report.critical_delay
    );

    check::run(&db).map_err(|e| anyhow::anyhow!("Verification Failed: {}", e))?;

    log::info!("Writing routing result to {}", config.input.output_route);
    parser::routes::write(&db, &config.input.output_route)?;

    Ok(())
}

fn run_check(config: &Config, routes: &str) -> anyhow::Result<()> {
    let mut db = load_design(config)?;
    let records = parser::routes::parse(routes)?;
    let loaded = parser::routes::apply(&mut db, &records)?;
    log::info!("Loaded {} sink routes from {}", loaded, routes);

    check::run(&db).map_err(|e| anyhow::anyhow!("Verification Failed: {}", e))
}
