mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use dwell_core::{
    CounterpartResolver, DwellTimePreset, EngineConfig, EntityRegistry, ExclusivityPolicy,
    Fixation, GazeDwellEngine, GazeFrame, OcclusionEstimator, SyntheticGaze,
};
use dwell_scene::Scene;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::report::Printer;

#[derive(Parser)]
#[command(name = "dwell", about = "Gaze dwell detection and landmark feedback tools")]
struct Cli {
    /// Engine config file (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded gaze trace against a scene
    Replay {
        /// Scene file (TOML)
        #[arg(long)]
        scene: PathBuf,

        /// Gaze trace (JSON array of {origin, gaze, head})
        #[arg(long)]
        trace: PathBuf,

        /// Tick duration in seconds; defaults to one sample period
        #[arg(long)]
        dt: Option<f64>,

        /// Print each non-empty tick report as a JSON line
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Drive the engine with synthetic fixations on named entities
    Simulate {
        /// Scene file (TOML)
        #[arg(long)]
        scene: PathBuf,

        /// Entity to fixate; repeat to schedule saccades between targets
        #[arg(long = "target", required = true)]
        targets: Vec<String>,

        /// Seconds spent on each target
        #[arg(long, default_value_t = 1.0)]
        seconds: f64,

        /// RNG seed for gaze jitter
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Maximum gaze jitter in degrees
        #[arg(long, default_value_t = 0.1)]
        jitter: f64,

        /// Write the generated frames to a trace file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Print each non-empty tick report as a JSON line
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Occlusion ratio of an entity and its counterpart from the scene viewpoint
    Occlusion {
        /// Scene file (TOML)
        #[arg(long)]
        scene: PathBuf,

        /// Entity name
        #[arg(long)]
        entity: String,

        /// Lattice divisions per axis; overrides the config
        #[arg(long)]
        grid: Option<u32>,
    },

    /// Look up the counterpart of a landmark
    Resolve {
        /// Scene file (TOML)
        #[arg(long)]
        scene: PathBuf,

        /// Entity name
        name: String,
    },

    /// Print the effective engine config as TOML
    Config {
        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Per-run overrides on top of the config file.
#[derive(Args)]
struct EngineArgs {
    /// Exclusivity policy (concurrent, exclusive-on-replicas, exclusive-on-all)
    #[arg(long)]
    policy: Option<ExclusivityPolicy>,

    /// Near dwell time preset (short, medium, long)
    #[arg(long)]
    near: Option<DwellTimePreset>,

    /// Far dwell time preset (short, medium, long)
    #[arg(long)]
    far: Option<DwellTimePreset>,
}

impl EngineArgs {
    fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(policy) = self.policy {
            config.exclusivity_policy = policy;
        }
        if let Some(near) = self.near {
            config.dwell_time_near_ms = near.millis();
        }
        if let Some(far) = self.far {
            config.dwell_time_far_ms = far.millis();
        }
        config
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Replay {
            scene,
            trace,
            dt,
            json,
            engine,
        } => cmd_replay(&cli, scene, trace, *dt, *json, engine),
        Commands::Simulate {
            scene,
            targets,
            seconds,
            seed,
            jitter,
            record,
            json,
            engine,
        } => cmd_simulate(
            &cli,
            scene,
            SimulateArgs {
                targets,
                seconds: *seconds,
                seed: *seed,
                jitter: *jitter,
                record: record.as_deref(),
                json: *json,
            },
            engine,
        ),
        Commands::Occlusion {
            scene,
            entity,
            grid,
        } => cmd_occlusion(&cli, scene, entity, *grid),
        Commands::Resolve { scene, name } => cmd_resolve(&cli, scene, name),
        Commands::Config { engine } => cmd_config(&cli, engine),
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    match &cli.config {
        Some(path) => dwell_scene::load_config(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn effective_config(cli: &Cli, args: &EngineArgs) -> Result<EngineConfig> {
    let config = args.apply(load_config(cli)?);
    config.validate().context("invalid engine config")?;
    Ok(config)
}

fn load_scene(path: &Path, config: &EngineConfig) -> Result<Scene> {
    dwell_scene::load_scene(path, &config.markers)
        .with_context(|| format!("failed to load scene {}", path.display()))
}

fn find_entity(scene: &Scene, name: &str) -> Result<dwell_core::EntityId> {
    scene
        .find(name)
        .with_context(|| format!("no entity named '{name}' in scene"))
}

/// Feed `frames` through a fresh engine and print what happened.
fn run_session(
    config: EngineConfig,
    scene: &mut Scene,
    frames: impl IntoIterator<Item = GazeFrame>,
    dt: f64,
    json: bool,
) -> Result<()> {
    if !(dt.is_finite() && dt > 0.0) {
        bail!("tick duration must be positive, got {dt}");
    }
    let mut engine = GazeDwellEngine::new(config).context("invalid engine config")?;
    engine.link_scene(scene);
    tracing::info!(links = engine.resolver().len(), "counterparts linked");

    let printer = Printer::new(json);
    let mut ticks = 0u64;
    for frame in frames {
        let report = engine.tick(scene, frame, dt);
        printer.tick(scene, &report)?;
        ticks += 1;
    }
    printer.summary(ticks, engine.counters());
    Ok(())
}

fn cmd_replay(
    cli: &Cli,
    scene_path: &Path,
    trace_path: &Path,
    dt: Option<f64>,
    json: bool,
    args: &EngineArgs,
) -> Result<()> {
    let config = effective_config(cli, args)?;
    let mut scene = load_scene(scene_path, &config)?;
    let frames = dwell_scene::load_trace(trace_path)
        .with_context(|| format!("failed to load trace {}", trace_path.display()))?;
    let dt = dt.unwrap_or(1.0 / config.sample_rate_hz);
    run_session(config, &mut scene, frames, dt, json)
}

struct SimulateArgs<'a> {
    targets: &'a [String],
    seconds: f64,
    seed: u64,
    jitter: f64,
    record: Option<&'a Path>,
    json: bool,
}

fn cmd_simulate(cli: &Cli, scene_path: &Path, sim: SimulateArgs<'_>, args: &EngineArgs) -> Result<()> {
    let config = effective_config(cli, args)?;
    let mut scene = load_scene(scene_path, &config)?;
    if !(sim.seconds.is_finite() && sim.seconds > 0.0) {
        bail!("--seconds must be positive, got {}", sim.seconds);
    }

    let ticks = (sim.seconds * config.sample_rate_hz).round() as usize;
    let mut fixations = Vec::with_capacity(sim.targets.len());
    for name in sim.targets {
        let id = find_entity(&scene, name)?;
        let bounds = scene
            .bounds(id)
            .with_context(|| format!("'{name}' has no collider to look at"))?;
        fixations.push(Fixation::new(bounds.center(), ticks));
    }

    let frames: Vec<GazeFrame> =
        SyntheticGaze::new(scene.viewpoint(), fixations, SmallRng::seed_from_u64(sim.seed))
            .with_jitter(sim.jitter)
            .collect();
    if let Some(path) = sim.record {
        dwell_scene::write_trace(path, &frames)
            .with_context(|| format!("failed to write trace {}", path.display()))?;
    }

    let dt = 1.0 / config.sample_rate_hz;
    run_session(config, &mut scene, frames, dt, sim.json)
}

fn cmd_occlusion(cli: &Cli, scene_path: &Path, name: &str, grid: Option<u32>) -> Result<()> {
    let config = load_config(cli)?;
    let scene = load_scene(scene_path, &config)?;
    let id = find_entity(&scene, name)?;
    if scene.bounds(id).is_none() {
        bail!("'{name}' has no collider");
    }

    let estimator = OcclusionEstimator::new(grid.unwrap_or(config.occlusion_grid_resolution));
    let viewpoint = scene.viewpoint();
    let ratio = estimator.occlusion_ratio(&scene, viewpoint, id);
    println!("{name}: {ratio:.3}");

    let mut resolver = CounterpartResolver::new(config.naming.clone());
    resolver.rebuild(&scene);
    if let Some(other) = resolver.resolve(&scene, id) {
        let other_ratio = estimator.occlusion_ratio(&scene, viewpoint, other);
        println!("{}: {other_ratio:.3}", report::name_of(&scene, other));
        let highlight = ratio < config.occlusion_threshold
            && other_ratio < config.occlusion_threshold;
        println!(
            "feedback:  {}",
            if highlight { "highlight" } else { "see-through" }
        );
    } else {
        println!("feedback:  none (no counterpart)");
    }
    Ok(())
}

fn cmd_resolve(cli: &Cli, scene_path: &Path, name: &str) -> Result<()> {
    let config = load_config(cli)?;
    let scene = load_scene(scene_path, &config)?;
    let id = find_entity(&scene, name)?;

    let mut resolver = CounterpartResolver::new(config.naming.clone());
    resolver.rebuild(&scene);
    let Some(role) = resolver.role(&scene, id) else {
        bail!("'{name}' does not follow the landmark naming convention");
    };
    let Some(other) = resolver.resolve(&scene, id) else {
        bail!("no counterpart found for '{name}'");
    };
    println!("{name} ({}) -> {}", report::role_label(role), report::name_of(&scene, other));
    Ok(())
}

fn cmd_config(cli: &Cli, args: &EngineArgs) -> Result<()> {
    let config = effective_config(cli, args)?;
    let text = toml::to_string_pretty(&config).context("failed to serialize config")?;
    print!("{text}");
    Ok(())
}
