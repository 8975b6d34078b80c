use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gfd_rs::config::{EquationKind, SimulationConfig};
use gfd_rs::discretization::cloud::PointCloud;
use gfd_rs::discretization::generator;
use gfd_rs::discretization::neighbors::from_triangulation;
use gfd_rs::discretization::Discretization;
use gfd_rs::models::{run_case, CaseOutcome};
use gfd_rs::numerics::timing::{finalize_and_print, reset_timing};
use gfd_rs::processing::error::ErrorEvaluator;
use gfd_rs::processing::summary::RunSummary;
use gfd_rs::processing::{cloud_reader, csv_writer};
use glam::DVec2;
use log::{info, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Equation {
    Poisson,
    Heat,
    AdvectionDiffusion,
    Wave,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CloudShape {
    Grid,
    Perturbed,
    Annulus,
    Holed,
}

/// Run a manufactured GFD test case and write the results as CSV.
#[derive(Parser)]
#[command(name = "gfd-rs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Meshless Generalized Finite Differences on 2D point clouds", long_about = None)]
struct Cli {
    /// TOML run configuration; overrides --equation
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "poisson")]
    equation: Equation,

    /// Point file (`x,y,flag` rows); a cloud is generated when absent
    #[arg(short, long)]
    points: Option<PathBuf>,

    /// Triangle file (`a,b,c` rows, 0-based); stencils then come from triangle adjacency
    #[arg(short, long, requires = "points")]
    triangles: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "grid")]
    cloud: CloudShape,

    /// Resolution of the generated cloud
    #[arg(short, long, default_value_t = 20)]
    n: usize,

    #[arg(long)]
    dt: Option<f64>,

    #[arg(long)]
    steps: Option<usize>,

    #[arg(long)]
    theta: Option<f64>,

    /// Write the field every N steps (0 writes only the final one)
    #[arg(long, default_value_t = 0)]
    save_every: usize,

    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .init();

    let config = build_config(&cli)?;
    let out_dir = cli.output.join(config.equation.name());
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    reset_timing();
    let start = Instant::now();

    let cloud = load_cloud(&cli)?;
    let disc = match &cli.triangles {
        Some(path) => {
            let triangles = cloud_reader::read_triangles(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let stencils = from_triangulation(&cloud, &triangles, config.stencil.k_max)?;
            Discretization::from_stencils(cloud, stencils, &config.selector().solver)?
        }
        None => Discretization::build(cloud, &config.selector())?,
    };
    csv_writer::write_cloud(out_dir.join("cloud_p.csv"), &disc.cloud)?;

    let evaluator = ErrorEvaluator::area_weighted(&disc.cloud, &disc.stencils);
    let save_every = cli.save_every;
    let snapshots = out_dir.clone();
    let mut write_failed = None;
    let outcome = run_case(
        &config,
        &disc,
        &evaluator,
        |step, _t, u| {
            if save_every > 0 && step % save_every == 0 {
                let path = snapshots.join(format!("step_{step:06}.csv"));
                if let Err(e) = csv_writer::write_field(&path, &disc.cloud, &[("u", u.as_slice())]) {
                    write_failed.get_or_insert(e);
                }
            }
        },
        |_, _| false,
    )?;
    if let Some(e) = write_failed {
        return Err(e).context("failed to write a snapshot");
    }
    let elapsed = start.elapsed();

    save_solution(&out_dir, &disc, &outcome)?;

    let mut summary = RunSummary::new(&config, &disc);
    if let Some(result) = &outcome.transient {
        summary.add_transient_info(&config, result);
        summary.add_error(outcome.errors.mean(), outcome.errors.max());
    } else {
        summary.add_error(outcome.errors.mean(), None);
    }
    summary.elapsed = Some(elapsed);

    let summary_path = out_dir.join("simulation_summary.txt");
    summary
        .write_to_file(&summary_path)
        .context("failed to write summary")?;
    summary.print_to_console();
    finalize_and_print(elapsed);

    info!("Summary saved to {}", summary_path.display());
    Ok(())
}

/// Configuration from file, or the defaults of the chosen case, with CLI
/// overrides applied last.
fn build_config(cli: &Cli) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => default_config(cli.equation),
    };
    if let Some(dt) = cli.dt {
        config.time.dt = dt;
    }
    if let Some(steps) = cli.steps {
        config.time.num_steps = steps;
    }
    if let Some(theta) = cli.theta {
        config.time.theta = theta;
    }
    config.validate()?;
    Ok(config)
}

fn default_config(equation: Equation) -> SimulationConfig {
    let mut config = SimulationConfig::new(match equation {
        Equation::Poisson => EquationKind::Poisson,
        Equation::Heat => EquationKind::Heat,
        Equation::AdvectionDiffusion => EquationKind::AdvectionDiffusion,
        Equation::Wave => EquationKind::Wave,
    });
    match equation {
        Equation::Poisson => {}
        Equation::Heat => {
            config.diffusivity = Some(0.2);
            config.time.dt = 5e-4;
            config.time.num_steps = 1000;
        }
        Equation::AdvectionDiffusion => {
            config.diffusivity = Some(0.1);
            config.velocity = Some([0.3, 0.2]);
            config.time.dt = 5e-4;
            config.time.num_steps = 1000;
        }
        Equation::Wave => {
            config.wave_speed = Some(0.5_f64.sqrt());
            config.time.dt = 5e-3;
            config.time.num_steps = 400;
        }
    }
    config.time.log_every = config.time.num_steps / 10;
    config
}

fn load_cloud(cli: &Cli) -> Result<PointCloud> {
    if let Some(path) = &cli.points {
        return cloud_reader::read_points(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let n = cli.n.max(4);
    let center = DVec2::new(0.5, 0.5);
    Ok(match cli.cloud {
        CloudShape::Grid => generator::regular_grid(DVec2::ZERO, [1.0, 1.0], n, n),
        CloudShape::Perturbed => generator::perturbed_grid(DVec2::ZERO, [1.0, 1.0], n, n, 0.2, 42),
        CloudShape::Annulus => generator::annulus(center, 0.2, 0.5, n / 2, 4 * n),
        CloudShape::Holed => generator::square_with_hole(DVec2::ZERO, 1.0, n, center, 0.2),
    })
}

fn save_solution(dir: &Path, disc: &Discretization, outcome: &CaseOutcome) -> Result<()> {
    let error: Vec<f64> = (&outcome.solution - &outcome.exact).iter().map(|e| e.abs()).collect();
    csv_writer::write_field(
        dir.join("solution.csv"),
        &disc.cloud,
        &[
            ("computed", outcome.solution.as_slice()),
            ("exact", outcome.exact.as_slice()),
            ("abs_error", error.as_slice()),
        ],
    )
    .context("failed to write solution")?;

    if outcome.transient.is_some() {
        csv_writer::write_xy(
            dir.join("errors.csv"),
            "t",
            "error",
            &outcome.errors.times,
            &outcome.errors.errors,
        )
        .context("failed to write error history")?;
    }
    Ok(())
}
