use crate::config::SimulationConfig;
use crate::discretization::Discretization;
use crate::numerics::transient::{RunState, TransientResult};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

pub struct RunSummary {
    // Cloud info
    pub equation: &'static str,
    pub num_nodes: usize,
    pub num_boundary: usize,
    pub num_holes: usize,
    pub domain_min: (f64, f64),
    pub domain_max: (f64, f64),
    pub min_spacing: f64,

    // Stencils
    pub k_min: usize,
    pub k_max: usize,
    pub weight_power: f64,
    pub mean_stencil_size: f64,
    pub max_stencil_size: usize,

    // Time stepping
    pub dt: Option<f64>,
    pub theta: Option<f64>,
    pub steps: Option<usize>,
    pub final_time: Option<f64>,
    pub final_state: Option<RunState>,

    // Accuracy
    pub error: Option<f64>,
    pub max_error: Option<f64>,
    pub elapsed: Option<Duration>,
}

impl RunSummary {
    pub fn new(config: &SimulationConfig, disc: &Discretization) -> Self {
        let (lo, hi) = disc.cloud.bounding_box();
        Self {
            equation: config.equation.name(),
            num_nodes: disc.len(),
            num_boundary: disc.cloud.num_boundary(),
            num_holes: disc.cloud.holes.len(),
            domain_min: (lo.x, lo.y),
            domain_max: (hi.x, hi.y),
            min_spacing: disc.spacing,
            k_min: config.stencil.k_min,
            k_max: config.stencil.k_max,
            weight_power: config.stencil.weight_power,
            mean_stencil_size: disc.stencils.mean_size(),
            max_stencil_size: disc.stencils.max_size(),
            dt: None,
            theta: None,
            steps: None,
            final_time: None,
            final_state: None,
            error: None,
            max_error: None,
            elapsed: None,
        }
    }

    pub fn add_transient_info(&mut self, config: &SimulationConfig, result: &TransientResult) {
        self.dt = Some(config.time.dt);
        self.theta = Some(config.time.theta);
        self.steps = Some(result.steps);
        self.final_time = Some(result.time);
        self.final_state = Some(result.state);
    }

    /// `error` is the steady error or the mean over time levels.
    pub fn add_error(&mut self, error: Option<f64>, max_error: Option<f64>) {
        self.error = error;
        self.max_error = max_error;
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;

        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file, "GFD SIMULATION SUMMARY ({})", self.equation.to_uppercase())?;
        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file)?;

        writeln!(file, "POINT CLOUD")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(file, "Number of nodes:     {}", self.num_nodes)?;
        writeln!(file, "Boundary nodes:      {}", self.num_boundary)?;
        writeln!(file, "Holes:               {}", self.num_holes)?;
        writeln!(
            file,
            "Domain:              ({:.4}, {:.4}) to ({:.4}, {:.4})",
            self.domain_min.0, self.domain_min.1, self.domain_max.0, self.domain_max.1
        )?;
        writeln!(file, "Min spacing (h):     {:.6e}", self.min_spacing)?;
        writeln!(file)?;

        writeln!(file, "STENCILS")?;
        writeln!(file, "{}", "-".repeat(60))?;
        writeln!(file, "k_min / k_max:       {} / {}", self.k_min, self.k_max)?;
        writeln!(file, "Weight power p:      {}", self.weight_power)?;
        writeln!(file, "Mean stencil size:   {:.2}", self.mean_stencil_size)?;
        writeln!(file, "Max stencil size:    {}", self.max_stencil_size)?;
        writeln!(file)?;

        if let (Some(dt), Some(theta), Some(steps)) = (self.dt, self.theta, self.steps) {
            writeln!(file, "TIME STEPPING")?;
            writeln!(file, "{}", "-".repeat(60))?;
            writeln!(file, "dt:                  {:.6e}", dt)?;
            writeln!(file, "theta:               {}", theta)?;
            writeln!(file, "Steps taken:         {}", steps)?;
            if let Some(t) = self.final_time {
                writeln!(file, "Final time:          {:.6e}", t)?;
            }
            if let Some(state) = self.final_state {
                writeln!(file, "Final state:         {:?}", state)?;
            }
            writeln!(file)?;
        }

        writeln!(file, "ACCURACY")?;
        writeln!(file, "{}", "-".repeat(60))?;
        match self.error {
            Some(e) => writeln!(file, "Error:               {:.6e}", e)?,
            None => writeln!(file, "Error:               n/a")?,
        }
        if let Some(e) = self.max_error {
            writeln!(file, "Max error over time: {:.6e}", e)?;
        }
        if let Some(elapsed) = self.elapsed {
            writeln!(file, "Wall time:           {:.3}s", elapsed.as_secs_f64())?;
        }
        writeln!(file)?;

        writeln!(file, "{}", "=".repeat(60))?;

        Ok(())
    }

    pub fn print_to_console(&self) {
        println!("\n{}", "=".repeat(60));
        println!("SIMULATION SUMMARY");
        println!("{}", "=".repeat(60));
        println!("Equation:      {}", self.equation);
        println!(
            "Cloud:         {} nodes ({} boundary, {} holes), h = {:.3e}",
            self.num_nodes, self.num_boundary, self.num_holes, self.min_spacing
        );
        println!(
            "Stencils:      mean {:.2}, max {}",
            self.mean_stencil_size, self.max_stencil_size
        );
        if let (Some(steps), Some(t)) = (self.steps, self.final_time) {
            println!("Steps:         {} (t = {:.4e})", steps, t);
        }
        match self.error {
            Some(e) => println!("Error:         {:.3e}", e),
            None => println!("Error:         n/a"),
        }
        println!("{}\n", "=".repeat(60));
    }
}
