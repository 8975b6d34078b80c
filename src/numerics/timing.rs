//! Optional wall-clock profiling of the solver phases, compiled in with the
//! `timing` feature. Without it every recorder just calls its closure.

#[cfg(feature = "timing")]
use std::cell::RefCell;
use std::time::Duration;
#[cfg(feature = "timing")]
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Weights,
    Assembly,
    LinearSolve,
    Step,
}

impl Phase {
    const ALL: [Phase; 4] = [Phase::Weights, Phase::Assembly, Phase::LinearSolve, Phase::Step];

    fn label(self) -> &'static str {
        match self {
            Phase::Weights => "Weight computation",
            Phase::Assembly => "Operator assembly",
            Phase::LinearSolve => "Linear solve",
            Phase::Step => "Time steps",
        }
    }
}

/// Durations collected per phase, plus the wall time of the whole run.
#[derive(Clone, Debug, Default)]
pub struct TimingStats {
    pub weight_times: Vec<Duration>,
    pub assembly_times: Vec<Duration>,
    pub linear_solve_times: Vec<Duration>,
    pub step_times: Vec<Duration>,
    pub total_time: Duration,
}

impl TimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self, phase: Phase) -> &[Duration] {
        match phase {
            Phase::Weights => &self.weight_times,
            Phase::Assembly => &self.assembly_times,
            Phase::LinearSolve => &self.linear_solve_times,
            Phase::Step => &self.step_times,
        }
    }

    #[cfg(feature = "timing")]
    fn samples_mut(&mut self, phase: Phase) -> &mut Vec<Duration> {
        match phase {
            Phase::Weights => &mut self.weight_times,
            Phase::Assembly => &mut self.assembly_times,
            Phase::LinearSolve => &mut self.linear_solve_times,
            Phase::Step => &mut self.step_times,
        }
    }

    pub fn print_summary(&self) {
        let accounted: Duration = Phase::ALL
            .iter()
            .map(|&p| self.samples(p).iter().sum::<Duration>())
            .sum();
        let overhead = self.total_time.saturating_sub(accounted);

        println!("\n{}", "=".repeat(60));
        println!("{:^60}", "GFD TIMING SUMMARY");
        println!("{}", "=".repeat(60));
        println!("Total time:                    {:.3}s", self.total_time.as_secs_f64());
        println!("{}", "-".repeat(60));
        for phase in Phase::ALL {
            let v = self.samples(phase);
            let ms = v.iter().sum::<Duration>().as_secs_f64() * 1000.0;
            let avg = if v.is_empty() { 0.0 } else { ms / v.len() as f64 };
            println!(
                "  {:<24} {:>9.3}ms  (n: {:>6}, avg: {:>9.3}ms)",
                phase.label(),
                ms,
                v.len(),
                avg
            );
        }
        println!("{}", "-".repeat(60));
        println!("Overhead/Other:                {:>9.3}ms\n", overhead.as_secs_f64() * 1000.0);
    }
}

#[cfg(feature = "timing")]
thread_local! {
    static TIMING_STATS: RefCell<TimingStats> = RefCell::new(TimingStats::new());
}

/// Run `f`, charging its duration to `phase` when profiling is enabled.
pub fn record<R>(phase: Phase, f: impl FnOnce() -> R) -> R {
    #[cfg(feature = "timing")]
    let start = Instant::now();
    let result = f();
    #[cfg(feature = "timing")]
    TIMING_STATS.with(|stats| stats.borrow_mut().samples_mut(phase).push(start.elapsed()));
    #[cfg(not(feature = "timing"))]
    let _ = phase;
    result
}

pub fn record_weights<R>(f: impl FnOnce() -> R) -> R {
    record(Phase::Weights, f)
}

pub fn record_assembly<R>(f: impl FnOnce() -> R) -> R {
    record(Phase::Assembly, f)
}

pub fn record_linear_solve<R>(f: impl FnOnce() -> R) -> R {
    record(Phase::LinearSolve, f)
}

pub fn record_step<R>(f: impl FnOnce() -> R) -> R {
    record(Phase::Step, f)
}

pub fn reset_timing() {
    #[cfg(feature = "timing")]
    TIMING_STATS.with(|stats| *stats.borrow_mut() = TimingStats::new());
}

/// Collected statistics with `total_time` filled in. Empty without the
/// `timing` feature.
pub fn finalize_timing(total_time: Duration) -> TimingStats {
    #[cfg(feature = "timing")]
    let mut stats = TIMING_STATS.with(|stats| stats.borrow().clone());
    #[cfg(not(feature = "timing"))]
    let mut stats = TimingStats::new();
    stats.total_time = total_time;
    stats
}

/// Print the summary table; a no-op unless built with `timing`.
pub fn finalize_and_print(total_time: Duration) {
    let stats = finalize_timing(total_time);
    if cfg!(feature = "timing") {
        stats.print_summary();
    }
}
