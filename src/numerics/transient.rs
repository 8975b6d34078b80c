use crate::error::Result;
use crate::numerics::timing::record_step;
use crate::numerics::Convergence;
use log::{debug, info};
use nalgebra::DVector;

/// One time-marching scheme. Each call to `step` advances the state by one
/// time step and re-applies the boundary values of the new time level.
pub trait TimeStepper {
    fn time(&self) -> f64;
    fn current(&self) -> &DVector<f64>;
    fn step(&mut self) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Initialized,
    Stepping,
    /// The per-step update fell below the steady-state tolerance.
    Converged,
    /// All requested steps were taken.
    Finished,
    /// The caller's stop check returned true.
    Stopped,
}

#[derive(Clone, Debug)]
pub struct TransientResult {
    pub state: RunState,
    pub steps: usize,
    pub time: f64,
    /// Norm of the last update, when steady-state detection is enabled.
    pub final_update: Option<f64>,
}

pub struct TransientSolver {
    pub num_steps: usize,
    pub steady_state: Option<Convergence>,
    /// Log progress every `log_every` steps; 0 disables it.
    pub log_every: usize,
}

impl Default for TransientSolver {
    fn default() -> Self {
        Self {
            num_steps: 100,
            steady_state: None,
            log_every: 10,
        }
    }
}

impl TransientSolver {
    /// March `stepper` forward. `callback(step, t, u)` sees the initial state
    /// with `step = 0` and every accepted state after that. `should_stop` is
    /// polled between steps.
    pub fn run<S, C, Q>(
        &self,
        stepper: &mut S,
        mut callback: C,
        mut should_stop: Q,
    ) -> Result<TransientResult>
    where
        S: TimeStepper + ?Sized,
        C: FnMut(usize, f64, &DVector<f64>),
        Q: FnMut(usize, f64) -> bool,
    {
        let mut state = RunState::Initialized;
        let mut final_update = None;
        callback(0, stepper.time(), stepper.current());

        info!(
            "Starting transient run: t0 = {:.4e}, {} steps",
            stepper.time(),
            self.num_steps
        );

        let mut steps = 0;
        while steps < self.num_steps {
            if should_stop(steps, stepper.time()) {
                state = RunState::Stopped;
                break;
            }
            state = RunState::Stepping;

            let previous = self.steady_state.map(|_| stepper.current().clone());
            record_step(|| stepper.step())?;
            steps += 1;
            let t = stepper.time();
            callback(steps, t, stepper.current());

            if self.log_every > 0 && steps % self.log_every == 0 {
                info!(
                    "Step {:>6} | t = {:.4e} | max|u| = {:.4e}",
                    steps,
                    t,
                    stepper.current().amax()
                );
            } else {
                debug!("Step {:>6} | t = {:.4e}", steps, t);
            }

            if let (Some(conv), Some(prev)) = (&self.steady_state, previous) {
                let (steady, update) = conv.is_steady(&prev, stepper.current());
                final_update = Some(update);
                if steady {
                    info!("Steady state reached after {} steps (update {:.3e})", steps, update);
                    state = RunState::Converged;
                    break;
                }
            }
        }

        if state == RunState::Stepping || state == RunState::Initialized {
            state = RunState::Finished;
        }

        Ok(TransientResult {
            state,
            steps,
            time: stepper.time(),
            final_update,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::Tolerance;

    /// `u' = -u` with explicit Euler.
    struct Decay {
        t: f64,
        dt: f64,
        u: DVector<f64>,
    }

    impl TimeStepper for Decay {
        fn time(&self) -> f64 {
            self.t
        }
        fn current(&self) -> &DVector<f64> {
            &self.u
        }
        fn step(&mut self) -> Result<()> {
            self.u *= 1.0 - self.dt;
            self.t += self.dt;
            Ok(())
        }
    }

    fn decay() -> Decay {
        Decay {
            t: 0.0,
            dt: 0.1,
            u: DVector::from_element(3, 1.0),
        }
    }

    #[test]
    fn runs_all_steps() {
        let mut s = decay();
        let mut seen = Vec::new();
        let result = TransientSolver {
            num_steps: 5,
            ..Default::default()
        }
        .run(&mut s, |k, _, _| seen.push(k), |_, _| false)
        .unwrap();
        assert_eq!(result.state, RunState::Finished);
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
        assert!((result.time - 0.5).abs() < 1e-12);
    }

    #[test]
    fn stops_on_request() {
        let mut s = decay();
        let result = TransientSolver::default()
            .run(&mut s, |_, _, _| {}, |k, _| k == 3)
            .unwrap();
        assert_eq!(result.state, RunState::Stopped);
        assert_eq!(result.steps, 3);
    }

    #[test]
    fn detects_steady_state() {
        let mut s = decay();
        let result = TransientSolver {
            num_steps: 10_000,
            steady_state: Some(Convergence {
                tolerance: Tolerance::Absolute(1e-8),
                ..Default::default()
            }),
            log_every: 0,
        }
        .run(&mut s, |_, _, _| {}, |_, _| false)
        .unwrap();
        assert_eq!(result.state, RunState::Converged);
        assert!(result.steps < 10_000);
        assert!(result.final_update.unwrap() < 1e-8);
    }
}
