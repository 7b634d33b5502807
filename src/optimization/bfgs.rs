//! Limited-memory quasi-Newton relaxation
//!
//! Minimizes potential energy over the free degrees of freedom using a
//! two-loop recursion over recent (displacement, gradient-change) pairs,
//! with a per-atom step clamp instead of a line search. One calculator
//! call per step.

use log::{debug, info};
use nalgebra::{DVector, Vector3};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::calculator::Calculator;
use crate::configuration::AtomicConfiguration;
use crate::optimization::{
    max_force_norm, OptimizationError, RelaxParams, RelaxationReport, StopReason,
};
use crate::trajectory::{Snapshot, TrajectoryRecorder};

/// Curvature floor below which an (s, y) pair is discarded
const CURVATURE_EPS: f64 = 1e-10;

/// Quasi-Newton relaxation of an atomic configuration.
///
/// Owns the configuration for the duration of the run; the curvature
/// history is private to the instance and discarded with it.
pub struct Lbfgs<'a> {
    calculator: &'a dyn Calculator,
    configuration: AtomicConfiguration,
    params: RelaxParams,
    stop: Option<Arc<AtomicBool>>,

    s_history: Vec<DVector<f64>>,
    y_history: Vec<DVector<f64>>,
    rho_history: Vec<f64>,
    prev_positions: Option<DVector<f64>>,
    prev_gradient: Option<DVector<f64>>,
    step_count: usize,
}

impl<'a> Lbfgs<'a> {
    /// Create an optimizer over a configuration with injected calculator
    pub fn new(
        calculator: &'a dyn Calculator,
        configuration: AtomicConfiguration,
        params: RelaxParams,
    ) -> Self {
        Self {
            calculator,
            configuration,
            params,
            stop: None,
            s_history: Vec::new(),
            y_history: Vec::new(),
            rho_history: Vec::new(),
            prev_positions: None,
            prev_gradient: None,
            step_count: 0,
        }
    }

    /// Attach a stop flag checked at the top of every iteration
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// The configuration in its current (last valid) state
    pub fn configuration(&self) -> &AtomicConfiguration {
        &self.configuration
    }

    /// Consume the optimizer, returning the configuration
    pub fn into_configuration(self) -> AtomicConfiguration {
        self.configuration
    }

    /// Number of completed displacement steps
    pub fn steps(&self) -> usize {
        self.step_count
    }

    /// Run the relaxation loop to a terminal state.
    ///
    /// Every evaluated configuration is appended to the recorder, including
    /// the one that satisfies the convergence or step-limit criterion. On an
    /// error the recorder keeps all snapshots up to the last good step and
    /// the configuration stays inspectable through [`Lbfgs::configuration`].
    pub fn run(
        &mut self,
        recorder: &mut TrajectoryRecorder,
    ) -> Result<RelaxationReport, OptimizationError> {
        self.configuration.validate()?;
        let n_atoms = self.configuration.len();

        let mut last_energy = None;
        let mut last_fmax = None;

        loop {
            if let Some(stop) = &self.stop {
                if stop.load(Ordering::Relaxed) {
                    info!("stop signal observed after {} steps", self.step_count);
                    return Ok(self.report(StopReason::Interrupted, last_energy, last_fmax));
                }
            }

            let result = self.calculator.evaluate(&self.configuration)?;
            result.ensure_valid(n_atoms)?;

            let mut forces = result.forces;
            self.configuration.constraints.project_forces(&mut forces);
            let fmax = max_force_norm(&forces);

            info!(
                "step {:4}  energy {:14.6} eV  fmax {:10.6} eV/A",
                self.step_count, result.energy, fmax
            );
            recorder.append(Snapshot::of(
                self.step_count,
                result.energy,
                fmax,
                &self.configuration,
            ))?;
            last_energy = Some(result.energy);
            last_fmax = Some(fmax);

            if fmax <= self.params.fmax_threshold {
                info!("converged at step {} (fmax {:.6})", self.step_count, fmax);
                return Ok(self.report(StopReason::Converged, last_energy, last_fmax));
            }
            if self.step_count >= self.params.max_steps {
                info!(
                    "step limit of {} reached (fmax {:.6})",
                    self.params.max_steps, fmax
                );
                return Ok(self.report(StopReason::StepLimitReached, last_energy, last_fmax));
            }

            let positions = flatten(&self.configuration.positions());
            let gradient = -flatten(&forces);
            self.update_history(&positions, &gradient);

            let direction = self.two_loop_direction(&gradient);
            let mut displacement = unflatten(&direction);
            if displacement
                .iter()
                .any(|d| !(d.x.is_finite() && d.y.is_finite() && d.z.is_finite()))
            {
                return Err(OptimizationError::NonFiniteDisplacement {
                    step: self.step_count,
                });
            }

            // Scale the whole step down so no atom moves farther than the
            // clamp; the early Hessian guess can badly overshoot otherwise.
            let longest = displacement.iter().map(|d| d.norm()).fold(0.0, f64::max);
            if longest > self.params.max_step {
                let scale = self.params.max_step / longest;
                debug!(
                    "step {}: clamping displacement by factor {:.4}",
                    self.step_count, scale
                );
                for delta in &mut displacement {
                    *delta *= scale;
                }
            }
            self.configuration
                .constraints
                .project_displacement(&mut displacement);

            self.prev_positions = Some(positions);
            self.prev_gradient = Some(gradient);
            self.configuration.translate(&displacement)?;
            self.step_count += 1;
        }
    }

    fn report(
        &self,
        reason: StopReason,
        energy: Option<f64>,
        fmax: Option<f64>,
    ) -> RelaxationReport {
        RelaxationReport {
            reason,
            steps: self.step_count,
            energy,
            fmax,
        }
    }

    /// Fold the previous step's actual move and gradient change into the
    /// curvature history, subject to the curvature condition.
    fn update_history(&mut self, positions: &DVector<f64>, gradient: &DVector<f64>) {
        let (Some(prev_x), Some(prev_g)) = (&self.prev_positions, &self.prev_gradient) else {
            return;
        };

        let s = positions - prev_x;
        let y = gradient - prev_g;
        let sy = s.dot(&y);
        if sy > CURVATURE_EPS {
            if self.s_history.len() >= self.params.history_size {
                self.s_history.remove(0);
                self.y_history.remove(0);
                self.rho_history.remove(0);
            }
            self.s_history.push(s);
            self.y_history.push(y);
            self.rho_history.push(1.0 / sy);
        }
    }

    /// Two-loop recursion over the stored history to compute the search
    /// direction; falls back to steepest descent with no history.
    fn two_loop_direction(&self, gradient: &DVector<f64>) -> DVector<f64> {
        if self.s_history.is_empty() {
            return -gradient.clone();
        }

        let k = self.s_history.len();
        let mut q = gradient.clone();
        let mut alpha = vec![0.0; k];

        // First loop (backward)
        for i in (0..k).rev() {
            alpha[i] = self.rho_history[i] * self.s_history[i].dot(&q);
            q = &q - alpha[i] * &self.y_history[i];
        }

        // Initial Hessian approximation (scaled identity)
        let gamma = self.s_history[k - 1].dot(&self.y_history[k - 1])
            / self.y_history[k - 1].dot(&self.y_history[k - 1]);
        let mut r = gamma * q;

        // Second loop (forward)
        for i in 0..k {
            let beta = self.rho_history[i] * self.y_history[i].dot(&r);
            r = &r + (alpha[i] - beta) * &self.s_history[i];
        }

        -r
    }
}

fn flatten(vectors: &[Vector3<f64>]) -> DVector<f64> {
    DVector::from_iterator(
        vectors.len() * 3,
        vectors.iter().flat_map(|v| [v.x, v.y, v.z]),
    )
}

fn unflatten(flat: &DVector<f64>) -> Vec<Vector3<f64>> {
    flat.as_slice()
        .chunks_exact(3)
        .map(|c| Vector3::new(c[0], c[1], c[2]))
        .collect()
}
