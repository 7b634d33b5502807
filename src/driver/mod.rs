//! Thin orchestration over the optimizer
//!
//! Wires a calculator, a constrained configuration and a trajectory
//! recorder into one relaxation run and reports the outcome. The CLI binary
//! is a layer above this; library users can call it directly.

use log::{error, info, warn};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::calculator::Calculator;
use crate::configuration::AtomicConfiguration;
use crate::optimization::bfgs::Lbfgs;
use crate::optimization::{OptimizationError, RelaxParams, RelaxationReport, StopReason};
use crate::trajectory::TrajectoryRecorder;

/// A finished relaxation: the final configuration and its report
#[derive(Debug)]
pub struct Relaxed {
    /// Configuration in its terminal state
    pub configuration: AtomicConfiguration,

    /// Outcome summary
    pub report: RelaxationReport,
}

/// Relax a configuration to a terminal state.
///
/// On failure the recorder keeps every completed step, so the last good
/// state stays available through [`TrajectoryRecorder::last`].
pub fn relax(
    calculator: &dyn Calculator,
    configuration: AtomicConfiguration,
    params: RelaxParams,
    stop: Option<Arc<AtomicBool>>,
    recorder: &mut TrajectoryRecorder,
) -> Result<Relaxed, OptimizationError> {
    info!(
        "relaxing {} atoms with {} (fmax threshold {}, step budget {})",
        configuration.len(),
        calculator.name(),
        params.fmax_threshold,
        params.max_steps
    );

    let mut optimizer = Lbfgs::new(calculator, configuration, params);
    if let Some(stop) = stop {
        optimizer = optimizer.with_stop_flag(stop);
    }

    let report = match optimizer.run(recorder) {
        Ok(report) => report,
        Err(e) => {
            error!("relaxation failed after {} steps: {}", optimizer.steps(), e);
            return Err(e);
        }
    };

    match report.reason {
        StopReason::Converged => info!("relaxation converged in {} steps", report.steps),
        StopReason::StepLimitReached => warn!(
            "relaxation stopped at the step limit ({} steps, fmax {:.6})",
            report.steps,
            report.fmax.unwrap_or(f64::NAN)
        ),
        StopReason::Interrupted => warn!("relaxation interrupted after {} steps", report.steps),
    }

    Ok(Relaxed {
        configuration: optimizer.into_configuration(),
        report,
    })
}
