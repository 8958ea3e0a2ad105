//! # sootsim-core
//!
//! Shared types, physical constants and error machinery used by every
//! crate in the `sootsim` workspace: the coupled stochastic/ODE
//! population-balance solver for soot formation in a closed reactor.
//!
//! ## Design philosophy
//!
//! 1. Preserve the numerical contracts of the coupled solver: mass
//!    conservation across particle/gas exchange, deterministic replay
//!    under a fixed seed, and a clean separation between fatal
//!    programmer errors and recoverable numerical warnings.
//! 2. Programmer errors (bad volumes, unknown species, invalid particle
//!    counts) are fatal and returned as `Err`; numerical trouble (ODE
//!    non-convergence, event-iteration caps, corrector non-convergence) is
//!    logged through the `log` facade and the simulation continues on its
//!    best-available state.

pub mod constants;

use thiserror::Error;

/// Simulated time, in seconds.
pub type Time = f64;

/// Errors that indicate a programmer/configuration mistake rather than a
/// transient numerical difficulty. These are never raised as a reaction to
/// the natural stochastic progress of a simulation.
#[derive(Debug, Error)]
pub enum SootsimError {
    #[error("invalid particle state: {0}")]
    InvalidParticle(String),

    #[error("non-positive volume: {0}")]
    InvalidVolume(f64),

    #[error("unknown species requested: {0}")]
    UnknownSpecies(String),

    #[error("unknown process kind: {0}")]
    UnknownProcess(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("gas-phase error: {0}")]
    Gas(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SootsimError>;

/// A right-hand-side system suitable for integration by `sootsim-ode`.
///
/// Implementors typically wrap a mutable handle to whatever backs `y`
/// (e.g. a gas-phase state) plus whatever read-only context they closed
/// over (particle source terms, an energy-equation flag). `rhs` takes
/// `&mut self` rather than `&self` because evaluating it generally means
/// writing `y` into that backing state before its derivatives can be
/// read back out of it.
pub trait OdeSystem {
    /// Dimension of the state vector.
    fn dimension(&self) -> usize;

    /// Compute `dy/dt` at `(t, y)`, writing into `dy` (length `dimension()`).
    fn rhs(&mut self, t: Time, y: &[f64], dy: &mut [f64]) -> Result<()>;
}

/// A single named time series, used for ad hoc diagnostics and CLI output.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TimeSeries {
    pub name: String,
    pub time: Vec<Time>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, t: Time, v: f64) {
        self.time.push(t);
        self.values.push(v);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_series_tracks_points() {
        let mut ts = TimeSeries::new("temperature");
        ts.push(0.0, 1500.0);
        ts.push(1e-6, 1501.2);
        assert_eq!(ts.len(), 2);
        assert!(!ts.is_empty());
    }

    #[test]
    fn empty_time_series_reports_empty() {
        let ts = TimeSeries::new("unused");
        assert!(ts.is_empty());
        assert_eq!(ts.len(), 0);
    }
}
