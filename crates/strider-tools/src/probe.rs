//! Stage-level timing and memory instrumentation.
//!
//! Used by the benchmark driver to attribute wall time and resident-set
//! growth to the assembly and evaluation phases of a problem.

use std::time::{Duration, Instant};
use sysinfo::System;

/// Errors produced by process instrumentation.
#[derive(Debug, Clone)]
pub enum ProbeError {
    ProcessNotFound { pid: u32 },
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::ProcessNotFound { pid } => {
                write!(f, "failed to locate process {}", pid)
            }
        }
    }
}

impl std::error::Error for ProbeError {}

/// Resident set size of the current process in bytes.
///
/// # Errors
///
/// Returns an error if the current process cannot be located.
pub fn current_rss_bytes() -> Result<u64, ProbeError> {
    let pid = sysinfo::Pid::from(std::process::id() as usize);

    // Only refresh the process we care about, not the entire system.
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        sysinfo::ProcessesToUpdate::Some(&[pid]),
        true,
        sysinfo::ProcessRefreshKind::nothing().with_memory(),
    );

    let process = sys.process(pid).ok_or(ProbeError::ProcessNotFound {
        pid: std::process::id(),
    })?;

    // sysinfo 0.33+ returns memory in bytes directly
    Ok(process.memory())
}

/// Timing and memory delta for one named stage.
#[derive(Debug, Clone)]
pub struct StageMeasurement {
    /// Name of the stage (e.g., "assemble", "evaluate")
    pub stage: String,
    pub duration: Duration,
    pub rss_before_bytes: u64,
    pub rss_after_bytes: u64,
}

impl StageMeasurement {
    /// RSS growth across the stage in bytes (positive means growth).
    pub fn rss_delta_bytes(&self) -> i64 {
        self.rss_after_bytes as i64 - self.rss_before_bytes as i64
    }
}

/// Accumulates measurements across a sequence of stages.
#[derive(Debug, Default)]
pub struct StageProbe {
    measurements: Vec<StageMeasurement>,
}

impl StageProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` as a named stage, recording its wall time and RSS delta.
    ///
    /// # Errors
    ///
    /// Returns an error if the process memory could not be sampled.
    pub fn measure<T>(
        &mut self,
        stage: &str,
        work: impl FnOnce() -> T,
    ) -> Result<T, ProbeError> {
        let rss_before_bytes = current_rss_bytes()?;
        let start = Instant::now();
        let output = work();
        let duration = start.elapsed();
        let rss_after_bytes = current_rss_bytes()?;
        self.measurements.push(StageMeasurement {
            stage: stage.to_string(),
            duration,
            rss_before_bytes,
            rss_after_bytes,
        });
        Ok(output)
    }

    /// All recorded measurements, in execution order.
    pub fn measurements(&self) -> &[StageMeasurement] {
        &self.measurements
    }

    /// The most recent measurement.
    pub fn last(&self) -> Option<&StageMeasurement> {
        self.measurements.last()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::probe::{current_rss_bytes, StageMeasurement, StageProbe};

    #[test]
    fn test_rss_sampling() {
        let rss = current_rss_bytes().unwrap_or_else(|err| panic!("{}", err));
        assert!(rss > 0);
    }

    #[test]
    fn test_rss_delta() {
        let measurement = StageMeasurement {
            stage: "grow".to_string(),
            duration: Duration::from_millis(1),
            rss_before_bytes: 1000,
            rss_after_bytes: 1500,
        };
        assert_eq!(measurement.rss_delta_bytes(), 500);
    }

    #[test]
    fn test_stage_probe_records_in_order() {
        let mut probe = StageProbe::new();
        let value = probe
            .measure("first", || 21 * 2)
            .unwrap_or_else(|err| panic!("{}", err));
        assert_eq!(value, 42);
        probe
            .measure("second", || ())
            .unwrap_or_else(|err| panic!("{}", err));

        assert_eq!(probe.measurements().len(), 2);
        assert_eq!(probe.measurements()[0].stage, "first");
        assert_eq!(probe.measurements()[1].stage, "second");
        assert!(probe.last().is_some());
    }
}
