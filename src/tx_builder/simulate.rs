//! Simulation result classification
//!
//! A failed simulation is either slippage-class (the executor rebuilds and
//! retries) or terminal. The default classifier checks the structured
//! program error first and the aggregator's hex error code in the last log
//! line second.

use super::errors::SimulationError;
use crate::rpc::SimulationReport;
use serde_json::Value;

/// Anchor custom error the aggregator raises when slippage is exceeded
pub const SLIPPAGE_CUSTOM_CODE: u64 = 6001;

/// Same error as it appears in program logs
pub const SLIPPAGE_LOG_MARKER: &str = "0x1771";

/// What the executor should do with a simulation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationVerdict {
    Success,
    Failed(SimulationError),
}

/// Decides whether a simulation error is slippage-class
pub trait SimulationClassifier: Send + Sync {
    fn is_slippage(&self, err: &Value, logs: &[String]) -> bool;

    fn classify(&self, report: &SimulationReport) -> SimulationVerdict {
        match &report.err {
            None => SimulationVerdict::Success,
            Some(err) => {
                let details = err.to_string();
                if self.is_slippage(err, &report.logs) {
                    SimulationVerdict::Failed(SimulationError::Slippage(details))
                } else {
                    SimulationVerdict::Failed(SimulationError::Other(details))
                }
            }
        }
    }
}

/// `InstructionError(_, Custom(code))`, then `marker` in the last log line
#[derive(Debug, Clone)]
pub struct SlippageClassifier {
    pub custom_code: u64,
    pub log_marker: String,
}

impl Default for SlippageClassifier {
    fn default() -> Self {
        Self {
            custom_code: SLIPPAGE_CUSTOM_CODE,
            log_marker: SLIPPAGE_LOG_MARKER.to_string(),
        }
    }
}

impl SimulationClassifier for SlippageClassifier {
    fn is_slippage(&self, err: &Value, logs: &[String]) -> bool {
        let custom = err
            .get("InstructionError")
            .and_then(|ix| ix.get(1))
            .and_then(|e| e.get("Custom"))
            .and_then(Value::as_u64);
        if custom == Some(self.custom_code) {
            return true;
        }

        logs.last()
            .map(|line| line.contains(&self.log_marker))
            .unwrap_or(false)
    }
}

/// Classify with the default slippage rules
pub fn classify_simulation(report: &SimulationReport) -> SimulationVerdict {
    SlippageClassifier::default().classify(report)
}
