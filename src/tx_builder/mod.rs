//! Swap transaction building and simulation classification
//!
//! - **errors**: swap API, simulation and execution error taxonomy
//! - **swap_api**: quote + swap-build collaborator and its HTTP implementation
//! - **simulate**: slippage-class detection for simulation failures

pub mod errors;
pub mod simulate;
pub mod swap_api;

pub use errors::{ExecutionError, SimulationError, SwapApiError};
pub use simulate::{
    classify_simulation, SimulationClassifier, SimulationVerdict, SlippageClassifier,
};
pub use swap_api::{JupiterSwapApi, PriorityLevel, Quote, QuoteRequest, SwapApi, SwapParams};
