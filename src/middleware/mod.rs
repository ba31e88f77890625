pub mod gate;

pub use gate::{GateDecision, decide, gate_middleware};
