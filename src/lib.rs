pub mod core;

// Re-export commonly used types
pub use crate::core::components::behavior::{Behavior, Combinational, EvalContext, Sequential};
pub use crate::core::errors::SimError;
pub use crate::core::execution::simulator::Simulator;
pub use crate::core::memory::MemBlock;
pub use crate::core::scope::{Sample, Scope};
pub use crate::core::system::{System, ROOT};
pub use crate::core::types::{CellId, MemId, ScopeId, SignalId, Step};
