use crate::core::memory::MemBlock;
use crate::core::signal::Signal;
use crate::core::types::{MemId, SignalId};

/// Evaluation-time view of the system handed to cell behaviors.
///
/// Signal metadata is read-only; values and memory blocks are writable.
/// Writes are masked to the target signal's width, so behaviors never have
/// to worry about overflowing their output wires.
pub struct EvalContext<'a> {
    pub(crate) signals: &'a [Signal],
    pub(crate) values: &'a mut [u64],
    pub(crate) mems: &'a mut [MemBlock],
}

impl EvalContext<'_> {
    /// Current value of a signal
    pub fn get(&self, signal: SignalId) -> u64 {
        self.values[signal.0]
    }

    /// Drive a signal, masking the value to the signal's width
    pub fn set(&mut self, signal: SignalId, value: u64) {
        self.values[signal.0] = value & self.signals[signal.0].mask();
    }

    /// Bit width of a signal
    pub fn width(&self, signal: SignalId) -> u32 {
        self.signals[signal.0].width()
    }

    pub fn mem(&self, mem: MemId) -> &MemBlock {
        &self.mems[mem.0]
    }

    pub fn mem_mut(&mut self, mem: MemId) -> &mut MemBlock {
        &mut self.mems[mem.0]
    }
}

/// Behavioral contract of a combinational cell: a pure function from current
/// input signal values to output signal values, re-run until the network
/// settles. Implementations must not keep state across calls.
pub trait Combinational: Send {
    fn evaluate(&self, ctx: &mut EvalContext<'_>);
}

/// Behavioral contract of a sequential (clocked) cell.
///
/// `compute_next` runs after the network has settled and derives the next
/// state from input values and current state; it receives a shared context
/// and therefore cannot write any signal. `commit` then replaces the stored
/// state and publishes it to the cell's outputs. For every sequential cell
/// in the system, all `compute_next` calls happen before any `commit`, which
/// is what makes register updates logically simultaneous.
pub trait Sequential: Send {
    /// Reset internal state to its initial value and publish it.
    fn reset(&mut self, ctx: &mut EvalContext<'_>);

    /// Derive the next state from settled inputs; no signal writes.
    fn compute_next(&mut self, ctx: &EvalContext<'_>);

    /// Latch the previously computed next state and publish it.
    fn commit(&mut self, ctx: &mut EvalContext<'_>);
}

/// The three mutually exclusive roles a cell can take. Composites structure
/// the tree and are never evaluated; the two behavioral kinds carry the
/// matching contract as a trait object.
pub enum Behavior {
    Composite,
    Combinational(Box<dyn Combinational>),
    Sequential(Box<dyn Sequential>),
}

impl Behavior {
    pub fn is_composite(&self) -> bool {
        matches!(self, Behavior::Composite)
    }

    pub fn is_combinational(&self) -> bool {
        matches!(self, Behavior::Combinational(_))
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, Behavior::Sequential(_))
    }
}
