use crate::core::components::behavior::{Behavior, EvalContext};
use crate::core::errors::SimError;
use crate::core::system::System;
use crate::core::types::{CellId, SignalId};

/// Run combinational evaluation to a fixed point.
///
/// Cells are evaluated in schedule order; a pass that changes no output
/// value means the network has settled. For a well-formed acyclic network
/// the first pass already converges and the second merely confirms it, but
/// the pass count is still bounded at (cell count + 1) as a backstop: a
/// network that keeps oscillating past the bound can only contain a
/// combinational cycle the schedule builder did not get to reject.
pub(crate) fn settle(system: &mut System, stages: &[Vec<CellId>]) -> Result<(), SimError> {
    let cell_count: usize = stages.iter().map(Vec::len).sum();
    let max_passes = cell_count + 1;
    let mut outputs: Vec<(SignalId, u64)> = Vec::new();
    let mut unstable: Vec<CellId> = Vec::new();

    for _pass in 0..max_passes {
        unstable.clear();
        let System {
            cells,
            signals,
            values,
            mems,
            ..
        } = system;

        for stage in stages {
            for &cid in stage {
                let cell = &cells[cid.0];
                let Behavior::Combinational(behavior) = &cell.behavior else {
                    continue;
                };

                outputs.clear();
                for sig in cell.output_signals() {
                    outputs.push((sig, values[sig.0]));
                }

                let mut ctx = EvalContext {
                    signals: signals.as_slice(),
                    values: values.as_mut_slice(),
                    mems: mems.as_mut_slice(),
                };
                behavior.evaluate(&mut ctx);

                if outputs.iter().any(|&(sig, old)| values[sig.0] != old) {
                    unstable.push(cid);
                }
            }
        }

        if unstable.is_empty() {
            return Ok(());
        }
    }

    let names = unstable
        .iter()
        .map(|&id| system.full_name(id))
        .collect::<Vec<_>>();
    Err(SimError::CombinationalCycle(names))
}
