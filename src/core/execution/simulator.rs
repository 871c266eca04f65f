use crate::core::components::behavior::{Behavior, EvalContext};
use crate::core::errors::SimError;
use crate::core::execution::order::OrderBuilder;
use crate::core::execution::propagation;
use crate::core::scope::Sample;
use crate::core::system::System;
use crate::core::types::{CellId, MemId, ScopeId, SignalId, Step};
use log::{debug, warn};
use std::path::Path;

/// Clock driver over an elaborated system.
///
/// `Simulator::new` consumes the constructed [`System`], runs the
/// elaboration checks (every port bound, no combinational cycle), publishes
/// the initial state of every sequential cell and settles the network once,
/// so values are observable before the first step.
///
/// One step is one clock edge: settle to a combinational fixed point,
/// compute every sequential cell's next state, commit them all, settle
/// again, then sample the scopes. All `compute_next` calls happen before
/// any `commit`, which makes register updates logically simultaneous: no
/// register sees another register's new value within the same step.
pub struct Simulator {
    system: System,
    stages: Vec<Vec<CellId>>,
    seq_cells: Vec<CellId>,
    step_index: Step,
}

impl Simulator {
    /// Elaborate a constructed system and settle it once.
    pub fn new(mut system: System) -> Result<Self, SimError> {
        system.check_connected()?;
        let stages = OrderBuilder::build_stages(&system)?;
        let seq_cells: Vec<CellId> = (0..system.cells.len())
            .map(CellId)
            .filter(|id| system.cells[id.0].behavior.is_sequential())
            .collect();

        {
            let System {
                cells,
                signals,
                values,
                mems,
                ..
            } = &mut system;
            for &cid in &seq_cells {
                if let Behavior::Sequential(behavior) = &mut cells[cid.0].behavior {
                    let mut ctx = EvalContext {
                        signals: signals.as_slice(),
                        values: values.as_mut_slice(),
                        mems: mems.as_mut_slice(),
                    };
                    behavior.reset(&mut ctx);
                }
            }
        }

        let mut sim = Self {
            system,
            stages,
            seq_cells,
            step_index: 0,
        };
        sim.settle()?;
        Ok(sim)
    }

    /// Advance the clock by `n` edges. `step(0)` is a no-op: values and
    /// scope histories are left untouched.
    pub fn step(&mut self, n: u64) -> Result<(), SimError> {
        for _ in 0..n {
            self.step_once()?;
        }
        Ok(())
    }

    fn step_once(&mut self) -> Result<(), SimError> {
        debug!("=== simulation step {} ===", self.step_index + 1);

        // phase 1: settle with current stimulus and register outputs
        self.settle()?;

        // phases 2 and 3: next-state computation for all sequential cells,
        // then their simultaneous commit
        {
            let Self {
                system, seq_cells, ..
            } = self;
            let System {
                cells,
                signals,
                values,
                mems,
                ..
            } = system;

            for &cid in seq_cells.iter() {
                if let Behavior::Sequential(behavior) = &mut cells[cid.0].behavior {
                    let ctx = EvalContext {
                        signals: signals.as_slice(),
                        values: values.as_mut_slice(),
                        mems: mems.as_mut_slice(),
                    };
                    behavior.compute_next(&ctx);
                }
            }

            for &cid in seq_cells.iter() {
                if let Behavior::Sequential(behavior) = &mut cells[cid.0].behavior {
                    let mut ctx = EvalContext {
                        signals: signals.as_slice(),
                        values: values.as_mut_slice(),
                        mems: mems.as_mut_slice(),
                    };
                    behavior.commit(&mut ctx);
                }
            }
        }

        // phase 4: settle so derived outputs reflect the committed state
        self.settle()?;

        self.step_index += 1;
        self.sample_scopes();
        Ok(())
    }

    /// Propagate to a combinational fixed point without clocking. Useful to
    /// observe purely combinational responses to fresh stimulus.
    pub fn settle(&mut self) -> Result<(), SimError> {
        propagation::settle(&mut self.system, &self.stages)
    }

    fn sample_scopes(&mut self) {
        let step = self.step_index;
        let System { scopes, values, .. } = &mut self.system;
        for scope in scopes.iter_mut() {
            let value = values.get(scope.signal().0).copied();
            if value.is_none() {
                warn!(
                    "scope '{}' failed to sample its signal, recording a gap",
                    scope.label()
                );
            }
            scope.record(step, value);
        }
    }

    // ---- stimulus and inspection --------------------------------------

    /// Write a stimulus signal. Only signals without a driver accept
    /// external writes; the value is masked to the signal's width.
    pub fn put(&mut self, signal: SignalId, value: u64) -> Result<(), SimError> {
        let s = &self.system.signals[signal.0];
        if let Some(driver) = s.driver() {
            return Err(SimError::IllegalExternalWrite {
                signal: s.name().to_string(),
                driver: self.system.full_name(driver),
            });
        }
        let mask = s.mask();
        self.system.values[signal.0] = value & mask;
        Ok(())
    }

    /// Current value of a signal
    pub fn get(&self, signal: SignalId) -> u64 {
        self.system.values[signal.0]
    }

    /// Number of completed steps since elaboration
    pub fn current_step(&self) -> Step {
        self.step_index
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    // ---- scopes -------------------------------------------------------

    /// Attach a scope mid-run; its history starts at the next step
    pub fn attach_scope(&mut self, signal: SignalId, label: &str) -> ScopeId {
        self.system.attach_scope(signal, label)
    }

    /// Recorded history of a scope, one sample per completed step
    pub fn history(&self, scope: ScopeId) -> &[Sample] {
        self.system.scope(scope).samples()
    }

    // ---- memory -------------------------------------------------------

    /// Out-of-band read of a memory cell
    pub fn mem_read(&self, mem: MemId, address: u64) -> Result<u64, SimError> {
        self.system.mem(mem).read(address)
    }

    /// Out-of-band write of a memory cell
    pub fn mem_write(&mut self, mem: MemId, address: u64, value: u64) -> Result<(), SimError> {
        self.system.mem_mut(mem).write(address, value)
    }

    /// Bulk-load a memory block from a text file, tolerating failure (see
    /// [`System::load_memory_file`])
    pub fn load_memory_file(&mut self, mem: MemId, path: &Path, base: u32) {
        self.system.load_memory_file(mem, path, base);
    }
}
