use crate::core::errors::SimError;
use crate::core::system::System;
use crate::core::types::CellId;
use std::collections::HashMap;

/// Builds the combinational evaluation schedule.
///
/// The schedule is computed once per elaboration: Kahn's algorithm over the
/// dependency graph whose nodes are combinational cells and whose edges run
/// from a signal's driver to each combinational reader. Sequential outputs
/// and stimulus signals have no combinational driver and act as sources, so
/// feedback through a register never creates an edge; only a purely
/// combinational loop does, and that is rejected.
pub(crate) struct OrderBuilder;

impl OrderBuilder {
    /// Topologically sorted execution order, organized into stages whose
    /// members only depend on earlier stages. Stages are sorted by cell
    /// handle so the schedule is deterministic for a given construction
    /// order.
    pub(crate) fn build_stages(system: &System) -> Result<Vec<Vec<CellId>>, SimError> {
        let comb: Vec<CellId> = (0..system.cells.len())
            .map(CellId)
            .filter(|id| system.cells[id.0].behavior.is_combinational())
            .collect();

        let mut adj: HashMap<CellId, Vec<CellId>> = HashMap::new();
        let mut in_degree: HashMap<CellId, usize> = HashMap::new();
        for &id in &comb {
            adj.insert(id, Vec::new());
            in_degree.insert(id, 0);
        }

        for &reader in &comb {
            for sig in system.cells[reader.0].input_signals() {
                if let Some(driver) = system.signals[sig.0].driver {
                    if adj.contains_key(&driver) {
                        adj.get_mut(&driver).unwrap().push(reader);
                        *in_degree.get_mut(&reader).unwrap() += 1;
                    }
                }
            }
        }

        let mut stages = Vec::new();
        let mut processed = 0;
        while processed < comb.len() {
            let mut stage: Vec<CellId> = in_degree
                .iter()
                .filter(|(_, &degree)| degree == 0)
                .map(|(&id, _)| id)
                .collect();

            if stage.is_empty() {
                // everything left is part of (or downstream of) a cycle
                let mut remaining: Vec<String> =
                    in_degree.keys().map(|&id| system.full_name(id)).collect();
                remaining.sort();
                return Err(SimError::CombinationalCycle(remaining));
            }

            stage.sort();

            for &id in &stage {
                in_degree.remove(&id);
                processed += 1;
                if let Some(readers) = adj.get(&id) {
                    for reader in readers {
                        if let Some(degree) = in_degree.get_mut(reader) {
                            *degree -= 1;
                        }
                    }
                }
            }

            stages.push(stage);
        }

        Ok(stages)
    }
}
