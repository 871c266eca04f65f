use crate::core::components::behavior::Behavior;
use crate::core::types::{CellId, SignalId};

/// Port direction relative to the owning cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// A named, directioned binding between a cell and a signal.
///
/// `signal` is `None` between declaration and connection; elaboration
/// rejects any port still unbound at that point.
pub struct Port {
    pub(crate) name: String,
    pub(crate) direction: PortDirection,
    pub(crate) width: u32,
    pub(crate) signal: Option<SignalId>,
}

impl Port {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn signal(&self) -> Option<SignalId> {
        self.signal
    }
}

/// A node in the hierarchical circuit description.
///
/// Cells form a strict tree: every cell except the root has exactly one
/// parent, and only composite cells own children. Ports are ordered by
/// declaration.
pub struct Cell {
    pub(crate) name: String,
    pub(crate) parent: Option<CellId>,
    pub(crate) children: Vec<CellId>,
    pub(crate) ports: Vec<Port>,
    pub(crate) behavior: Behavior,
}

impl Cell {
    pub(crate) fn new(name: &str, parent: Option<CellId>, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            ports: Vec::new(),
            behavior,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<CellId> {
        self.parent
    }

    pub fn children(&self) -> &[CellId] {
        &self.children
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub(crate) fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub(crate) fn port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.name == name)
    }

    /// Signals read through this cell's input ports
    pub(crate) fn input_signals(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Input)
            .filter_map(|p| p.signal)
    }

    /// Signals driven through this cell's output ports
    pub(crate) fn output_signals(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
            .filter_map(|p| p.signal)
    }
}
