use crate::core::components::behavior::{Behavior, Combinational, Sequential};
use crate::core::components::cell::{Cell, Port, PortDirection};
use crate::core::errors::SimError;
use crate::core::memory::MemBlock;
use crate::core::scope::Scope;
use crate::core::signal::Signal;
use crate::core::types::{CellId, MemId, ScopeId, SignalId};
use log::warn;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Handle of the root composite created by [`System::new`]
pub const ROOT: CellId = CellId(0);

/// The simulation context: owns every cell, signal, memory block and scope.
///
/// All construction goes through this object; there is no ambient global
/// state. Cells and signals are stored in arenas and referenced by `Copy`
/// handles, which keeps the hierarchy an ordinary tree (parent and child
/// indices) while letting any cell reference sibling-owned signals.
///
/// Construction is purely declarative; nothing is evaluated until the system
/// is handed to [`crate::Simulator::new`].
pub struct System {
    pub(crate) cells: Vec<Cell>,
    pub(crate) signals: Vec<Signal>,
    pub(crate) values: Vec<u64>,
    pub(crate) mems: Vec<MemBlock>,
    pub(crate) scopes: Vec<Scope>,
}

impl System {
    /// Create a system whose root composite carries the given name
    pub fn new(name: &str) -> Self {
        Self {
            cells: vec![Cell::new(name, None, Behavior::Composite)],
            signals: Vec::new(),
            values: Vec::new(),
            mems: Vec::new(),
            scopes: Vec::new(),
        }
    }

    // ---- signals ------------------------------------------------------

    /// Create a signal of the given width, owned by `owner` for naming
    pub fn wire(&mut self, owner: CellId, name: &str, width: u32) -> SignalId {
        let id = SignalId(self.signals.len());
        self.signals.push(Signal::new(name, width, owner));
        self.values.push(0);
        id
    }

    /// Convenience for the ubiquitous single-bit control wire
    pub fn wire1(&mut self, owner: CellId, name: &str) -> SignalId {
        self.wire(owner, name, 1)
    }

    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id.0]
    }

    /// Current value of a signal (masked to its width)
    pub fn value(&self, id: SignalId) -> u64 {
        self.values[id.0]
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    // ---- cells --------------------------------------------------------

    /// Add a structural (composite) cell under `parent`
    pub fn composite(&mut self, parent: CellId, name: &str) -> CellId {
        self.new_cell(parent, name, Behavior::Composite)
    }

    /// Register a custom combinational behavior as a cell. Ports are bound
    /// afterwards with [`System::input`] / [`System::output`].
    pub fn add_combinational(
        &mut self,
        parent: CellId,
        name: &str,
        behavior: Box<dyn Combinational>,
    ) -> CellId {
        self.new_cell(parent, name, Behavior::Combinational(behavior))
    }

    /// Register a custom sequential behavior as a cell. This is the
    /// extension point for clocked components whose next-state logic is not
    /// expressible as wiring of the standard library.
    pub fn add_sequential(
        &mut self,
        parent: CellId,
        name: &str,
        behavior: Box<dyn Sequential>,
    ) -> CellId {
        self.new_cell(parent, name, Behavior::Sequential(behavior))
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// `/`-separated path from the root, for diagnostics
    pub fn full_name(&self, cell: CellId) -> String {
        let mut parts = Vec::new();
        let mut cursor = Some(cell);
        while let Some(id) = cursor {
            let c = &self.cells[id.0];
            parts.push(c.name.as_str());
            cursor = c.parent;
        }
        parts.reverse();
        parts.join("/")
    }

    pub(crate) fn new_cell(&mut self, parent: CellId, name: &str, behavior: Behavior) -> CellId {
        assert!(
            self.cells[parent.0].behavior.is_composite(),
            "cell '{}' is behavioral and cannot own children",
            self.full_name(parent)
        );
        let id = CellId(self.cells.len());
        self.cells.push(Cell::new(name, Some(parent), behavior));
        self.cells[parent.0].children.push(id);
        id
    }

    // ---- ports --------------------------------------------------------

    /// Declare and bind an input port in one call; the port takes the
    /// signal's width.
    pub fn input(&mut self, cell: CellId, port: &str, signal: SignalId) {
        self.bind_input(cell, port, signal);
    }

    /// Declare and bind an output port in one call, registering `cell` as
    /// the signal's driver.
    pub fn output(&mut self, cell: CellId, port: &str, signal: SignalId) -> Result<(), SimError> {
        self.bind_output(cell, port, signal)
    }

    /// Declare an input port of explicit width, to be bound later with
    /// [`System::connect`]
    pub fn declare_input(&mut self, cell: CellId, port: &str, width: u32) {
        self.declare(cell, port, PortDirection::Input, width);
    }

    /// Declare an output port of explicit width, to be bound later with
    /// [`System::connect`]
    pub fn declare_output(&mut self, cell: CellId, port: &str, width: u32) {
        self.declare(cell, port, PortDirection::Output, width);
    }

    /// Bind a previously declared port to a signal, checking widths. Output
    /// ports additionally claim the driver slot of the signal.
    pub fn connect(&mut self, cell: CellId, port: &str, signal: SignalId) -> Result<(), SimError> {
        let path = self.full_name(cell);
        let (direction, width) = {
            let p = self.cells[cell.0]
                .port(port)
                .unwrap_or_else(|| panic!("cell '{}' has no declared port '{}'", path, port));
            assert!(
                p.signal.is_none(),
                "port '{}.{}' is already connected",
                path,
                port
            );
            (p.direction, p.width)
        };
        self.expect_width(&path, port, signal, width)?;
        if direction == PortDirection::Output {
            self.claim_driver(cell, signal)?;
        }
        self.cells[cell.0]
            .port_mut(port)
            .unwrap_or_else(|| unreachable!())
            .signal = Some(signal);
        Ok(())
    }

    fn declare(&mut self, cell: CellId, port: &str, direction: PortDirection, width: u32) {
        assert!(
            self.cells[cell.0].port(port).is_none(),
            "cell '{}' already declares port '{}'",
            self.full_name(cell),
            port
        );
        self.cells[cell.0].ports.push(Port {
            name: port.to_string(),
            direction,
            width,
            signal: None,
        });
    }

    pub(crate) fn bind_input(&mut self, cell: CellId, port: &str, signal: SignalId) {
        let width = self.signals[signal.0].width;
        self.declare(cell, port, PortDirection::Input, width);
        self.cells[cell.0]
            .port_mut(port)
            .unwrap_or_else(|| unreachable!())
            .signal = Some(signal);
    }

    pub(crate) fn bind_output(
        &mut self,
        cell: CellId,
        port: &str,
        signal: SignalId,
    ) -> Result<(), SimError> {
        self.claim_driver(cell, signal)?;
        let width = self.signals[signal.0].width;
        self.declare(cell, port, PortDirection::Output, width);
        self.cells[cell.0]
            .port_mut(port)
            .unwrap_or_else(|| unreachable!())
            .signal = Some(signal);
        Ok(())
    }

    fn claim_driver(&mut self, cell: CellId, signal: SignalId) -> Result<(), SimError> {
        if let Some(existing) = self.signals[signal.0].driver {
            return Err(SimError::MultipleDrivers {
                signal: self.signals[signal.0].name.clone(),
                driver: self.full_name(existing),
                offender: self.full_name(cell),
            });
        }
        self.signals[signal.0].driver = Some(cell);
        Ok(())
    }

    pub(crate) fn expect_width(
        &self,
        component: &str,
        port: &str,
        signal: SignalId,
        expected: u32,
    ) -> Result<(), SimError> {
        let s = &self.signals[signal.0];
        if s.width == expected {
            Ok(())
        } else {
            Err(SimError::WidthMismatch {
                component: component.to_string(),
                port: port.to_string(),
                signal: s.name.clone(),
                expected,
                found: s.width,
            })
        }
    }

    /// Path a child would get, for error messages raised before the cell
    /// exists
    pub(crate) fn child_path(&self, parent: CellId, name: &str) -> String {
        format!("{}/{}", self.full_name(parent), name)
    }

    /// Elaboration sweep: every declared port must be bound
    pub(crate) fn check_connected(&self) -> Result<(), SimError> {
        for (idx, cell) in self.cells.iter().enumerate() {
            for port in &cell.ports {
                if port.signal.is_none() {
                    return Err(SimError::UnconnectedPort {
                        component: self.full_name(CellId(idx)),
                        port: port.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    // ---- memory blocks ------------------------------------------------

    /// Allocate a zero-filled storage block of `2^addr_width` entries
    pub fn memory(&mut self, name: &str, addr_width: u32, data_width: u32) -> MemId {
        let id = MemId(self.mems.len());
        self.mems.push(MemBlock::new(name, addr_width, data_width));
        id
    }

    pub fn mem(&self, id: MemId) -> &MemBlock {
        &self.mems[id.0]
    }

    pub fn mem_mut(&mut self, id: MemId) -> &mut MemBlock {
        &mut self.mems[id.0]
    }

    /// Bulk-load a memory block from a text file, tolerating failure.
    ///
    /// Load problems are reported through the log and otherwise swallowed:
    /// an unreadable file keeps the current contents, a malformed file
    /// degrades to zero-filled storage. Either way the simulation stays
    /// runnable with default memory contents.
    pub fn load_memory_file(&mut self, mem: MemId, path: &Path, base: u32) {
        let block = &mut self.mems[mem.0];
        match File::open(path) {
            Ok(file) => {
                if let Err(err) = block.load(BufReader::new(file), base) {
                    warn!(
                        "memory '{}': {} (contents reset to zero)",
                        block.name(),
                        err
                    );
                }
            }
            Err(err) => {
                warn!(
                    "memory '{}': cannot open '{}': {} (keeping current contents)",
                    block.name(),
                    path.display(),
                    err
                );
            }
        }
    }

    // ---- scopes -------------------------------------------------------

    /// Register a scope observing `signal`; its history grows by one sample
    /// per completed simulation step.
    pub fn attach_scope(&mut self, signal: SignalId, label: &str) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(label, signal));
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }
}
