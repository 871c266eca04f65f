//! Combinational standard cells.
//!
//! Each constructor validates widths against the output signal, registers the
//! cell under its parent and binds the ports in declaration order. All cells
//! are pure functions of their input signal values.

use crate::core::components::behavior::{Behavior, Combinational, EvalContext};
use crate::core::errors::SimError;
use crate::core::system::System;
use crate::core::types::{CellId, MemId, SignalId};

/// Bitwise binary operator selector shared by the two-input gates
#[derive(Debug, Clone, Copy)]
enum BitOp {
    And,
    Or,
    Xor,
    Nand,
}

struct ConstantCell {
    value: u64,
    r: SignalId,
}

impl Combinational for ConstantCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        ctx.set(self.r, self.value);
    }
}

struct NotCell {
    a: SignalId,
    r: SignalId,
}

impl Combinational for NotCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        let a = ctx.get(self.a);
        ctx.set(self.r, !a);
    }
}

struct GateCell {
    op: BitOp,
    a: SignalId,
    b: SignalId,
    r: SignalId,
}

impl Combinational for GateCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        let a = ctx.get(self.a);
        let b = ctx.get(self.b);
        let r = match self.op {
            BitOp::And => a & b,
            BitOp::Or => a | b,
            BitOp::Xor => a ^ b,
            BitOp::Nand => !(a & b),
        };
        ctx.set(self.r, r);
    }
}

struct AddCell {
    a: SignalId,
    b: SignalId,
    r: SignalId,
}

impl Combinational for AddCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        let sum = ctx.get(self.a).wrapping_add(ctx.get(self.b));
        ctx.set(self.r, sum);
    }
}

struct SubCell {
    a: SignalId,
    b: SignalId,
    r: SignalId,
}

impl Combinational for SubCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        let diff = ctx.get(self.a).wrapping_sub(ctx.get(self.b));
        ctx.set(self.r, diff);
    }
}

struct EqualCell {
    a: SignalId,
    constant: u64,
    r: SignalId,
}

impl Combinational for EqualCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        ctx.set(self.r, u64::from(ctx.get(self.a) == self.constant));
    }
}

struct ComparatorCell {
    a: SignalId,
    b: SignalId,
    gt: SignalId,
    eq: SignalId,
    lt: SignalId,
}

impl Combinational for ComparatorCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        let a = ctx.get(self.a);
        let b = ctx.get(self.b);
        ctx.set(self.gt, u64::from(a > b));
        ctx.set(self.eq, u64::from(a == b));
        ctx.set(self.lt, u64::from(a < b));
    }
}

struct MuxCell {
    sel: SignalId,
    inputs: Vec<SignalId>,
    r: SignalId,
}

impl Combinational for MuxCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        // sel is width-matched to the input count, so it cannot index out
        let chosen = self.inputs[ctx.get(self.sel) as usize];
        let v = ctx.get(chosen);
        ctx.set(self.r, v);
    }
}

struct BitCell {
    a: SignalId,
    index: u32,
    r: SignalId,
}

impl Combinational for BitCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        ctx.set(self.r, (ctx.get(self.a) >> self.index) & 1);
    }
}

struct PackCell {
    parts: Vec<SignalId>,
    r: SignalId,
}

impl Combinational for PackCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        let mut packed = 0u64;
        let mut shift = 0u32;
        for &part in &self.parts {
            packed |= ctx.get(part) << shift;
            shift += ctx.width(part);
        }
        ctx.set(self.r, packed);
    }
}

struct UnpackCell {
    a: SignalId,
    parts: Vec<SignalId>,
}

impl Combinational for UnpackCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        let mut shift = 0u32;
        for i in 0..self.parts.len() {
            let part = self.parts[i];
            let v = ctx.get(self.a) >> shift;
            shift += ctx.width(part);
            ctx.set(part, v);
        }
    }
}

struct MemReadCell {
    mem: MemId,
    addr: SignalId,
    data: SignalId,
}

impl Combinational for MemReadCell {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) {
        // the address wire is width-matched to the block, so it is in range
        let v = ctx.mem(self.mem).get(ctx.get(self.addr));
        ctx.set(self.data, v);
    }
}

impl System {
    /// Constant source driving `r` with `value` (masked to the wire width)
    pub fn constant(
        &mut self,
        parent: CellId,
        name: &str,
        value: u64,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Combinational(Box::new(ConstantCell { value, r })),
        );
        self.bind_output(cell, "r", r)?;
        Ok(cell)
    }

    /// Bitwise complement, `r = !a`
    pub fn not(
        &mut self,
        parent: CellId,
        name: &str,
        a: SignalId,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        let w = self.signal(r).width();
        self.expect_width(&path, "a", a, w)?;
        let cell = self.new_cell(parent, name, Behavior::Combinational(Box::new(NotCell { a, r })));
        self.bind_input(cell, "a", a);
        self.bind_output(cell, "r", r)?;
        Ok(cell)
    }

    /// `r = a & b`
    pub fn and(
        &mut self,
        parent: CellId,
        name: &str,
        a: SignalId,
        b: SignalId,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        self.gate(parent, name, BitOp::And, a, b, r)
    }

    /// `r = a | b`
    pub fn or(
        &mut self,
        parent: CellId,
        name: &str,
        a: SignalId,
        b: SignalId,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        self.gate(parent, name, BitOp::Or, a, b, r)
    }

    /// `r = a ^ b`
    pub fn xor(
        &mut self,
        parent: CellId,
        name: &str,
        a: SignalId,
        b: SignalId,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        self.gate(parent, name, BitOp::Xor, a, b, r)
    }

    /// `r = !(a & b)`
    pub fn nand(
        &mut self,
        parent: CellId,
        name: &str,
        a: SignalId,
        b: SignalId,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        self.gate(parent, name, BitOp::Nand, a, b, r)
    }

    fn gate(
        &mut self,
        parent: CellId,
        name: &str,
        op: BitOp,
        a: SignalId,
        b: SignalId,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        let w = self.signal(r).width();
        self.expect_width(&path, "a", a, w)?;
        self.expect_width(&path, "b", b, w)?;
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Combinational(Box::new(GateCell { op, a, b, r })),
        );
        self.bind_input(cell, "a", a);
        self.bind_input(cell, "b", b);
        self.bind_output(cell, "r", r)?;
        Ok(cell)
    }

    /// Adder wrapping at the output width, `r = (a + b) mod 2^w`
    pub fn add(
        &mut self,
        parent: CellId,
        name: &str,
        a: SignalId,
        b: SignalId,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        let w = self.signal(r).width();
        self.expect_width(&path, "a", a, w)?;
        self.expect_width(&path, "b", b, w)?;
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Combinational(Box::new(AddCell { a, b, r })),
        );
        self.bind_input(cell, "a", a);
        self.bind_input(cell, "b", b);
        self.bind_output(cell, "r", r)?;
        Ok(cell)
    }

    /// Subtractor wrapping at the output width, `r = (a - b) mod 2^w`
    pub fn sub(
        &mut self,
        parent: CellId,
        name: &str,
        a: SignalId,
        b: SignalId,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        let w = self.signal(r).width();
        self.expect_width(&path, "a", a, w)?;
        self.expect_width(&path, "b", b, w)?;
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Combinational(Box::new(SubCell { a, b, r })),
        );
        self.bind_input(cell, "a", a);
        self.bind_input(cell, "b", b);
        self.bind_output(cell, "r", r)?;
        Ok(cell)
    }

    /// Single-bit equality against a constant, `r = (a == constant)`
    pub fn equal(
        &mut self,
        parent: CellId,
        name: &str,
        a: SignalId,
        constant: u64,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        self.expect_width(&path, "r", r, 1)?;
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Combinational(Box::new(EqualCell { a, constant, r })),
        );
        self.bind_input(cell, "a", a);
        self.bind_output(cell, "r", r)?;
        Ok(cell)
    }

    /// Magnitude comparator with three single-bit outputs: `gt`, `eq`, `lt`
    #[allow(clippy::too_many_arguments)]
    pub fn comparator(
        &mut self,
        parent: CellId,
        name: &str,
        a: SignalId,
        b: SignalId,
        gt: SignalId,
        eq: SignalId,
        lt: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        let w = self.signal(a).width();
        self.expect_width(&path, "b", b, w)?;
        self.expect_width(&path, "gt", gt, 1)?;
        self.expect_width(&path, "eq", eq, 1)?;
        self.expect_width(&path, "lt", lt, 1)?;
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Combinational(Box::new(ComparatorCell { a, b, gt, eq, lt })),
        );
        self.bind_input(cell, "a", a);
        self.bind_input(cell, "b", b);
        self.bind_output(cell, "gt", gt)?;
        self.bind_output(cell, "eq", eq)?;
        self.bind_output(cell, "lt", lt)?;
        Ok(cell)
    }

    /// Two-way multiplexer, `r = if sel { d1 } else { d0 }`
    pub fn mux2(
        &mut self,
        parent: CellId,
        name: &str,
        sel: SignalId,
        d0: SignalId,
        d1: SignalId,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        self.mux(parent, name, sel, &[d0, d1], r)
    }

    /// N-way multiplexer. The select wire chooses one of `inputs`, and N
    /// must be exactly `2^select-width`.
    pub fn mux(
        &mut self,
        parent: CellId,
        name: &str,
        sel: SignalId,
        inputs: &[SignalId],
        r: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        let sel_width = self.signal(sel).width();
        if inputs.len() != 1usize << sel_width {
            let needed = inputs.len().next_power_of_two().trailing_zeros().max(1);
            return Err(SimError::WidthMismatch {
                component: path,
                port: "sel".to_string(),
                signal: self.signal(sel).name().to_string(),
                expected: needed,
                found: sel_width,
            });
        }
        let w = self.signal(r).width();
        for (i, &input) in inputs.iter().enumerate() {
            self.expect_width(&path, &format!("d{i}"), input, w)?;
        }
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Combinational(Box::new(MuxCell {
                sel,
                inputs: inputs.to_vec(),
                r,
            })),
        );
        self.bind_input(cell, "sel", sel);
        for (i, &input) in inputs.iter().enumerate() {
            self.bind_input(cell, &format!("d{i}"), input);
        }
        self.bind_output(cell, "r", r)?;
        Ok(cell)
    }

    /// Extract bit `index` of `a` onto the single-bit wire `r`
    pub fn bit(
        &mut self,
        parent: CellId,
        name: &str,
        a: SignalId,
        index: u32,
        r: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        self.expect_width(&path, "r", r, 1)?;
        if index >= self.signal(a).width() {
            return Err(SimError::WidthMismatch {
                component: path,
                port: "a".to_string(),
                signal: self.signal(a).name().to_string(),
                expected: index + 1,
                found: self.signal(a).width(),
            });
        }
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Combinational(Box::new(BitCell { a, index, r })),
        );
        self.bind_input(cell, "a", a);
        self.bind_output(cell, "r", r)?;
        Ok(cell)
    }

    /// Concatenate `parts` lsb-first onto `r`; part widths must sum to the
    /// output width.
    pub fn pack(
        &mut self,
        parent: CellId,
        name: &str,
        parts: &[SignalId],
        r: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        let total: u32 = parts.iter().map(|&p| self.signal(p).width()).sum();
        self.expect_width(&path, "r", r, total)?;
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Combinational(Box::new(PackCell {
                parts: parts.to_vec(),
                r,
            })),
        );
        for (i, &part) in parts.iter().enumerate() {
            self.bind_input(cell, &format!("d{i}"), part);
        }
        self.bind_output(cell, "r", r)?;
        Ok(cell)
    }

    /// Split `a` lsb-first into `parts`; part widths must sum to the input
    /// width.
    pub fn unpack(
        &mut self,
        parent: CellId,
        name: &str,
        a: SignalId,
        parts: &[SignalId],
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        let total: u32 = parts.iter().map(|&p| self.signal(p).width()).sum();
        self.expect_width(&path, "a", a, total)?;
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Combinational(Box::new(UnpackCell {
                a,
                parts: parts.to_vec(),
            })),
        );
        self.bind_input(cell, "a", a);
        for (i, &part) in parts.iter().enumerate() {
            self.bind_output(cell, &format!("q{i}"), part)?;
        }
        Ok(cell)
    }

    /// Combinational read port over a memory block: `data = mem[addr]`.
    /// The address wire must match the block's address width and the data
    /// wire its data width.
    pub fn mem_read(
        &mut self,
        parent: CellId,
        name: &str,
        mem: MemId,
        addr: SignalId,
        data: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        self.expect_width(&path, "addr", addr, self.mem(mem).addr_width())?;
        self.expect_width(&path, "data", data, self.mem(mem).data_width())?;
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Combinational(Box::new(MemReadCell { mem, addr, data })),
        );
        self.bind_input(cell, "addr", addr);
        self.bind_output(cell, "data", data)?;
        Ok(cell)
    }
}
