//! Sequential standard cells.
//!
//! All cells here follow the two-phase discipline: `compute_next` derives the
//! next state from settled inputs without touching any signal, and `commit`
//! latches and publishes it. The simulator runs every `compute_next` before
//! any `commit`, so no register update is visible to another register within
//! the same step.

use crate::core::components::behavior::{Behavior, EvalContext, Sequential};
use crate::core::errors::SimError;
use crate::core::signal::width_mask;
use crate::core::system::System;
use crate::core::types::{CellId, MemId, SignalId};

/// Level-sensitive register with an enable input.
///
/// When `e` is asserted at commit time the register takes its data input,
/// otherwise it keeps its stored value.
struct RegCell {
    d: SignalId,
    e: SignalId,
    q: SignalId,
    state: u64,
    next: u64,
}

impl Sequential for RegCell {
    fn reset(&mut self, ctx: &mut EvalContext<'_>) {
        self.state = 0;
        self.next = 0;
        ctx.set(self.q, 0);
    }

    fn compute_next(&mut self, ctx: &EvalContext<'_>) {
        self.next = if ctx.get(self.e) != 0 {
            ctx.get(self.d)
        } else {
            self.state
        };
    }

    fn commit(&mut self, ctx: &mut EvalContext<'_>) {
        self.state = self.next;
        ctx.set(self.q, self.state);
    }
}

/// Register with prioritized synchronous set/reset on top of the enable.
///
/// Priority at commit time: reset forces zero, else set forces the
/// configured constant, else the enable decides between load and hold.
struct RegSrCell {
    d: SignalId,
    e: SignalId,
    s: SignalId,
    r: SignalId,
    q: SignalId,
    set_value: u64,
    state: u64,
    next: u64,
}

impl Sequential for RegSrCell {
    fn reset(&mut self, ctx: &mut EvalContext<'_>) {
        self.state = 0;
        self.next = 0;
        ctx.set(self.q, 0);
    }

    fn compute_next(&mut self, ctx: &EvalContext<'_>) {
        self.next = if ctx.get(self.r) != 0 {
            0
        } else if ctx.get(self.s) != 0 {
            self.set_value
        } else if ctx.get(self.e) != 0 {
            ctx.get(self.d)
        } else {
            self.state
        };
    }

    fn commit(&mut self, ctx: &mut EvalContext<'_>) {
        self.state = self.next;
        ctx.set(self.q, self.state);
    }
}

/// Free-running up-counter with synchronous load, a fully custom
/// next-state function rather than a wiring of the standard library.
struct CounterCell {
    sel: SignalId,
    load: SignalId,
    q: SignalId,
    mask: u64,
    state: u64,
    next: u64,
}

impl Sequential for CounterCell {
    fn reset(&mut self, ctx: &mut EvalContext<'_>) {
        self.state = 0;
        self.next = 0;
        ctx.set(self.q, 0);
    }

    fn compute_next(&mut self, ctx: &EvalContext<'_>) {
        self.next = if ctx.get(self.sel) != 0 {
            ctx.get(self.load)
        } else {
            self.state.wrapping_add(1) & self.mask
        };
    }

    fn commit(&mut self, ctx: &mut EvalContext<'_>) {
        self.state = self.next;
        ctx.set(self.q, self.state);
    }
}

/// Synchronous write port into a shared memory block.
///
/// The write captured while the network was settled lands in the block at
/// commit time, so a combinational read port observes it from the next
/// settle on. Paired with [`System::mem_read`] this composes a RAM.
struct MemWriteCell {
    mem: MemId,
    we: SignalId,
    addr: SignalId,
    din: SignalId,
    pending: Option<(u64, u64)>,
}

impl Sequential for MemWriteCell {
    fn reset(&mut self, _ctx: &mut EvalContext<'_>) {
        self.pending = None;
    }

    fn compute_next(&mut self, ctx: &EvalContext<'_>) {
        self.pending = if ctx.get(self.we) != 0 {
            Some((ctx.get(self.addr), ctx.get(self.din)))
        } else {
            None
        };
    }

    fn commit(&mut self, ctx: &mut EvalContext<'_>) {
        if let Some((addr, value)) = self.pending.take() {
            // the address wire is width-matched to the block, so it is in range
            ctx.mem_mut(self.mem).set(addr, value);
        }
    }
}

impl System {
    /// Register with enable: `q` latches `d` on steps where `e` is asserted
    pub fn reg(
        &mut self,
        parent: CellId,
        name: &str,
        d: SignalId,
        e: SignalId,
        q: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        let w = self.signal(q).width();
        self.expect_width(&path, "d", d, w)?;
        self.expect_width(&path, "e", e, 1)?;
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Sequential(Box::new(RegCell {
                d,
                e,
                q,
                state: 0,
                next: 0,
            })),
        );
        self.bind_input(cell, "d", d);
        self.bind_input(cell, "e", e);
        self.bind_output(cell, "q", q)?;
        Ok(cell)
    }

    /// Register with enable plus prioritized synchronous set/reset. `s`
    /// forces `set_value`, `r` forces zero and wins over `s`; the set value
    /// must fit the register width.
    #[allow(clippy::too_many_arguments)]
    pub fn reg_sr(
        &mut self,
        parent: CellId,
        name: &str,
        d: SignalId,
        e: SignalId,
        q: SignalId,
        s: SignalId,
        r: SignalId,
        set_value: u64,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        let w = self.signal(q).width();
        self.expect_width(&path, "d", d, w)?;
        self.expect_width(&path, "e", e, 1)?;
        self.expect_width(&path, "s", s, 1)?;
        self.expect_width(&path, "r", r, 1)?;
        if set_value & !width_mask(w) != 0 {
            // the configured constant could never be represented by q
            return Err(SimError::WidthMismatch {
                component: path,
                port: "q".to_string(),
                signal: self.signal(q).name().to_string(),
                expected: 64 - set_value.leading_zeros(),
                found: w,
            });
        }
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Sequential(Box::new(RegSrCell {
                d,
                e,
                s,
                r,
                q,
                set_value,
                state: 0,
                next: 0,
            })),
        );
        self.bind_input(cell, "d", d);
        self.bind_input(cell, "e", e);
        self.bind_input(cell, "s", s);
        self.bind_input(cell, "r", r);
        self.bind_output(cell, "q", q)?;
        Ok(cell)
    }

    /// Up-counter with synchronous load: counts every step while `sel` is
    /// deasserted, reloads from `load` while asserted.
    pub fn counter(
        &mut self,
        parent: CellId,
        name: &str,
        sel: SignalId,
        load: SignalId,
        q: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        let w = self.signal(q).width();
        self.expect_width(&path, "sel", sel, 1)?;
        self.expect_width(&path, "load", load, w)?;
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Sequential(Box::new(CounterCell {
                sel,
                load,
                q,
                mask: width_mask(w),
                state: 0,
                next: 0,
            })),
        );
        self.bind_input(cell, "sel", sel);
        self.bind_input(cell, "load", load);
        self.bind_output(cell, "q", q)?;
        Ok(cell)
    }

    /// Synchronous write port into a memory block: on steps where `we` is
    /// asserted, `mem[addr] <= din` at commit time.
    pub fn mem_write(
        &mut self,
        parent: CellId,
        name: &str,
        mem: MemId,
        we: SignalId,
        addr: SignalId,
        din: SignalId,
    ) -> Result<CellId, SimError> {
        let path = self.child_path(parent, name);
        self.expect_width(&path, "we", we, 1)?;
        self.expect_width(&path, "addr", addr, self.mem(mem).addr_width())?;
        self.expect_width(&path, "din", din, self.mem(mem).data_width())?;
        let cell = self.new_cell(
            parent,
            name,
            Behavior::Sequential(Box::new(MemWriteCell {
                mem,
                we,
                addr,
                din,
                pending: None,
            })),
        );
        self.bind_input(cell, "we", we);
        self.bind_input(cell, "addr", addr);
        self.bind_input(cell, "din", din);
        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::errors::SimError;
    use crate::core::execution::simulator::Simulator;
    use crate::core::system::{System, ROOT};

    #[test]
    fn reg_holds_unless_enabled() {
        let mut sys = System::new("top");
        let d = sys.wire(ROOT, "d", 8);
        let e = sys.wire1(ROOT, "e");
        let q = sys.wire(ROOT, "q", 8);
        sys.reg(ROOT, "reg", d, e, q).unwrap();

        let mut sim = Simulator::new(sys).unwrap();
        sim.put(d, 55).unwrap();
        sim.put(e, 0).unwrap();
        sim.step(1).unwrap();
        assert_eq!(sim.get(q), 0);

        sim.put(e, 1).unwrap();
        sim.step(1).unwrap();
        assert_eq!(sim.get(q), 55);

        sim.put(d, 77).unwrap();
        sim.put(e, 0).unwrap();
        sim.step(1).unwrap();
        assert_eq!(sim.get(q), 55);
    }

    #[test]
    fn reg_sr_set_value_must_fit() {
        let mut sys = System::new("top");
        let d = sys.wire(ROOT, "d", 4);
        let e = sys.wire1(ROOT, "e");
        let q = sys.wire(ROOT, "q", 4);
        let s = sys.wire1(ROOT, "s");
        let r = sys.wire1(ROOT, "r");
        let err = sys.reg_sr(ROOT, "reg", d, e, q, s, r, 0x1F).unwrap_err();
        assert!(matches!(err, SimError::WidthMismatch { .. }));
    }

    #[test]
    fn counter_counts_and_loads() {
        let mut sys = System::new("top");
        let sel = sys.wire1(ROOT, "sel");
        let load = sys.wire(ROOT, "load", 4);
        let q = sys.wire(ROOT, "q", 4);
        sys.counter(ROOT, "counter", sel, load, q).unwrap();

        let mut sim = Simulator::new(sys).unwrap();
        sim.step(3).unwrap();
        assert_eq!(sim.get(q), 3);

        sim.put(sel, 1).unwrap();
        sim.put(load, 5).unwrap();
        sim.step(1).unwrap();
        assert_eq!(sim.get(q), 5);

        sim.put(sel, 0).unwrap();
        sim.step(2).unwrap();
        assert_eq!(sim.get(q), 7);
    }

    #[test]
    fn counter_wraps_at_width() {
        let mut sys = System::new("top");
        let sel = sys.wire1(ROOT, "sel");
        let load = sys.wire(ROOT, "load", 2);
        let q = sys.wire(ROOT, "q", 2);
        sys.counter(ROOT, "counter", sel, load, q).unwrap();

        let mut sim = Simulator::new(sys).unwrap();
        sim.step(4).unwrap();
        assert_eq!(sim.get(q), 0);
    }

    #[test]
    fn mem_write_lands_after_commit() {
        let mut sys = System::new("top");
        let mem = sys.memory("ram", 2, 8);
        let we = sys.wire1(ROOT, "we");
        let addr = sys.wire(ROOT, "addr", 2);
        let din = sys.wire(ROOT, "din", 8);
        let dout = sys.wire(ROOT, "dout", 8);
        sys.mem_write(ROOT, "wport", mem, we, addr, din).unwrap();
        sys.mem_read(ROOT, "rport", mem, addr, dout).unwrap();

        let mut sim = Simulator::new(sys).unwrap();
        sim.put(we, 1).unwrap();
        sim.put(addr, 2).unwrap();
        sim.put(din, 99).unwrap();
        sim.step(1).unwrap();
        assert_eq!(sim.get(dout), 99);
        assert_eq!(sim.mem_read(mem, 2).unwrap(), 99);

        // deasserted write enable leaves the block alone
        sim.put(we, 0).unwrap();
        sim.put(din, 11).unwrap();
        sim.step(1).unwrap();
        assert_eq!(sim.mem_read(mem, 2).unwrap(), 99);
    }
}
