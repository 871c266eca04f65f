//! Adder/incrementer chain feeding a less-or-equal comparator.
//!
//! Run with `RUST_LOG=debug` to watch the per-step engine log.

use gatesim::{CellId, SimError, SignalId, Simulator, System, ROOT};

/// `r = a + b` when `sel` is asserted, `r = a + 1` otherwise
fn sum_inc(
    sys: &mut System,
    parent: CellId,
    name: &str,
    a: SignalId,
    b: SignalId,
    sel: SignalId,
    r: SignalId,
) -> Result<CellId, SimError> {
    let block = sys.composite(parent, name);
    let w = sys.signal(b).width();
    let one = sys.wire(block, "one", w);
    let mux_out = sys.wire(block, "mux_out", w);
    sys.constant(block, "one", 1, one)?;
    sys.mux2(block, "mux", sel, one, b, mux_out)?;
    sys.add(block, "add", a, mux_out, r)?;
    Ok(block)
}

fn main() -> Result<(), SimError> {
    env_logger::init();

    let mut sys = System::new("top");
    let a = sys.wire(ROOT, "a", 32);
    let b = sys.wire(ROOT, "b", 32);
    let c = sys.wire(ROOT, "c", 32);
    let d = sys.wire(ROOT, "d", 32);
    let r1 = sys.wire(ROOT, "r1", 32);
    let r2 = sys.wire(ROOT, "r2", 32);
    let leq = sys.wire1(ROOT, "leq");
    let sel1 = sys.wire1(ROOT, "sel1");
    let sel2 = sys.wire1(ROOT, "sel2");

    sum_inc(&mut sys, ROOT, "sum", a, b, sel1, r1)?;
    sum_inc(&mut sys, ROOT, "inc", r1, c, sel2, r2)?;

    let cmp = sys.composite(ROOT, "cmp");
    let gt = sys.wire1(cmp, "gt");
    let eq = sys.wire1(cmp, "eq");
    let lt = sys.wire1(cmp, "lt");
    sys.comparator(cmp, "cmp", r2, d, gt, eq, lt)?;
    sys.or(cmp, "or", eq, lt, leq)?;

    sys.constant(ROOT, "a", 10, a)?;
    sys.constant(ROOT, "b", 20, b)?;
    sys.constant(ROOT, "c", 5, c)?;
    sys.constant(ROOT, "d", 31, d)?;
    sys.constant(ROOT, "sel1", 1, sel1)?;
    sys.constant(ROOT, "sel2", 0, sel2)?;

    let r2_scope = sys.attach_scope(r2, "r2");
    let leq_scope = sys.attach_scope(leq, "r2 <= d");

    let mut sim = Simulator::new(sys)?;
    sim.step(1)?;

    println!("r1  = {}", sim.get(r1));
    println!("r2  = {}", sim.get(r2));
    println!("leq = {}", sim.get(leq));
    for scope in [r2_scope, leq_scope] {
        println!("history: {:?}", sim.history(scope));
    }
    Ok(())
}
