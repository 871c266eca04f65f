//! Free-running counter with synchronous load, driven for twenty steps with
//! a reload in the middle.

use gatesim::{SimError, Simulator, System, ROOT};

fn main() -> Result<(), SimError> {
    env_logger::init();

    let mut sys = System::new("top");
    let sel = sys.wire1(ROOT, "sel");
    let load = sys.wire(ROOT, "load", 4);
    let out = sys.wire(ROOT, "out", 4);
    sys.counter(ROOT, "sequencer", sel, load, out)?;
    let scope = sys.attach_scope(out, "out");

    let mut sim = Simulator::new(sys)?;
    for i in 0..20 {
        if i == 10 {
            sim.put(load, 5)?;
            sim.put(sel, 1)?;
        } else if i == 11 {
            sim.put(sel, 0)?;
        }
        sim.step(1)?;
        println!("step {:2}: out = {}", sim.current_step(), sim.get(out));
    }

    println!("history: {:?}", sim.history(scope));
    Ok(())
}
