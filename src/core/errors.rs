use thiserror::Error;

/// Error surface of the simulation substrate.
///
/// Construction errors (`WidthMismatch`, `UnconnectedPort`, `MultipleDrivers`)
/// are returned eagerly while the circuit is being described and make the
/// system unusable until fixed. Runtime errors abort the failing step but
/// leave previously committed register state intact. `ContentLoad` is the one
/// recoverable category: a failed bulk load degrades to zero-filled storage.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("width mismatch on '{component}.{port}': expected {expected} bit(s), signal '{signal}' has {found}")]
    WidthMismatch {
        component: String,
        port: String,
        signal: String,
        expected: u32,
        found: u32,
    },

    #[error("port '{component}.{port}' was declared but never connected")]
    UnconnectedPort { component: String, port: String },

    #[error("signal '{signal}' is already driven by '{driver}', '{offender}' cannot drive it as well")]
    MultipleDrivers {
        signal: String,
        driver: String,
        offender: String,
    },

    #[error("signal '{signal}' is driven by '{driver}' and cannot be written from outside the simulation")]
    IllegalExternalWrite { signal: String, driver: String },

    #[error("combinational cycle among {0:?}")]
    CombinationalCycle(Vec<String>),

    #[error("address {address:#x} out of range for memory '{memory}' (depth {depth})")]
    AddressOutOfRange {
        memory: String,
        address: u64,
        depth: usize,
    },

    #[error("memory content load failed: {reason}")]
    ContentLoad { reason: String },
}
