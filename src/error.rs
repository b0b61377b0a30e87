/// Errors returned while probing or reading the cached CPUID state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Leaf 0 could not be read, so there is no baseline to build the leaf table from.
    #[error("CPUID leaf 0 is unavailable, registers were not loaded")]
    Initialization,
    /// An integer register selector outside of `0..=3` (A, B, C, D).
    #[error("invalid register selector {0}, expected 0 (A), 1 (B), 2 (C) or 3 (D)")]
    InvalidRegister(u32),
    /// A leaf index past the end of the cached leaf table.
    #[error("leaf {leaf:#x} is out of range, only {leaf_count} leaves were cached")]
    OutOfRange { leaf: u32, leaf_count: usize },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
