//! # cpu_identity
//!
//! Reads the standard CPUID leaves of the executing x86 core once, caches their
//! registers and exposes the vendor identification string, for callers that pick code
//! paths at runtime.
//!
//! ```no_run
//! use cpu_identity::{ProcessorIdentity, Register};
//!
//! let id = ProcessorIdentity::new()?;
//! println!("{} reports {} standard leaves", id.vendor(), id.leaf_count());
//! let features = id.leaf_register(1, Register::C)?;
//! println!("leaf 1 ecx = {}", features);
//! # Ok::<(), cpu_identity::Error>(())
//! ```

// Indexing a slice can cause panics. Use .get and return an error instead
#![warn(clippy::indexing_slicing)]
// This is usually a serious issue - a missing import of a define where it is interpreted
// as a catch-all variable in a match, for example
#![deny(unreachable_patterns)]
// Ensure that all must_use results are used
#![deny(unused_must_use)]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
extern crate bitfield;

#[macro_use]
extern crate bitflags;

/// Architecture-dependent CPUID access
#[cfg(feature = "native")]
mod arch;

/// Error type
pub mod error;

/// Leaf table and current registers
pub mod identity;

/// Register selectors and values
pub mod register;

/// Vendor identification string
pub mod vendor;

pub use crate::error::{Error, Result};
pub use crate::identity::{ProbeConfig, ProcessorIdentity, DEFAULT_LEAF_LIMIT};
pub use crate::register::{Register, RegisterQuadruple, RegisterValue, Registers};
pub use crate::vendor::{KnownVendor, VendorIdentity};
