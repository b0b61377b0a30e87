//! Cached CPUID leaf table of the executing core.

use alloc::vec::Vec;
use core::fmt;

use raw_cpuid::CpuIdResult;

use crate::error::{Error, Result};
use crate::register::{Register, RegisterQuadruple, RegisterValue, Registers};
use crate::vendor::VendorIdentity;

/// Upper bound on the highest standard leaf probed by default.
///
/// Real processors report a maximum standard leaf well below this; a larger value means
/// the CPUID source is broken.
pub const DEFAULT_LEAF_LIMIT: u32 = 0xFF;

/// Knobs for [`ProcessorIdentity`] construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Highest leaf index that will be probed, regardless of what leaf 0 reports.
    pub leaf_limit: u32,
}

impl ProbeConfig {
    pub const fn new() -> Self {
        Self { leaf_limit: DEFAULT_LEAF_LIMIT }
    }

    pub const fn leaf_limit(mut self, leaf_limit: u32) -> Self {
        self.leaf_limit = leaf_limit;
        self
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard CPUID leaves of one processor, read once at construction.
///
/// Alongside the leaf table it keeps a set of "current" registers, seeded from leaf 0,
/// which callers may override with [`set_register`](Self::set_register) to stage values
/// for comparison without touching the table.
#[derive(Clone)]
pub struct ProcessorIdentity {
    leaves: Vec<RegisterQuadruple>,
    current: [RegisterValue; 4],
    vendor: VendorIdentity,
}

impl ProcessorIdentity {
    /// Probes the executing core.
    #[cfg(all(feature = "native", any(target_arch = "x86", target_arch = "x86_64")))]
    pub fn new() -> Result<Self> {
        Self::with_config(ProbeConfig::default())
    }

    #[cfg(all(feature = "native", any(target_arch = "x86", target_arch = "x86_64")))]
    pub fn with_config(config: ProbeConfig) -> Result<Self> {
        Self::with_cpuid_fn_and_config(crate::arch::x86_shared::cpuid::cpuid_count, config)
    }

    /// Builds the table from `cpuid_fn(leaf, subleaf)` instead of the CPUID instruction.
    pub fn with_cpuid_fn<F>(cpuid_fn: F) -> Result<Self>
    where
        F: FnMut(u32, u32) -> CpuIdResult,
    {
        Self::with_cpuid_fn_and_config(cpuid_fn, ProbeConfig::default())
    }

    pub fn with_cpuid_fn_and_config<F>(mut cpuid_fn: F, config: ProbeConfig) -> Result<Self>
    where
        F: FnMut(u32, u32) -> CpuIdResult,
    {
        let baseline = RegisterQuadruple::from(cpuid_fn(0, 0));
        if baseline.is_zero() {
            log::warn!("CPUID leaf 0 returned no data");
            return Err(Error::Initialization);
        }

        let reported_max = baseline.eax();
        let max_leaf = if reported_max > config.leaf_limit {
            log::warn!(
                "CPUID reports max leaf {:#x}, only probing up to {:#x}",
                reported_max,
                config.leaf_limit
            );
            config.leaf_limit
        } else {
            reported_max
        };

        let mut leaves = Vec::with_capacity(max_leaf.min(DEFAULT_LEAF_LIMIT) as usize + 1);
        leaves.push(baseline);
        for leaf in 1..=max_leaf {
            let quad = RegisterQuadruple::from(cpuid_fn(leaf, 0));
            log::trace!(
                "CPUID {:#04x}: eax={:#010x} ebx={:#010x} ecx={:#010x} edx={:#010x}",
                leaf,
                quad.eax(),
                quad.ebx(),
                quad.ecx(),
                quad.edx()
            );
            leaves.push(quad);
        }

        let Some(&first) = leaves.first() else {
            return Err(Error::Initialization);
        };

        let vendor = VendorIdentity::from_registers(first.ebx(), first.edx(), first.ecx());
        log::debug!("CPUID vendor {:?}, {} standard leaves cached", vendor.as_str(), leaves.len());

        Ok(Self {
            leaves,
            current: Register::ALL.map(|reg| first.get(reg)),
            vendor,
        })
    }

    /// Current value of `which`.
    pub fn register(&self, which: Register) -> RegisterValue {
        self.current[which.index()]
    }

    /// Current value of the register named by an integer selector (0 = A .. 3 = D).
    pub fn register_by_index(&self, which: u32) -> Result<RegisterValue> {
        Register::try_from(which).map(|reg| self.register(reg))
    }

    /// Cached value of `which` in `leaf`.
    pub fn leaf_register(&self, leaf: u32, which: Register) -> Result<RegisterValue> {
        self.leaf(leaf).map(|quad| quad.get(which))
    }

    /// Overrides the current value of `which`. The leaf table is left as is.
    pub fn set_register(&mut self, which: Register, value: impl Into<RegisterValue>) {
        self.current[which.index()] = value.into();
    }

    /// Restores every current register to its leaf 0 value.
    pub fn reset_registers(&mut self) {
        if let Some(first) = self.leaves.first() {
            self.current = Register::ALL.map(|reg| first.get(reg));
        }
    }

    /// Registers whose current value differs from leaf 0.
    pub fn overridden(&self) -> Registers {
        let Some(first) = self.leaves.first() else {
            return Registers::empty();
        };
        Register::ALL
            .into_iter()
            .filter(|&reg| self.register(reg) != first.get(reg))
            .fold(Registers::empty(), |set, reg| set | reg.flag())
    }

    pub fn vendor(&self) -> &VendorIdentity {
        &self.vendor
    }

    pub fn is_loaded(&self) -> bool {
        !self.leaves.is_empty()
    }

    /// Number of cached leaves, one more than [`max_leaf`](Self::max_leaf).
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Highest cached leaf index.
    pub fn max_leaf(&self) -> u32 {
        // The table is never empty and is bounded by a u32 leaf limit.
        self.leaves.len().saturating_sub(1) as u32
    }

    pub fn leaf(&self, leaf: u32) -> Result<RegisterQuadruple> {
        usize::try_from(leaf)
            .ok()
            .and_then(|index| self.leaves.get(index))
            .copied()
            .ok_or(Error::OutOfRange {
                leaf,
                leaf_count: self.leaves.len(),
            })
    }

    /// Cached leaves paired with their index.
    pub fn leaves(&self) -> impl Iterator<Item = (u32, &RegisterQuadruple)> + '_ {
        (0u32..).zip(self.leaves.iter())
    }
}

impl fmt::Debug for ProcessorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorIdentity")
            .field("vendor", &self.vendor)
            .field("leaf_count", &self.leaves.len())
            .field("current", &self.current)
            .finish()
    }
}

impl fmt::Display for ProcessorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vendor: {} ({})", self.vendor, self.vendor.known())?;
        write!(f, "Max standard leaf: {:#x}", self.max_leaf())?;
        for (leaf, quad) in self.leaves() {
            write!(
                f,
                "\n  {:#04x}: eax={:#010x} ebx={:#010x} ecx={:#010x} edx={:#010x}",
                leaf,
                quad.eax(),
                quad.ebx(),
                quad.ecx(),
                quad.edx()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::KnownVendor;
    use std::cell::Cell;

    const INTEL_LEAF0_EBX: u32 = 0x756e_6547;
    const INTEL_LEAF0_EDX: u32 = 0x4965_6e69;
    const INTEL_LEAF0_ECX: u32 = 0x6c65_746e;

    fn result(eax: u32, ebx: u32, ecx: u32, edx: u32) -> CpuIdResult {
        CpuIdResult { eax, ebx, ecx, edx }
    }

    /// An Intel part reporting leaves 0..=max_leaf, where leaf N > 0 reads as (N, N+1, N+2, N+3).
    fn fake_intel(max_leaf: u32) -> impl FnMut(u32, u32) -> CpuIdResult {
        move |leaf, _| match leaf {
            0 => result(max_leaf, INTEL_LEAF0_EBX, INTEL_LEAF0_ECX, INTEL_LEAF0_EDX),
            n if n <= max_leaf => result(n, n + 1, n + 2, n + 3),
            _ => result(0, 0, 0, 0),
        }
    }

    #[test]
    fn single_leaf_intel() {
        let id = ProcessorIdentity::with_cpuid_fn(fake_intel(0)).unwrap();
        assert_eq!(id.vendor().as_str(), "GenuineIntel");
        assert_eq!(id.vendor().known(), KnownVendor::Intel);
        assert_eq!(id.leaf_count(), 1);
        assert_eq!(id.max_leaf(), 0);
        assert!(id.is_loaded());
    }

    #[test]
    fn probes_closed_leaf_range() {
        let calls = Cell::new(0u32);
        let mut inner = fake_intel(0x16);
        let id = ProcessorIdentity::with_cpuid_fn(|leaf, subleaf| {
            calls.set(calls.get() + 1);
            assert_eq!(subleaf, 0);
            inner(leaf, subleaf)
        })
        .unwrap();

        assert_eq!(id.leaf_count(), 0x17);
        assert_eq!(id.max_leaf(), 0x16);
        assert_eq!(calls.get(), 0x17);

        for (leaf, quad) in id.leaves().skip(1) {
            assert_eq!(*quad, RegisterQuadruple::new(leaf, leaf + 1, leaf + 2, leaf + 3));
        }
    }

    #[test]
    fn current_registers_seeded_from_leaf_zero() {
        let id = ProcessorIdentity::with_cpuid_fn(fake_intel(4)).unwrap();
        for reg in Register::ALL {
            assert_eq!(id.register(reg), id.leaf_register(0, reg).unwrap());
        }
        assert_eq!(id.register(Register::A).get(), 4);
        assert_eq!(id.register(Register::B).get(), INTEL_LEAF0_EBX);
        assert!(id.overridden().is_empty());
    }

    #[test]
    fn set_register_leaves_table_alone() {
        let mut id = ProcessorIdentity::with_cpuid_fn(fake_intel(2)).unwrap();
        let before: Vec<_> = id.leaves().map(|(_, quad)| *quad).collect();

        id.set_register(Register::C, 0xdead_beef);
        assert_eq!(id.register(Register::C).get(), 0xdead_beef);
        assert_eq!(id.leaf_register(0, Register::C).unwrap().get(), INTEL_LEAF0_ECX);
        for other in [Register::A, Register::B, Register::D] {
            assert_eq!(id.register(other), id.leaf_register(0, other).unwrap());
        }
        assert_eq!(id.overridden(), Registers::C);

        let after: Vec<_> = id.leaves().map(|(_, quad)| *quad).collect();
        assert_eq!(before, after);
        assert_eq!(id.vendor().as_str(), "GenuineIntel");

        id.set_register(Register::A, RegisterValue::new(7));
        assert_eq!(id.overridden(), Registers::A | Registers::C);

        id.reset_registers();
        assert!(id.overridden().is_empty());
        assert_eq!(id.register(Register::C).get(), INTEL_LEAF0_ECX);
    }

    #[test]
    fn leaf_register_out_of_range() {
        let id = ProcessorIdentity::with_cpuid_fn(fake_intel(3)).unwrap();
        assert_eq!(id.leaf_register(3, Register::D).unwrap().get(), 6);
        assert_eq!(
            id.leaf_register(4, Register::A),
            Err(Error::OutOfRange { leaf: 4, leaf_count: 4 })
        );
        assert_eq!(
            id.leaf(u32::MAX),
            Err(Error::OutOfRange { leaf: u32::MAX, leaf_count: 4 })
        );
    }

    #[test]
    fn integer_selector() {
        let id = ProcessorIdentity::with_cpuid_fn(fake_intel(0)).unwrap();
        assert_eq!(id.register_by_index(1).unwrap().get(), INTEL_LEAF0_EBX);
        assert_eq!(id.register_by_index(4), Err(Error::InvalidRegister(4)));
    }

    #[test]
    fn missing_baseline_leaf_fails() {
        let err = ProcessorIdentity::with_cpuid_fn(|_, _| result(0, 0, 0, 0)).unwrap_err();
        assert_eq!(err, Error::Initialization);
    }

    #[test]
    fn huge_max_leaf_is_clamped() {
        let calls = Cell::new(0u32);
        let id = ProcessorIdentity::with_cpuid_fn(|leaf, _| {
            calls.set(calls.get() + 1);
            match leaf {
                0 => result(u32::MAX, INTEL_LEAF0_EBX, INTEL_LEAF0_ECX, INTEL_LEAF0_EDX),
                n => result(n, 0, 0, 0),
            }
        })
        .unwrap();
        assert_eq!(id.max_leaf(), DEFAULT_LEAF_LIMIT);
        assert_eq!(calls.get(), DEFAULT_LEAF_LIMIT + 1);
        // Register A of leaf 0 still reports what the processor said.
        assert_eq!(id.leaf_register(0, Register::A).unwrap().get(), u32::MAX);

        let id = ProcessorIdentity::with_cpuid_fn_and_config(fake_intel(0x20), ProbeConfig::new().leaf_limit(5))
            .unwrap();
        assert_eq!(id.leaf_count(), 6);
    }

    #[test]
    fn display_lists_every_leaf() {
        let id = ProcessorIdentity::with_cpuid_fn(fake_intel(1)).unwrap();
        let text = id.to_string();
        assert!(text.starts_with("Vendor: GenuineIntel (Intel)"));
        assert!(text.contains("0x01: eax=0x00000001 ebx=0x00000002 ecx=0x00000003 edx=0x00000004"));
        assert_eq!(text.lines().count(), 4);
    }

    #[cfg(all(feature = "native", any(target_arch = "x86", target_arch = "x86_64")))]
    #[test]
    fn native_probe() {
        let id = ProcessorIdentity::new().unwrap();
        assert!(id.is_loaded());
        assert!(id.vendor().len() <= crate::vendor::VENDOR_LEN);
        assert!(id.vendor().as_str().bytes().all(|b| (0x20..=0x7e).contains(&b)));
        for reg in [Register::B, Register::C, Register::D] {
            assert_eq!(id.register(reg), id.leaf_register(0, reg).unwrap());
        }
        assert!(id.leaf_register(id.max_leaf() + 1, Register::A).is_err());
    }
}
