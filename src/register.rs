//! Register selectors and the values CPUID leaves them in.

use core::fmt;

use bitfield::Bit;
use raw_cpuid::CpuIdResult;

use crate::error::{Error, Result};

/// One of the four output registers of CPUID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    A,
    B,
    C,
    D,
}

impl Register {
    /// All selectors in quadruple order.
    pub const ALL: [Register; 4] = [Register::A, Register::B, Register::C, Register::D];

    pub const fn index(self) -> usize {
        match self {
            Register::A => 0,
            Register::B => 1,
            Register::C => 2,
            Register::D => 3,
        }
    }

    /// The flag naming this register in a [`Registers`] set.
    pub const fn flag(self) -> Registers {
        match self {
            Register::A => Registers::A,
            Register::B => Registers::B,
            Register::C => Registers::C,
            Register::D => Registers::D,
        }
    }
}

impl TryFrom<u32> for Register {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Register::A),
            1 => Ok(Register::B),
            2 => Ok(Register::C),
            3 => Ok(Register::D),
            _ => Err(Error::InvalidRegister(raw)),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::A => f.write_str("eax"),
            Register::B => f.write_str("ebx"),
            Register::C => f.write_str("ecx"),
            Register::D => f.write_str("edx"),
        }
    }
}

bitflags! {
    /// A set of registers, used to report which current registers were overridden.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Registers: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const C = 1 << 2;
        const D = 1 << 3;
    }
}

bitfield! {
    /// 32-bit view of a single register.
    #[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct RegisterValue(u32);
    u8;
    pub byte0, _: 7, 0;
    pub byte1, _: 15, 8;
    pub byte2, _: 23, 16;
    pub byte3, _: 31, 24;
}

impl RegisterValue {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether bit `index` is set.
    ///
    /// # Panics
    ///
    /// If `index` is 32 or above.
    pub fn is_set(&self, index: usize) -> bool {
        assert!(index < 32, "bit {} is outside of a 32-bit register", index);
        Bit::bit(self, index)
    }

    /// Returns a copy with bit `index` set to `value`.
    ///
    /// # Panics
    ///
    /// If `index` is 32 or above.
    pub fn with_bit(mut self, index: usize, value: bool) -> Self {
        assert!(index < 32, "bit {} is outside of a 32-bit register", index);
        Bit::set_bit(&mut self, index, value);
        self
    }

    /// The register's bytes in memory order (least significant first).
    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl From<u32> for RegisterValue {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<RegisterValue> for u32 {
    fn from(value: RegisterValue) -> Self {
        value.0
    }
}

impl fmt::Debug for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegisterValue({:#010x})", self.0)
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Binary for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// The four registers produced by one CPUID invocation, in (A, B, C, D) order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RegisterQuadruple {
    regs: [u32; 4],
}

impl RegisterQuadruple {
    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
        Self { regs: [eax, ebx, ecx, edx] }
    }

    pub const fn get(&self, which: Register) -> RegisterValue {
        RegisterValue(self.regs[which.index()])
    }

    pub const fn eax(&self) -> u32 {
        self.regs[0]
    }

    pub const fn ebx(&self) -> u32 {
        self.regs[1]
    }

    pub const fn ecx(&self) -> u32 {
        self.regs[2]
    }

    pub const fn edx(&self) -> u32 {
        self.regs[3]
    }

    /// Whether every register is zero, which is what a missing leaf reads as.
    pub const fn is_zero(&self) -> bool {
        (self.regs[0] | self.regs[1] | self.regs[2] | self.regs[3]) == 0
    }
}

impl From<CpuIdResult> for RegisterQuadruple {
    fn from(res: CpuIdResult) -> Self {
        Self::new(res.eax, res.ebx, res.ecx, res.edx)
    }
}

impl From<RegisterQuadruple> for CpuIdResult {
    fn from(quad: RegisterQuadruple) -> Self {
        CpuIdResult {
            eax: quad.eax(),
            ebx: quad.ebx(),
            ecx: quad.ecx(),
            edx: quad.edx(),
        }
    }
}
