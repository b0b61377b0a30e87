//! Vendor identification string of CPUID leaf 0.

use core::fmt;

pub const VENDOR_LEN: usize = 12;

/// Packs the vendor registers of leaf 0 into their 12 raw bytes.
///
/// Each register is laid out little-endian and the registers are concatenated in
/// B, D, C order, which is the order the vendor string is spread over.
pub const fn pack_vendor_bytes(ebx: u32, edx: u32, ecx: u32) -> [u8; VENDOR_LEN] {
    let b = ebx.to_le_bytes();
    let d = edx.to_le_bytes();
    let c = ecx.to_le_bytes();
    #[rustfmt::skip]
    let packed = [
        b[0], b[1], b[2], b[3],
        d[0], d[1], d[2], d[3],
        c[0], c[1], c[2], c[3],
    ];
    packed
}

/// Vendor string reported by the processor, e.g. `GenuineIntel`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VendorIdentity {
    raw: [u8; VENDOR_LEN],
    len: usize,
}

impl VendorIdentity {
    pub const fn from_registers(ebx: u32, edx: u32, ecx: u32) -> Self {
        Self::from_bytes(pack_vendor_bytes(ebx, edx, ecx))
    }

    /// The string ends at the first byte that is not printable ASCII, so padding such as
    /// KVM's trailing NULs is dropped.
    pub const fn from_bytes(raw: [u8; VENDOR_LEN]) -> Self {
        let mut len = 0;
        while len < VENDOR_LEN && matches!(raw[len], 0x20..=0x7e) {
            len += 1;
        }
        Self { raw, len }
    }

    pub fn as_str(&self) -> &str {
        // Only printable ASCII is counted in `len`.
        core::str::from_utf8(&self.raw[..self.len]).unwrap_or_default()
    }

    /// All 12 bytes, including anything past the end of the string.
    pub const fn raw_bytes(&self) -> &[u8; VENDOR_LEN] {
        &self.raw
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn known(&self) -> KnownVendor {
        KnownVendor::from(self)
    }
}

impl fmt::Debug for VendorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VendorIdentity").field(&self.as_str()).finish()
    }
}

impl fmt::Display for VendorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for VendorIdentity {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for VendorIdentity {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Manufacturers and hypervisors recognized by their vendor string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KnownVendor {
    /// "GenuineIntel"
    Intel,
    /// "AuthenticAMD", or "AMDisbetter!" on early K5 samples
    Amd,
    /// "HygonGenuine"
    Hygon,
    /// "CentaurHauls"
    Centaur,
    /// "  Shanghai  "
    Zhaoxin,
    /// "VIA VIA VIA "
    Via,
    /// "KVMKVMKVM\0\0\0"
    Kvm,
    /// "Microsoft Hv"
    HyperV,
    /// "VMwareVMware"
    VMware,
    /// "XenVMMXenVMM"
    Xen,
    /// "TCGTCGTCGTCG"
    Qemu,
    Unknown,
}

impl From<&VendorIdentity> for KnownVendor {
    fn from(vendor: &VendorIdentity) -> Self {
        match vendor.raw_bytes() {
            b"GenuineIntel" => KnownVendor::Intel,
            b"AuthenticAMD" | b"AMDisbetter!" => KnownVendor::Amd,
            b"HygonGenuine" => KnownVendor::Hygon,
            b"CentaurHauls" => KnownVendor::Centaur,
            b"  Shanghai  " => KnownVendor::Zhaoxin,
            b"VIA VIA VIA " => KnownVendor::Via,
            b"KVMKVMKVM\0\0\0" => KnownVendor::Kvm,
            b"Microsoft Hv" => KnownVendor::HyperV,
            b"VMwareVMware" => KnownVendor::VMware,
            b"XenVMMXenVMM" => KnownVendor::Xen,
            b"TCGTCGTCGTCG" => KnownVendor::Qemu,
            _ => KnownVendor::Unknown,
        }
    }
}

impl fmt::Display for KnownVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnownVendor::Intel => write!(f, "Intel"),
            KnownVendor::Amd => write!(f, "AMD"),
            KnownVendor::Hygon => write!(f, "Hygon"),
            KnownVendor::Centaur => write!(f, "Centaur"),
            KnownVendor::Zhaoxin => write!(f, "Zhaoxin"),
            KnownVendor::Via => write!(f, "VIA"),
            KnownVendor::Kvm => write!(f, "KVM"),
            KnownVendor::HyperV => write!(f, "Microsoft Hyper-V"),
            KnownVendor::VMware => write!(f, "VMware"),
            KnownVendor::Xen => write!(f, "Xen HVM"),
            KnownVendor::Qemu => write!(f, "QEMU TCG"),
            KnownVendor::Unknown => write!(f, "Unknown"),
        }
    }
}
