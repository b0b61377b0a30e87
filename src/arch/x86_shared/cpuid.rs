use raw_cpuid::CpuIdResult;

/// Executes CPUID for `leaf`/`subleaf` on the executing core.
///
/// Returns an all-zero result if the processor has no CPUID instruction, which callers
/// treat as "baseline leaf unavailable".
pub fn cpuid_count(leaf: u32, subleaf: u32) -> CpuIdResult {
    #[cfg(target_arch = "x86")]
    let result = {
        // Pre-Pentium parts lack CPUID entirely and fault on it.
        if !core::arch::x86::has_cpuid() {
            return CpuIdResult {
                eax: 0,
                ebx: 0,
                ecx: 0,
                edx: 0,
            };
        }
        unsafe { core::arch::x86::__cpuid_count(leaf, subleaf) }
    };
    #[cfg(target_arch = "x86_64")]
    let result = unsafe { core::arch::x86_64::__cpuid_count(leaf, subleaf) };

    CpuIdResult {
        eax: result.eax,
        ebx: result.ebx,
        ecx: result.ecx,
        edx: result.edx,
    }
}
