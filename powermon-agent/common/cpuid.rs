#[cfg(target_arch = "x86_64")]
pub fn cpuid(eax: u32, ecx: u32) -> (u32, u32, u32, u32) {
    let mut ebx: u32;
    let mut edx: u32;
    let mut eax_out = eax;
    let mut ecx_out = ecx;

    unsafe {
        std::arch::asm!(
            "mov {0:r}, rbx",
            "cpuid",
            "xchg {0:r}, rbx",
            out(reg) ebx,
            inout("eax") eax_out,
            inout("ecx") ecx_out,
            out("edx") edx,
            options(nostack, preserves_flags)
        );
    }

    (eax_out, ebx, ecx_out, edx)
}

#[cfg(not(target_arch = "x86_64"))]
pub fn cpuid(_eax: u32, _ecx: u32) -> (u32, u32, u32, u32) {
    (0, 0, 0, 0)
}

/// 12-byte vendor identification string from leaf 0 (EBX, EDX, ECX order)
pub fn vendor_id() -> String {
    let (_eax, ebx, ecx, edx) = cpuid(0, 0);
    vendor_id_from_registers(ebx, edx, ecx)
}

pub fn vendor_id_from_registers(ebx: u32, edx: u32, ecx: u32) -> String {
    let mut bytes = [0u8; 12];
    bytes[0..4].copy_from_slice(&ebx.to_le_bytes());
    bytes[4..8].copy_from_slice(&edx.to_le_bytes());
    bytes[8..12].copy_from_slice(&ecx.to_le_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Raw processor signature, CPUID leaf 1 EAX
pub fn processor_signature() -> u32 {
    let (eax, _ebx, _ecx, _edx) = cpuid(1, 0);
    eax
}
