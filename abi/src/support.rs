// Licensed under the Apache-2.0 license.
use bitflags::bitflags;

/// Capability word reported in the GetProfile response. Bits this client has no name for are
/// kept, so the word can be logged or forwarded unchanged.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Support(u32);

bitflags! {
    impl Support: u32 {
        const SIMULATION = 1u32 << 31;
        const EXTEND_TCI = 1u32 << 30;
        const AUTO_INIT = 1u32 << 29;
        const TAGGING = 1u32 << 28;
        const ROTATE_CONTEXT = 1u32 << 27;
        const X509 = 1u32 << 26;
        const CSR = 1u32 << 25;
        const IS_SYMMETRIC = 1u32 << 24;
        const INTERNAL_INFO = 1u32 << 23;
        const INTERNAL_DICE = 1u32 << 22;
        const IS_CA = 1u32 << 21;
    }
}
