// Licensed under the Apache-2.0 license.
use crate::context::ContextHandle;
use bitflags::bitflags;

#[repr(C)]
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    zerocopy::FromBytes,
    zerocopy::IntoBytes,
    zerocopy::Immutable,
    zerocopy::KnownLayout,
)]
pub struct DestroyCtxFlags(u32);

bitflags! {
    impl DestroyCtxFlags: u32 {
        const DESTROY_DESCENDANTS = 1u32 << 31;
    }
}

#[repr(C)]
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    zerocopy::FromBytes,
    zerocopy::IntoBytes,
    zerocopy::Immutable,
    zerocopy::KnownLayout,
)]
pub struct DestroyCtxCmd {
    pub handle: ContextHandle,
    pub flags: DestroyCtxFlags,
}

impl DestroyCtxCmd {
    pub fn new(handle: ContextHandle, destroy_descendants: bool) -> DestroyCtxCmd {
        let mut flags = DestroyCtxFlags::empty();
        flags.set(DestroyCtxFlags::DESTROY_DESCENDANTS, destroy_descendants);
        DestroyCtxCmd { handle, flags }
    }
}
