// Licensed under the Apache-2.0 license.
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
pub struct InitCtxCmd(u32);

bitflags! {
    impl InitCtxCmd: u32 {
        const SIMULATION_FLAG_MASK = 1u32 << 31;
        const DEFAULT_FLAG_MASK = 1u32 << 30;
    }
}

impl InitCtxCmd {
    pub const fn new_use_default() -> InitCtxCmd {
        Self::DEFAULT_FLAG_MASK
    }

    pub const fn new_simulation() -> InitCtxCmd {
        Self::SIMULATION_FLAG_MASK
    }
}
