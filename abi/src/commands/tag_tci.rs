// Licensed under the Apache-2.0 license.
use crate::context::{ContextHandle, TciTag};

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
pub struct TagTciCmd {
    pub handle: ContextHandle,
    pub tag: TciTag,
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
pub struct GetTaggedTciCmd {
    pub tag: TciTag,
}
