// Licensed under the Apache-2.0 license.
use crate::client::DpeClientError;
use core::fmt;

/// Opaque token naming a context on the device. Handles are not owning references: they are
/// invalidated by DestroyContext and may be rotated by CertifyKey and TagTci.
#[repr(C)]
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    zerocopy::FromBytes,
    zerocopy::IntoBytes,
    zerocopy::Immutable,
    zerocopy::KnownLayout,
)]
pub struct ContextHandle(pub [u8; ContextHandle::SIZE]);

impl ContextHandle {
    pub const SIZE: usize = 16;
    const DEFAULT: [u8; Self::SIZE] = [0; Self::SIZE];

    /// Returns the default context handle.
    pub const fn default() -> ContextHandle {
        ContextHandle(Self::DEFAULT)
    }

    /// Whether the handle is the default context handle.
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }
}

impl Default for ContextHandle {
    fn default() -> Self {
        ContextHandle::default()
    }
}

impl TryFrom<&[u8]> for ContextHandle {
    type Error = DpeClientError;

    fn try_from(raw: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::SIZE] = raw
            .get(..Self::SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(DpeClientError::Truncated)?;
        Ok(ContextHandle(bytes))
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Caller-chosen label bound to a context's TCI state by TagTci.
#[repr(transparent)]
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    zerocopy::FromBytes,
    zerocopy::IntoBytes,
    zerocopy::Immutable,
    zerocopy::KnownLayout,
)]
pub struct TciTag(pub u32);

impl From<u32> for TciTag {
    fn from(tag: u32) -> Self {
        TciTag(tag)
    }
}
