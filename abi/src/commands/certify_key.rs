// Licensed under the Apache-2.0 license.
use crate::context::ContextHandle;
use bitflags::bitflags;
use zerocopy::IntoBytes;

/// Profile or vendor defined bits. None are named by the base ABI, so unknown bits are carried
/// through unchanged.
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
pub struct CertifyKeyFlags(u32);

bitflags! {
    impl CertifyKeyFlags: u32 {}
}

/// Encoding of the certificate artifact returned by CertifyKey.
#[repr(u32)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CertifyKeyFormat {
    X509 = 0,
    Csr = 1,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CertifyKeyCmd<'a> {
    pub handle: ContextHandle,
    pub flags: CertifyKeyFlags,
    pub format: CertifyKeyFormat,
    /// Must be the profile's digest size. Sent as-is.
    pub label: &'a [u8],
}

impl CertifyKeyCmd<'_> {
    pub(crate) fn serialize(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(self.handle.as_bytes());
        dst.extend_from_slice(self.flags.as_bytes());
        dst.extend_from_slice(&(self.format as u32).to_le_bytes());
        dst.extend_from_slice(self.label);
    }
}
