// Licensed under the Apache-2.0 license.

/// Requests the `size` byte window of the certificate chain starting at `offset`.
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
pub struct GetCertificateChainCmd {
    pub offset: u32,
    pub size: u32,
}
