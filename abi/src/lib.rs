/*++
Licensed under the Apache-2.0 license.

Abstract:
    DPE command/response ABI as seen by a client.
--*/
pub use client::{Client, DpeClient, DpeClientError, Transport};
pub use context::{ContextHandle, TciTag};
pub use support::Support;

pub mod client;
pub mod commands;
pub mod context;
pub mod response;
pub mod support;

pub const CMD_MAGIC: u32 = u32::from_be_bytes(*b"DPEC");
pub const RESP_MAGIC: u32 = u32::from_be_bytes(*b"DPER");

pub const CURRENT_PROFILE_MAJOR_VERSION: u16 = 0;
pub const CURRENT_PROFILE_MINOR_VERSION: u16 = 8;

/// Largest certificate chain window requested in one GetCertificateChain call.
pub const MAX_CHUNK_SIZE: u32 = 2048;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DpeProfile {
    P256Sha256 = 1,
    P384Sha384 = 2,
}

impl DpeProfile {
    pub const fn get_tci_size(&self) -> usize {
        match self {
            DpeProfile::P256Sha256 => 32,
            DpeProfile::P384Sha384 => 48,
        }
    }
    pub const fn get_ecc_int_size(&self) -> usize {
        self.get_tci_size()
    }
    pub const fn get_hash_size(&self) -> usize {
        self.get_tci_size()
    }
}

impl TryFrom<u32> for DpeProfile {
    type Error = DpeClientError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(DpeProfile::P256Sha256),
            2 => Ok(DpeProfile::P384Sha384),
            _ => Err(DpeClientError::UnsupportedProfile(raw)),
        }
    }
}
