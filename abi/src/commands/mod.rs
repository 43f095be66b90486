/*++
Licensed under the Apache-2.0 license.

Abstract:
    DPE commands and serialization.
--*/
pub use self::certify_key::{CertifyKeyCmd, CertifyKeyFlags, CertifyKeyFormat};
pub use self::destroy_context::{DestroyCtxCmd, DestroyCtxFlags};
pub use self::get_certificate_chain::GetCertificateChainCmd;
pub use self::initialize_context::InitCtxCmd;
pub use self::tag_tci::{GetTaggedTciCmd, TagTciCmd};

use crate::CMD_MAGIC;
use zerocopy::IntoBytes;

mod certify_key;
mod destroy_context;
mod get_certificate_chain;
mod initialize_context;
mod tag_tci;

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    GetProfile,
    InitCtx(InitCtxCmd),
    CertifyKey(CertifyKeyCmd<'a>),
    DestroyCtx(DestroyCtxCmd),
    GetCertificateChain(GetCertificateChainCmd),
    TagTci(TagTciCmd),
    GetTaggedTci(GetTaggedTciCmd),
}

impl Command<'_> {
    pub const GET_PROFILE: u32 = 0x01;
    pub const INITIALIZE_CONTEXT: u32 = 0x07;
    pub const CERTIFY_KEY: u32 = 0x09;
    pub const DESTROY_CONTEXT: u32 = 0x0f;
    pub const GET_CERTIFICATE_CHAIN: u32 = 0x80;
    pub const TAG_TCI: u32 = 0x82;
    pub const GET_TAGGED_TCI: u32 = 0x83;

    pub fn id(&self) -> u32 {
        match self {
            Command::GetProfile => Self::GET_PROFILE,
            Command::InitCtx(_) => Self::INITIALIZE_CONTEXT,
            Command::CertifyKey(_) => Self::CERTIFY_KEY,
            Command::DestroyCtx(_) => Self::DESTROY_CONTEXT,
            Command::GetCertificateChain(_) => Self::GET_CERTIFICATE_CHAIN,
            Command::TagTci(_) => Self::TAG_TCI,
            Command::GetTaggedTci(_) => Self::GET_TAGGED_TCI,
        }
    }

    /// Serializes the header followed by the command payload.
    ///
    /// # Arguments
    ///
    /// * `profile` - raw profile value to place in the header. Zero before the profile is known.
    pub fn serialize(&self, profile: u32) -> Vec<u8> {
        let mut bytes = CommandHdr::new(profile, self.id()).as_bytes().to_vec();
        match self {
            Command::GetProfile => (),
            Command::InitCtx(cmd) => bytes.extend_from_slice(cmd.as_bytes()),
            Command::CertifyKey(cmd) => cmd.serialize(&mut bytes),
            Command::DestroyCtx(cmd) => bytes.extend_from_slice(cmd.as_bytes()),
            Command::GetCertificateChain(cmd) => bytes.extend_from_slice(cmd.as_bytes()),
            Command::TagTci(cmd) => bytes.extend_from_slice(cmd.as_bytes()),
            Command::GetTaggedTci(cmd) => bytes.extend_from_slice(cmd.as_bytes()),
        }
        bytes
    }
}

// ABI Command structures

#[repr(C)]
#[derive(
    Debug,
    PartialEq,
    Eq,
    zerocopy::FromBytes,
    zerocopy::IntoBytes,
    zerocopy::Immutable,
    zerocopy::KnownLayout,
)]
pub struct CommandHdr {
    pub magic: u32,
    pub cmd_id: u32,
    pub profile: u32,
}

impl CommandHdr {
    pub fn new(profile: u32, cmd_id: u32) -> CommandHdr {
        CommandHdr {
            magic: CMD_MAGIC,
            cmd_id,
            profile,
        }
    }
}
