/*++
Licensed under the Apache-2.0 license.

Abstract:
    The DPE client capability and a client that speaks the ABI over a byte transport.
--*/
use crate::{
    commands::{
        CertifyKeyCmd, CertifyKeyFlags, CertifyKeyFormat, Command, DestroyCtxCmd,
        GetCertificateChainCmd, GetTaggedTciCmd, InitCtxCmd, TagTciCmd,
    },
    context::{ContextHandle, TciTag},
    response::{
        CertifyKeyResp, DpeErrorCode, GetCertificateChainResp, GetProfileResp, GetTaggedTciResp,
        NewHandleResp, ResponseHdr,
    },
    DpeProfile, MAX_CHUNK_SIZE,
};
use core::fmt;
use core::mem::size_of;
use log::{debug, error, warn};
use std::io;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DpeClientError {
    /// The response did not start with the DPE response magic. Holds the magic that was read.
    ProtocolFraming(u32),

    /// The device rejected the command with this status.
    Device(DpeErrorCode),

    /// The device returned a status outside the known set.
    UnknownStatus(u32),

    /// The profile value is not one this client can size fields for.
    UnsupportedProfile(u32),

    /// The response was produced under a different profile than the one negotiated.
    ProfileMismatch { expected: u32, actual: u32 },

    /// The response ended before the command's payload layout did.
    Truncated,

    /// The transport failed to deliver the command or its response.
    Transport(io::ErrorKind),
}

impl fmt::Display for DpeClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProtocolFraming(magic) => write!(f, "bad DPE response magic {magic:#010x}"),
            Self::Device(code) => write!(f, "DPE returned {code:?} ({:#x})", *code as u32),
            Self::UnknownStatus(status) => write!(f, "DPE returned unknown status {status:#x}"),
            Self::UnsupportedProfile(profile) => write!(f, "unsupported DPE profile {profile}"),
            Self::ProfileMismatch { expected, actual } => write!(
                f,
                "response profile {actual} does not match negotiated profile {expected}"
            ),
            Self::Truncated => write!(f, "DPE response is truncated"),
            Self::Transport(kind) => write!(f, "DPE transport failed: {kind}"),
        }
    }
}

impl std::error::Error for DpeClientError {}

/// Everything a verifier needs from a DPE, independent of how commands reach it.
pub trait DpeClient {
    fn get_profile(&mut self) -> Result<GetProfileResp, DpeClientError>;

    fn initialize_context(&mut self, cmd: InitCtxCmd) -> Result<NewHandleResp, DpeClientError>;

    fn destroy_context(
        &mut self,
        handle: &ContextHandle,
        destroy_descendants: bool,
    ) -> Result<(), DpeClientError>;

    /// # Arguments
    ///
    /// * `label` - must be as long as the profile's digest. Not checked here.
    fn certify_key(
        &mut self,
        handle: &ContextHandle,
        label: &[u8],
        format: CertifyKeyFormat,
        flags: CertifyKeyFlags,
    ) -> Result<CertifyKeyResp, DpeClientError>;

    fn get_certificate_chain(
        &mut self,
        offset: u32,
        size: u32,
    ) -> Result<GetCertificateChainResp, DpeClientError>;

    fn tag_tci(&mut self, handle: &ContextHandle, tag: TciTag)
        -> Result<NewHandleResp, DpeClientError>;

    fn get_tagged_tci(&mut self, tag: TciTag) -> Result<GetTaggedTciResp, DpeClientError>;

    /// Reads the whole certificate chain, one `MAX_CHUNK_SIZE` window at a time.
    fn get_full_certificate_chain(&mut self) -> Result<Vec<u8>, DpeClientError> {
        let mut chain = Vec::new();
        loop {
            let offset = u32::try_from(chain.len()).map_err(|_| DpeClientError::Truncated)?;
            let resp = self.get_certificate_chain(offset, MAX_CHUNK_SIZE)?;
            if resp.certificate_chain.is_empty() {
                if offset < resp.certificate_size {
                    error!(
                        "Certificate chain stopped at {offset} of {} bytes",
                        resp.certificate_size
                    );
                    return Err(DpeClientError::Truncated);
                }
                break;
            }
            chain.extend_from_slice(&resp.certificate_chain);
            if chain.len() >= resp.certificate_size as usize {
                break;
            }
        }
        Ok(chain)
    }
}

/// Moves serialized commands to a DPE and returns the raw response.
pub trait Transport {
    fn send(&mut self, cmd: &[u8]) -> io::Result<Vec<u8>>;
}

/// A [`DpeClient`] that serializes commands according to the ABI and sends them over a
/// [`Transport`].
pub struct Client<T: Transport> {
    transport: T,
    profile: DpeProfile,
}

impl<T: Transport> Client<T> {
    /// Creates a client, discovering the profile with GetProfile.
    pub fn new(mut transport: T) -> Result<Self, DpeClientError> {
        let (hdr, payload) = Self::exchange(&mut transport, 0, &Command::GetProfile)?;
        let profile = DpeProfile::try_from(hdr.profile)?;
        let resp = GetProfileResp::parse(profile, &payload)?;
        debug!(
            "Negotiated profile {profile:?}, version {}.{}, flags {:#x}",
            resp.major_version,
            resp.minor_version,
            resp.flags.bits()
        );
        Ok(Client { transport, profile })
    }

    /// Creates a client for a DPE whose profile is already known.
    pub fn with_profile(transport: T, profile: DpeProfile) -> Self {
        Client { transport, profile }
    }

    pub fn profile(&self) -> DpeProfile {
        self.profile
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn exchange(
        transport: &mut T,
        profile: u32,
        cmd: &Command,
    ) -> Result<(ResponseHdr, Vec<u8>), DpeClientError> {
        debug!("Sending command {:#x}", cmd.id());
        let raw = transport.send(&cmd.serialize(profile)).map_err(|err| {
            error!("Transport failed for command {:#x}: {err}", cmd.id());
            DpeClientError::Transport(err.kind())
        })?;
        let (hdr, _) = ResponseHdr::parse(&raw).map_err(|err| {
            debug!("Command {:#x} failed: {err}", cmd.id());
            err
        })?;
        Ok((hdr, raw[size_of::<ResponseHdr>()..].to_vec()))
    }

    /// Sends `cmd` and returns the payload of a successful response produced under the
    /// negotiated profile.
    fn execute(&mut self, cmd: &Command) -> Result<Vec<u8>, DpeClientError> {
        let expected = self.profile as u32;
        let (hdr, payload) = Self::exchange(&mut self.transport, expected, cmd)?;
        if hdr.profile != expected {
            warn!(
                "Command {:#x} answered under profile {} instead of {expected}",
                cmd.id(),
                hdr.profile
            );
            return Err(DpeClientError::ProfileMismatch {
                expected,
                actual: hdr.profile,
            });
        }
        Ok(payload)
    }
}

impl<T: Transport> DpeClient for Client<T> {
    fn get_profile(&mut self) -> Result<GetProfileResp, DpeClientError> {
        let payload = self.execute(&Command::GetProfile)?;
        GetProfileResp::parse(self.profile, &payload)
    }

    fn initialize_context(&mut self, cmd: InitCtxCmd) -> Result<NewHandleResp, DpeClientError> {
        let payload = self.execute(&Command::InitCtx(cmd))?;
        NewHandleResp::parse(&payload)
    }

    fn destroy_context(
        &mut self,
        handle: &ContextHandle,
        destroy_descendants: bool,
    ) -> Result<(), DpeClientError> {
        self.execute(&Command::DestroyCtx(DestroyCtxCmd::new(
            *handle,
            destroy_descendants,
        )))?;
        Ok(())
    }

    fn certify_key(
        &mut self,
        handle: &ContextHandle,
        label: &[u8],
        format: CertifyKeyFormat,
        flags: CertifyKeyFlags,
    ) -> Result<CertifyKeyResp, DpeClientError> {
        let payload = self.execute(&Command::CertifyKey(CertifyKeyCmd {
            handle: *handle,
            flags,
            format,
            label,
        }))?;
        CertifyKeyResp::parse(self.profile, &payload)
    }

    fn get_certificate_chain(
        &mut self,
        offset: u32,
        size: u32,
    ) -> Result<GetCertificateChainResp, DpeClientError> {
        let payload = self.execute(&Command::GetCertificateChain(GetCertificateChainCmd {
            offset,
            size,
        }))?;
        GetCertificateChainResp::parse(offset, size, &payload)
    }

    fn tag_tci(
        &mut self,
        handle: &ContextHandle,
        tag: TciTag,
    ) -> Result<NewHandleResp, DpeClientError> {
        let payload = self.execute(&Command::TagTci(TagTciCmd {
            handle: *handle,
            tag,
        }))?;
        NewHandleResp::parse(&payload)
    }

    fn get_tagged_tci(&mut self, tag: TciTag) -> Result<GetTaggedTciResp, DpeClientError> {
        let payload = self.execute(&Command::GetTaggedTci(GetTaggedTciCmd { tag }))?;
        GetTaggedTciResp::parse(self.profile, &payload)
    }
}
