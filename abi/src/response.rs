/*++
Licensed under the Apache-2.0 license.

Abstract:
    DPE responses and deserialization.
--*/
use crate::{
    client::DpeClientError, context::ContextHandle, support::Support, DpeProfile, RESP_MAGIC,
};
use core::mem::size_of;
use log::error;
use zerocopy::FromBytes;

// ABI Response structures

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
pub struct ResponseHdr {
    pub magic: u32,
    pub status: u32,
    pub profile: u32,
}

impl ResponseHdr {
    /// Splits a response into its header and payload.
    ///
    /// The magic is checked before anything else, including the header length, so a
    /// desynchronized stream is never mistaken for a truncated response or a device status.
    /// A non-zero status is returned as an error; the payload is only handed back for
    /// successful responses.
    pub fn parse(raw: &[u8]) -> Result<(ResponseHdr, &[u8]), DpeClientError> {
        if let Ok((magic, _)) = u32::read_from_prefix(raw) {
            if magic != RESP_MAGIC {
                error!("Bad response magic {magic:#010x}");
                return Err(DpeClientError::ProtocolFraming(magic));
            }
        }
        let (header, payload) = ResponseHdr::read_from_prefix(raw).map_err(|_| {
            error!("Response of {} bytes is too short for a header", raw.len());
            DpeClientError::Truncated
        })?;
        match DpeErrorCode::try_from(header.status) {
            Ok(DpeErrorCode::NoError) => Ok((header, payload)),
            Ok(code) => Err(DpeClientError::Device(code)),
            Err(_) => {
                error!("Unrecognized response status {:#x}", header.status);
                Err(DpeClientError::UnknownStatus(header.status))
            }
        }
    }
}

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
struct GetProfileRespWire {
    major_version: u16,
    minor_version: u16,
    vendor_id: u32,
    vendor_sku: u32,
    max_tci_nodes: u32,
    flags: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct GetProfileResp {
    /// Taken from the response header.
    pub profile: DpeProfile,
    pub major_version: u16,
    pub minor_version: u16,
    pub vendor_id: u32,
    pub vendor_sku: u32,
    pub max_tci_nodes: u32,
    pub flags: Support,
}

impl GetProfileResp {
    pub fn parse(profile: DpeProfile, payload: &[u8]) -> Result<Self, DpeClientError> {
        let (wire, _) =
            GetProfileRespWire::read_from_prefix(payload).map_err(|_| DpeClientError::Truncated)?;
        Ok(GetProfileResp {
            profile,
            major_version: wire.major_version,
            minor_version: wire.minor_version,
            vendor_id: wire.vendor_id,
            vendor_sku: wire.vendor_sku,
            max_tci_nodes: wire.max_tci_nodes,
            flags: Support::from_bits_retain(wire.flags),
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NewHandleResp {
    pub handle: ContextHandle,
}

impl NewHandleResp {
    pub fn parse(payload: &[u8]) -> Result<Self, DpeClientError> {
        Ok(NewHandleResp {
            handle: ContextHandle::try_from(payload)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CertifyKeyResp {
    pub new_context_handle: ContextHandle,
    pub derived_pubkey_x: Vec<u8>,
    pub derived_pubkey_y: Vec<u8>,
    /// DER certificate or CSR, depending on the requested format.
    pub certificate: Vec<u8>,
}

impl CertifyKeyResp {
    pub fn parse(profile: DpeProfile, payload: &[u8]) -> Result<Self, DpeClientError> {
        let mut reader = PayloadReader::new(payload);
        let new_context_handle = ContextHandle::try_from(reader.take(ContextHandle::SIZE)?)?;
        let derived_pubkey_x = reader.take(profile.get_ecc_int_size())?.to_vec();
        let derived_pubkey_y = reader.take(profile.get_ecc_int_size())?.to_vec();
        let cert_size = reader.read_u32()?;
        let certificate = reader.take(cert_size as usize)?.to_vec();

        Ok(CertifyKeyResp {
            new_context_handle,
            derived_pubkey_x,
            derived_pubkey_y,
            certificate,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GetCertificateChainResp {
    /// Size of the whole chain, not of this window.
    pub certificate_size: u32,
    pub certificate_chain: Vec<u8>,
}

impl GetCertificateChainResp {
    /// Parses the window requested by `offset` and `size`. The window is clipped to the end of
    /// the chain reported by the device.
    pub fn parse(offset: u32, size: u32, payload: &[u8]) -> Result<Self, DpeClientError> {
        let mut reader = PayloadReader::new(payload);
        let certificate_size = reader.read_u32()?;
        let window = size.min(certificate_size.saturating_sub(offset));
        let certificate_chain = reader.take(window as usize)?.to_vec();

        Ok(GetCertificateChainResp {
            certificate_size,
            certificate_chain,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GetTaggedTciResp {
    pub tci_cumulative: Vec<u8>,
    pub tci_current: Vec<u8>,
}

impl GetTaggedTciResp {
    pub fn parse(profile: DpeProfile, payload: &[u8]) -> Result<Self, DpeClientError> {
        let mut reader = PayloadReader::new(payload);
        let tci_cumulative = reader.take(profile.get_tci_size())?.to_vec();
        let tci_current = reader.take(profile.get_tci_size())?.to_vec();

        Ok(GetTaggedTciResp {
            tci_cumulative,
            tci_current,
        })
    }
}

struct PayloadReader<'a> {
    bytes: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        PayloadReader { bytes }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DpeClientError> {
        if self.bytes.len() < len {
            error!(
                "Response payload needs {len} more bytes but only {} remain",
                self.bytes.len()
            );
            return Err(DpeClientError::Truncated);
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn read_u32(&mut self) -> Result<u32, DpeClientError> {
        let raw = self.take(size_of::<u32>())?;
        let mut word = [0u8; 4];
        word.copy_from_slice(raw);
        Ok(u32::from_le_bytes(word))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DpeErrorCode {
    NoError = 0,
    InternalError = 1,
    InvalidCommand = 2,
    InvalidArgument = 3,
    ArgumentNotSupported = 4,
    InvalidHandle = 0x1000,
    InvalidLocality = 0x1001,
    BadTag = 0x1002,
    MaxTcis = 0x1003,
    PlatformError = 0x1004,
    CryptoError = 0x1005,
    HashError = 0x1006,
    RandError = 0x1007,
}

impl TryFrom<u32> for DpeErrorCode {
    type Error = u32;

    fn try_from(status: u32) -> Result<Self, Self::Error> {
        match status {
            0 => Ok(Self::NoError),
            1 => Ok(Self::InternalError),
            2 => Ok(Self::InvalidCommand),
            3 => Ok(Self::InvalidArgument),
            4 => Ok(Self::ArgumentNotSupported),
            0x1000 => Ok(Self::InvalidHandle),
            0x1001 => Ok(Self::InvalidLocality),
            0x1002 => Ok(Self::BadTag),
            0x1003 => Ok(Self::MaxTcis),
            0x1004 => Ok(Self::PlatformError),
            0x1005 => Ok(Self::CryptoError),
            0x1006 => Ok(Self::HashError),
            0x1007 => Ok(Self::RandError),
            _ => Err(status),
        }
    }
}
