// Licensed under the Apache-2.0 license.
use dpe_abi::DpeClientError;
use std::fmt;

/// Ways extracting TCB evidence from a DPE can fail. Nothing is retried or downgraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// A DPE call failed: framing, device status, or transport.
    Client(DpeClientError),

    /// CertifyKey returned bytes that are not a DER X.509 certificate.
    CertificateDecode(String),

    /// The tcg-dice-MultiTcbInfo extension is present but not marked critical.
    ExtensionNotCritical,

    /// The tcg-dice-MultiTcbInfo extension value is not a SEQUENCE OF TcbInfo.
    ExtensionDecode(String),

    /// No TcbInfo records were found for the certified layer.
    EmptyTcbInfo,
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(err) => write!(f, "{err}"),
            Self::CertificateDecode(msg) => write!(f, "failed to parse DPE certificate: {msg}"),
            Self::ExtensionNotCritical => {
                write!(f, "TCG DICE MultiTcbInfo extension is not marked as critical")
            }
            Self::ExtensionDecode(msg) => {
                write!(f, "failed to decode TCG DICE MultiTcbInfo extension: {msg}")
            }
            Self::EmptyTcbInfo => write!(f, "certificate MultiTcbInfo is empty"),
        }
    }
}

impl std::error::Error for VerificationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Client(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DpeClientError> for VerificationError {
    fn from(err: DpeClientError) -> Self {
        VerificationError::Client(err)
    }
}
