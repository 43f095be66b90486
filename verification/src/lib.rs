/*++
Licensed under the Apache-2.0 license.

Abstract:
    Extraction of TCG DICE TCB evidence from DPE-issued certificates.
--*/
pub use certs::{
    get_multi_tcb_info, get_tcb_info_for_handle, parse_certificate, TCG_DICE_MULTI_TCB_INFO_OID,
};
pub use error::VerificationError;
pub use tcb_info::{
    decode_multi_tcb_info, DiceTcbInfo, Fwid, OperationalFlag, TcbFlags, TcgMultiTcbInfo,
};

pub mod certs;
pub mod error;
pub mod tcb_info;
