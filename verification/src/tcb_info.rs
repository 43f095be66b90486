// Licensed under the Apache-2.0 license.
//! Owned forms of the TCG DICE TcbInfo evidence records.
//!
//! https://trustedcomputinggroup.org/wp-content/uploads/TCG_DICE_Attestation_Architecture_r22_02dec2020.pdf
//!
//! Every TcbInfo field is OPTIONAL and IMPLICITLY tagged with its position. Fields [0] to [10]
//! are decoded. `integrityRegisters` [11], added in DICE Attestation Architecture v1.1, is kept
//! as the raw DER of each register. Any field past [11] fails the decode.

use asn1::{BitString, ObjectIdentifier, SequenceOf, Tlv, Utf8String};

/// Layer records in leaf-first order: index 0 describes the certified layer itself, the rest
/// are its ancestors.
pub type TcgMultiTcbInfo = Vec<DiceTcbInfo>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fwid {
    pub hash_alg: ObjectIdentifier,
    pub digest: Vec<u8>,
}

/// Bits of the TcbInfo `flags` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationalFlag {
    NotConfigured = 0,
    NotSecure = 1,
    Recovery = 2,
    Debug = 3,
}

/// A BIT STRING kept exactly as encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TcbFlags {
    pub bytes: Vec<u8>,
    pub padding_bits: u8,
}

impl TcbFlags {
    /// Whether `flag` is set. Bit 0 is the most significant bit of the first byte.
    pub fn has(&self, flag: OperationalFlag) -> bool {
        let bit = flag as usize;
        let bit_len = (self.bytes.len() * 8).saturating_sub(self.padding_bits as usize);
        if bit >= bit_len {
            return false;
        }
        self.bytes[bit / 8] & (0x80 >> (bit % 8)) != 0
    }
}

impl From<BitString<'_>> for TcbFlags {
    fn from(bits: BitString<'_>) -> Self {
        TcbFlags {
            bytes: bits.as_bytes().to_vec(),
            padding_bits: bits.padding_bits(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiceTcbInfo {
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub version: Option<String>,
    pub svn: Option<u64>,
    pub layer: Option<u64>,
    pub index: Option<u64>,
    pub fwids: Option<Vec<Fwid>>,
    pub flags: Option<TcbFlags>,
    pub vendor_info: Option<Vec<u8>>,
    pub tci_type: Option<Vec<u8>>,
    pub flags_mask: Option<TcbFlags>,
    /// DER of each IntegrityRegister, in encoded order.
    pub integrity_registers: Option<Vec<Vec<u8>>>,
}

#[derive(asn1::Asn1Read)]
struct FwidRef<'a> {
    hash_alg: ObjectIdentifier,
    digest: &'a [u8],
}

#[derive(asn1::Asn1Read)]
struct TcbInfoRef<'a> {
    #[implicit(0)]
    vendor: Option<Utf8String<'a>>,
    #[implicit(1)]
    model: Option<Utf8String<'a>>,
    #[implicit(2)]
    version: Option<Utf8String<'a>>,
    #[implicit(3)]
    svn: Option<u64>,
    #[implicit(4)]
    layer: Option<u64>,
    #[implicit(5)]
    index: Option<u64>,
    #[implicit(6)]
    fwids: Option<SequenceOf<'a, FwidRef<'a>>>,
    #[implicit(7)]
    flags: Option<BitString<'a>>,
    #[implicit(8)]
    vendor_info: Option<&'a [u8]>,
    #[implicit(9)]
    tci_type: Option<&'a [u8]>,
    #[implicit(10)]
    flags_mask: Option<BitString<'a>>,
    #[implicit(11)]
    integrity_registers: Option<SequenceOf<'a, Tlv<'a>>>,
}

impl From<FwidRef<'_>> for Fwid {
    fn from(fwid: FwidRef<'_>) -> Self {
        Fwid {
            hash_alg: fwid.hash_alg,
            digest: fwid.digest.to_vec(),
        }
    }
}

impl From<TcbInfoRef<'_>> for DiceTcbInfo {
    fn from(info: TcbInfoRef<'_>) -> Self {
        DiceTcbInfo {
            vendor: info.vendor.map(|s| s.as_str().to_owned()),
            model: info.model.map(|s| s.as_str().to_owned()),
            version: info.version.map(|s| s.as_str().to_owned()),
            svn: info.svn,
            layer: info.layer,
            index: info.index,
            fwids: info.fwids.map(|fwids| fwids.map(Fwid::from).collect()),
            flags: info.flags.map(TcbFlags::from),
            vendor_info: info.vendor_info.map(<[u8]>::to_vec),
            tci_type: info.tci_type.map(<[u8]>::to_vec),
            flags_mask: info.flags_mask.map(TcbFlags::from),
            integrity_registers: info
                .integrity_registers
                .map(|regs| regs.map(|reg| reg.full_data().to_vec()).collect()),
        }
    }
}

/// Decodes the value of a tcg-dice-MultiTcbInfo extension, a SEQUENCE OF TcbInfo.
pub fn decode_multi_tcb_info(der: &[u8]) -> asn1::ParseResult<TcgMultiTcbInfo> {
    let infos = asn1::parse_single::<SequenceOf<TcbInfoRef>>(der)?;
    Ok(infos.map(DiceTcbInfo::from).collect())
}
