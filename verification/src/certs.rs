// Licensed under the Apache-2.0 license.
use crate::{
    error::VerificationError,
    tcb_info::{decode_multi_tcb_info, DiceTcbInfo, TcgMultiTcbInfo},
};
use dpe_abi::{
    commands::{CertifyKeyFlags, CertifyKeyFormat},
    ContextHandle, DpeClient, Support,
};
use log::{debug, error, warn};
use x509_parser::oid_registry::asn1_rs::oid;
use x509_parser::oid_registry::Oid;
use x509_parser::prelude::{FromDer, X509Certificate};

/// tcg-dice-MultiTcbInfo 2.23.133.5.4.5
pub const TCG_DICE_MULTI_TCB_INFO_OID: Oid<'static> = oid!(2.23.133 .5 .4 .5);

/// Parses a DER X.509 certificate. No other encoding is attempted and trailing bytes are an
/// error.
pub fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>, VerificationError> {
    let (rem, cert) = X509Certificate::from_der(der).map_err(|err| {
        error!("Certificate is not DER X.509: {err}");
        VerificationError::CertificateDecode(err.to_string())
    })?;
    if !rem.is_empty() {
        error!("{} trailing bytes after certificate", rem.len());
        return Err(VerificationError::CertificateDecode(format!(
            "{} trailing bytes",
            rem.len()
        )));
    }
    Ok(cert)
}

/// Reads the tcg-dice-MultiTcbInfo extension of `cert`.
///
/// A certificate without the extension yields an empty list. The extension must be marked
/// critical when present, and may appear at most once.
pub fn get_multi_tcb_info(cert: &X509Certificate) -> Result<TcgMultiTcbInfo, VerificationError> {
    let ext = cert
        .get_extension_unique(&TCG_DICE_MULTI_TCB_INFO_OID)
        .map_err(|err| {
            error!("Certificate repeats the MultiTcbInfo extension: {err}");
            VerificationError::CertificateDecode(err.to_string())
        })?;
    let Some(ext) = ext else {
        debug!("Certificate has no MultiTcbInfo extension");
        return Ok(TcgMultiTcbInfo::new());
    };

    if !ext.critical {
        error!("TCG DICE MultiTcbInfo extension is not marked as CRITICAL");
        return Err(VerificationError::ExtensionNotCritical);
    }

    let multi_tcb_info = decode_multi_tcb_info(ext.value).map_err(|err| {
        error!("Failed to unmarshal MultiTcbInfo field: {err:?}");
        VerificationError::ExtensionDecode(format!("{err:?}"))
    })?;
    debug!("MultiTcbInfo holds {} records", multi_tcb_info.len());
    Ok(multi_tcb_info)
}

/// Certifies a key for `handle` and returns the TcbInfo of the layer that owns it.
///
/// CertifyKey may rotate the handle; `handle` is updated with the value the DPE returned as
/// soon as the call succeeds, even if the certificate later fails to decode.
///
/// The label is all zeroes at the profile's digest size. This only reads back the identity
/// already bound to the context, so a fixed label is enough.
pub fn get_tcb_info_for_handle(
    client: &mut impl DpeClient,
    handle: &mut ContextHandle,
) -> Result<DiceTcbInfo, VerificationError> {
    let profile = client.get_profile()?;
    if !profile.flags.contains(Support::X509) {
        warn!("DPE does not advertise X.509 support, CertifyKey may be rejected");
    }
    let label = vec![0u8; profile.profile.get_hash_size()];

    let certified_key = client.certify_key(
        handle,
        &label,
        CertifyKeyFormat::X509,
        CertifyKeyFlags::empty(),
    )?;
    *handle = certified_key.new_context_handle;

    let leaf_cert = parse_certificate(&certified_key.certificate)?;
    let multi_tcb_info = get_multi_tcb_info(&leaf_cert)?;

    // Leaf layer first.
    multi_tcb_info.into_iter().next().ok_or_else(|| {
        error!("Certificate MultiTcbInfo is empty");
        VerificationError::EmptyTcbInfo
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcb_info::tests::{encode_multi_tcb_info, test_tcb_info};
    use dpe_abi::{
        commands::{Command, CommandHdr},
        response::{
            CertifyKeyResp, DpeErrorCode, GetCertificateChainResp, GetProfileResp,
            GetTaggedTciResp, NewHandleResp, ResponseHdr,
        },
        Client, DpeClientError, DpeProfile, TciTag, Transport, RESP_MAGIC,
    };
    use openssl::{
        asn1::{Asn1Object, Asn1OctetString, Asn1Time},
        bn::BigNum,
        ec::{EcGroup, EcKey},
        hash::MessageDigest,
        nid::Nid,
        pkey::PKey,
        x509::{extension::BasicConstraints, X509Builder, X509Extension, X509NameBuilder},
    };
    use std::io;
    use zerocopy::{FromBytes, IntoBytes};

    const ROTATED_HANDLE: ContextHandle = ContextHandle([0xc5; ContextHandle::SIZE]);

    /// Mints a self-signed leaf. `tcb_ext` is (critical, extension value).
    fn build_cert(tcb_ext: Option<(bool, &[u8])>) -> Vec<u8> {
        match tcb_ext {
            Some(ext) => build_cert_with_exts(&[ext]),
            None => build_cert_with_exts(&[]),
        }
    }

    /// Mints a self-signed leaf carrying one MultiTcbInfo extension per entry of `tcb_exts`.
    fn build_cert_with_exts(tcb_exts: &[(bool, &[u8])]) -> Vec<u8> {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "DPE Leaf").unwrap();
        let name = name.build();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(365).unwrap())
            .unwrap();
        builder
            .append_extension(BasicConstraints::new().critical().build().unwrap())
            .unwrap();

        for &(critical, value) in tcb_exts {
            let oid = Asn1Object::from_str("2.23.133.5.4.5").unwrap();
            let value = Asn1OctetString::new_from_bytes(value).unwrap();
            builder
                .append_extension(X509Extension::new_from_der(&oid, critical, &value).unwrap())
                .unwrap();
        }

        builder.sign(&key, MessageDigest::sha256()).unwrap();
        builder.build().to_der().unwrap()
    }

    fn multi_tcb_info_of(der: &[u8]) -> Result<TcgMultiTcbInfo, VerificationError> {
        get_multi_tcb_info(&parse_certificate(der).unwrap())
    }

    struct CertifyKeyCall {
        handle: ContextHandle,
        label: Vec<u8>,
        format: CertifyKeyFormat,
        flags: CertifyKeyFlags,
    }

    /// Answers GetProfile and CertifyKey from fixed data.
    struct TestClient {
        profile: DpeProfile,
        certificate: Vec<u8>,
        certify_error: Option<DpeClientError>,
        calls: Vec<CertifyKeyCall>,
    }

    impl TestClient {
        fn new(profile: DpeProfile, certificate: Vec<u8>) -> Self {
            TestClient {
                profile,
                certificate,
                certify_error: None,
                calls: Vec::new(),
            }
        }
    }

    const UNSUPPORTED: DpeClientError = DpeClientError::Device(DpeErrorCode::InvalidCommand);

    impl DpeClient for TestClient {
        fn get_profile(&mut self) -> Result<GetProfileResp, DpeClientError> {
            Ok(GetProfileResp {
                profile: self.profile,
                major_version: 0,
                minor_version: 8,
                vendor_id: 0,
                vendor_sku: 0,
                max_tci_nodes: 24,
                flags: Support::X509,
            })
        }

        fn initialize_context(
            &mut self,
            _cmd: dpe_abi::commands::InitCtxCmd,
        ) -> Result<NewHandleResp, DpeClientError> {
            Err(UNSUPPORTED)
        }

        fn destroy_context(&mut self, _: &ContextHandle, _: bool) -> Result<(), DpeClientError> {
            Err(UNSUPPORTED)
        }

        fn certify_key(
            &mut self,
            handle: &ContextHandle,
            label: &[u8],
            format: CertifyKeyFormat,
            flags: CertifyKeyFlags,
        ) -> Result<CertifyKeyResp, DpeClientError> {
            self.calls.push(CertifyKeyCall {
                handle: *handle,
                label: label.to_vec(),
                format,
                flags,
            });
            if let Some(err) = self.certify_error {
                return Err(err);
            }
            Ok(CertifyKeyResp {
                new_context_handle: ROTATED_HANDLE,
                derived_pubkey_x: vec![0; self.profile.get_ecc_int_size()],
                derived_pubkey_y: vec![0; self.profile.get_ecc_int_size()],
                certificate: self.certificate.clone(),
            })
        }

        fn get_certificate_chain(
            &mut self,
            _: u32,
            _: u32,
        ) -> Result<GetCertificateChainResp, DpeClientError> {
            Err(UNSUPPORTED)
        }

        fn tag_tci(
            &mut self,
            _: &ContextHandle,
            _: TciTag,
        ) -> Result<NewHandleResp, DpeClientError> {
            Err(UNSUPPORTED)
        }

        fn get_tagged_tci(&mut self, _: TciTag) -> Result<GetTaggedTciResp, DpeClientError> {
            Err(UNSUPPORTED)
        }
    }

    #[test]
    fn test_missing_extension_is_empty() {
        let _ = env_logger::builder().is_test(true).try_init();
        assert!(multi_tcb_info_of(&build_cert(None)).unwrap().is_empty());
    }

    #[test]
    fn test_non_critical_extension() {
        let valid = encode_multi_tcb_info(&[test_tcb_info(0, 0x11)]);
        assert_eq!(
            Err(VerificationError::ExtensionNotCritical),
            multi_tcb_info_of(&build_cert(Some((false, &valid))))
        );
        // The payload is never looked at.
        assert_eq!(
            Err(VerificationError::ExtensionNotCritical),
            multi_tcb_info_of(&build_cert(Some((false, &[0xde, 0xad]))))
        );
    }

    #[test]
    fn test_malformed_extension() {
        for value in [&[0xde, 0xad][..], &[0x04, 0x00], &[0x30, 0x03, 0x02, 0x01, 0x01]] {
            assert!(matches!(
                multi_tcb_info_of(&build_cert(Some((true, value)))),
                Err(VerificationError::ExtensionDecode(_))
            ));
        }
    }

    #[test]
    fn test_repeated_extension() {
        let valid = encode_multi_tcb_info(&[test_tcb_info(0, 0x11)]);

        // A second copy must not slip past the criticality or decode checks.
        let der = build_cert_with_exts(&[(true, &valid), (false, &[0xde, 0xad])]);
        assert!(matches!(
            multi_tcb_info_of(&der),
            Err(VerificationError::CertificateDecode(_))
        ));

        // Two well-formed copies are still one too many.
        let der = build_cert_with_exts(&[(true, &valid), (true, &valid)]);
        assert!(matches!(
            multi_tcb_info_of(&der),
            Err(VerificationError::CertificateDecode(_))
        ));

        let mut client = TestClient::new(DpeProfile::P256Sha256, der);
        assert!(matches!(
            get_tcb_info_for_handle(&mut client, &mut ContextHandle::default()),
            Err(VerificationError::CertificateDecode(_))
        ));
    }

    #[test]
    fn test_multi_tcb_info_round_trip() {
        for n in 1..=4u8 {
            let infos: Vec<DiceTcbInfo> = (0..n)
                .map(|i| test_tcb_info(u64::from(n - i), i.wrapping_mul(0x31)))
                .collect();
            let der = build_cert(Some((true, &encode_multi_tcb_info(&infos))));
            assert_eq!(Ok(infos), multi_tcb_info_of(&der));
        }
    }

    #[test]
    fn test_parse_certificate_rejects_non_der() {
        assert!(matches!(
            parse_certificate(b"-----BEGIN CERTIFICATE-----"),
            Err(VerificationError::CertificateDecode(_))
        ));

        let mut der = build_cert(None);
        der.push(0);
        assert!(matches!(
            parse_certificate(&der),
            Err(VerificationError::CertificateDecode(_))
        ));
    }

    #[test]
    fn test_tcb_info_for_handle_returns_leaf() {
        let infos = [
            test_tcb_info(2, 0xaa),
            test_tcb_info(1, 0xbb),
            test_tcb_info(0, 0xcc),
        ];
        let der = build_cert(Some((true, &encode_multi_tcb_info(&infos))));
        let mut client = TestClient::new(DpeProfile::P256Sha256, der);
        let mut handle = ContextHandle::default();

        assert_eq!(
            Ok(infos[0].clone()),
            get_tcb_info_for_handle(&mut client, &mut handle)
        );
        assert_eq!(handle, ROTATED_HANDLE);

        let call = &client.calls[0];
        assert_eq!(call.handle, ContextHandle::default());
        assert_eq!(call.format, CertifyKeyFormat::X509);
        assert_eq!(call.flags, CertifyKeyFlags::empty());
    }

    #[test]
    fn test_label_matches_profile_digest() {
        for profile in [DpeProfile::P256Sha256, DpeProfile::P384Sha384] {
            let der = build_cert(Some((true, &encode_multi_tcb_info(&[test_tcb_info(0, 1)]))));
            let mut client = TestClient::new(profile, der);
            get_tcb_info_for_handle(&mut client, &mut ContextHandle::default()).unwrap();

            let label = &client.calls[0].label;
            assert_eq!(label.len(), profile.get_hash_size());
            assert!(label.iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_tcb_info_for_handle_empty() {
        // Extension present with no records.
        let der = build_cert(Some((true, &encode_multi_tcb_info(&[]))));
        let mut client = TestClient::new(DpeProfile::P256Sha256, der);
        assert_eq!(
            Err(VerificationError::EmptyTcbInfo),
            get_tcb_info_for_handle(&mut client, &mut ContextHandle::default())
        );

        // No extension at all leaves nothing to return either.
        let mut client = TestClient::new(DpeProfile::P256Sha256, build_cert(None));
        assert_eq!(
            Err(VerificationError::EmptyTcbInfo),
            get_tcb_info_for_handle(&mut client, &mut ContextHandle::default())
        );
    }

    #[test]
    fn test_tcb_info_for_handle_errors() {
        let mut client = TestClient::new(DpeProfile::P256Sha256, vec![0x30, 0x00]);
        let mut handle = ContextHandle::default();
        assert!(matches!(
            get_tcb_info_for_handle(&mut client, &mut handle),
            Err(VerificationError::CertificateDecode(_))
        ));
        // The DPE already rotated the handle.
        assert_eq!(handle, ROTATED_HANDLE);

        let der = build_cert(Some((false, &encode_multi_tcb_info(&[test_tcb_info(0, 1)]))));
        let mut client = TestClient::new(DpeProfile::P256Sha256, der);
        assert_eq!(
            Err(VerificationError::ExtensionNotCritical),
            get_tcb_info_for_handle(&mut client, &mut ContextHandle::default())
        );

        let mut client = TestClient::new(DpeProfile::P256Sha256, Vec::new());
        client.certify_error = Some(DpeClientError::Device(DpeErrorCode::InvalidHandle));
        let mut handle = ContextHandle::default();
        assert_eq!(
            Err(VerificationError::Client(DpeClientError::Device(
                DpeErrorCode::InvalidHandle
            ))),
            get_tcb_info_for_handle(&mut client, &mut handle)
        );
        assert!(handle.is_default());
    }

    /// A byte-level stand-in for a DPE that answers GetProfile and CertifyKey.
    struct SimTransport {
        profile: DpeProfile,
        certificate: Vec<u8>,
        response_magic: u32,
        labels: Vec<Vec<u8>>,
    }

    impl SimTransport {
        fn new(profile: DpeProfile, certificate: Vec<u8>) -> Self {
            SimTransport {
                profile,
                certificate,
                response_magic: RESP_MAGIC,
                labels: Vec::new(),
            }
        }
    }

    impl Transport for SimTransport {
        fn send(&mut self, cmd: &[u8]) -> io::Result<Vec<u8>> {
            let (hdr, payload) = CommandHdr::read_from_prefix(cmd)
                .map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;
            let mut resp = ResponseHdr {
                magic: self.response_magic,
                status: 0,
                profile: self.profile as u32,
            }
            .as_bytes()
            .to_vec();

            let ecc = self.profile.get_ecc_int_size();
            match hdr.cmd_id {
                Command::GET_PROFILE => {
                    for half in [0u16, 8] {
                        resp.extend_from_slice(&half.to_le_bytes());
                    }
                    for word in [0u32, 0, 24, Support::X509.bits()] {
                        resp.extend_from_slice(&word.to_le_bytes());
                    }
                }
                Command::CERTIFY_KEY => {
                    // handle, flags, format, label
                    self.labels.push(payload[ContextHandle::SIZE + 8..].to_vec());
                    resp.extend_from_slice(&ROTATED_HANDLE.0);
                    resp.extend(vec![0x01; ecc]);
                    resp.extend(vec![0x02; ecc]);
                    resp.extend_from_slice(&(self.certificate.len() as u32).to_le_bytes());
                    resp.extend_from_slice(&self.certificate);
                }
                _ => return Err(io::ErrorKind::Unsupported.into()),
            }
            Ok(resp)
        }
    }

    #[test]
    fn test_tcb_info_over_abi_client() {
        let _ = env_logger::builder().is_test(true).try_init();
        let infos = [test_tcb_info(1, 0x10), test_tcb_info(0, 0x20)];
        let der = build_cert(Some((true, &encode_multi_tcb_info(&infos))));

        let transport = SimTransport::new(DpeProfile::P384Sha384, der);
        let mut client = Client::new(transport).unwrap();
        let mut handle = ContextHandle::default();

        assert_eq!(
            Ok(infos[0].clone()),
            get_tcb_info_for_handle(&mut client, &mut handle)
        );
        assert_eq!(handle, ROTATED_HANDLE);
        assert_eq!(client.into_transport().labels, vec![vec![0u8; 48]]);
    }

    #[test]
    fn test_tcb_info_over_abi_client_bad_magic() {
        let der = build_cert(Some((true, &encode_multi_tcb_info(&[test_tcb_info(0, 1)]))));
        let mut transport = SimTransport::new(DpeProfile::P256Sha256, der);
        transport.response_magic = 0x4450_4543;
        let mut client = Client::with_profile(transport, DpeProfile::P256Sha256);

        assert_eq!(
            Err(VerificationError::Client(DpeClientError::ProtocolFraming(
                0x4450_4543
            ))),
            get_tcb_info_for_handle(&mut client, &mut ContextHandle::default())
        );
    }
}
