//! Signing bridge for the apex digest record set.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::Utc;
use hickory_proto::dnssec::crypto::signing_key_from_der;
use hickory_proto::dnssec::rdata::{DNSKEY, DNSSECRData, RRSIG, SIG};
use hickory_proto::dnssec::{Algorithm, SigSigner, TBS};
use hickory_proto::rr::{DNSClass, Name, RData};
use rustls_pki_types::PrivateKeyDer;
use rustls_pki_types::pem::PemObject;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::ZoneDigestError;
use crate::rr::{AsHickory, Record, TimeToLive};

/// A private zone-signing key, loaded from disk.
///
/// Key material is held zeroized-on-drop. The key file carries no
/// algorithm identifier, so the algorithm is supplied by the caller,
/// along with a TTL that doubles as the validity window of produced
/// signatures.
#[derive(Clone)]
pub struct ZoneSigningKey {
    key_data: Zeroizing<Vec<u8>>,
    algorithm: Algorithm,
    ttl: TimeToLive,
}

impl fmt::Debug for ZoneSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneSigningKey")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ZoneSigningKey {
    /// Load key material from a PEM or DER file.
    pub fn load(
        path: impl AsRef<Path>,
        algorithm: Algorithm,
        ttl: TimeToLive,
    ) -> Result<Self, ZoneDigestError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;

        let key_data = if bytes.starts_with(b"-----BEGIN") {
            PrivateKeyDer::from_pem_slice(&bytes)
                .map_err(|error| ZoneDigestError::Key(format!("{}: {error}", path.display())))?
                .secret_der()
                .to_vec()
        } else {
            bytes
        };

        // Reject unusable key material now rather than mid-calculation.
        PrivateKeyDer::try_from(key_data.as_slice())
            .map_err(|error| ZoneDigestError::Key(format!("{}: {error}", path.display())))?;

        Ok(ZoneSigningKey {
            key_data: Zeroizing::new(key_data),
            algorithm,
            ttl,
        })
    }

    fn build(&self, name: Name) -> Result<SigSigner, ZoneDigestError> {
        let private = PrivateKeyDer::try_from(self.key_data.as_slice())
            .map_err(|error| ZoneDigestError::Key(error.to_string()))?;
        let key = signing_key_from_der(&private, self.algorithm)?;
        let public = key.to_public_key()?;

        Ok(SigSigner::dnssec(
            DNSKEY::from_key(&public),
            key,
            name,
            self.ttl.into(),
        ))
    }

    /// Produce RRSIGs over a record set at the zone apex.
    ///
    /// The public-key owner is fixed to the origin; the signature covers
    /// the records exactly as stored.
    pub fn sign(&self, origin: &Name, records: &[Record]) -> Result<Vec<Record>, ZoneDigestError> {
        let rrset_ttl = records
            .first()
            .map(Record::ttl)
            .ok_or(ZoneDigestError::MissingDigestRecord)?;
        let record_type = records[0].record_type();

        let signer = self.build(origin.clone())?;
        let inception = Utc::now();
        let expiration = inception + signer.sig_duration();

        debug!(
            "signing record set: {origin} {record_type} with {}",
            signer.key().algorithm()
        );

        let rrs: Vec<_> = records.iter().map(Record::as_hickory).collect();
        let tbs = TBS::from_sig(
            origin,
            DNSClass::IN,
            &SIG::new(
                record_type,
                signer.key().algorithm(),
                origin.num_labels(),
                rrset_ttl.into(),
                expiration.timestamp() as u32,
                inception.timestamp() as u32,
                signer.calculate_key_tag()?,
                signer.signer_name().clone(),
                Vec::new(), // Gets thrown away anyways.
            ),
            rrs.iter(),
        )?;

        let signature = signer.sign(&tbs)?;

        let rrsig = RRSIG::new(
            record_type,
            signer.key().algorithm(),
            origin.num_labels(),
            rrset_ttl.into(),
            expiration.timestamp() as u32,
            inception.timestamp() as u32,
            signer.calculate_key_tag()?,
            signer.signer_name().clone(),
            signature,
        );

        Ok(vec![Record::from_rdata(
            origin.clone(),
            rrset_ttl,
            RData::DNSSEC(DNSSECRData::RRSIG(rrsig)),
        )])
    }
}

/// Parse a DNSKEY algorithm from its mnemonic or registry number.
pub fn parse_key_algorithm(token: &str) -> Result<Algorithm, ZoneDigestError> {
    if let Ok(number) = token.parse::<u8>() {
        return Ok(Algorithm::from_u8(number));
    }

    match token.to_ascii_uppercase().as_str() {
        "RSASHA256" => Ok(Algorithm::RSASHA256),
        "RSASHA512" => Ok(Algorithm::RSASHA512),
        "ECDSAP256SHA256" => Ok(Algorithm::ECDSAP256SHA256),
        "ECDSAP384SHA384" => Ok(Algorithm::ECDSAP384SHA384),
        "ED25519" => Ok(Algorithm::ED25519),
        _ => Err(ZoneDigestError::Key(format!(
            "unknown key algorithm '{token}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::DigestRdata;
    use crate::rr::SerialNumber;
    use ring::rand::SystemRandom;
    use ring::signature::{ECDSA_P256_SHA256_FIXED_SIGNING, EcdsaKeyPair};
    use std::str::FromStr;

    fn generated_key_file() -> std::path::PathBuf {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng).unwrap();

        let mut path = std::env::temp_dir();
        path.push(format!("zone-digest-test-key-{}.der", std::process::id()));
        fs::write(&path, pkcs8.as_ref()).unwrap();
        path
    }

    #[test]
    fn test_sign_digest_record_set() {
        let path = generated_key_file();
        let key =
            ZoneSigningKey::load(&path, Algorithm::ECDSAP256SHA256, 3600.into()).unwrap();
        let _ = fs::remove_file(&path);

        let origin = Name::from_str("example.com.").unwrap();
        let data = DigestRdata::new(SerialNumber::from(2024010101), 1, vec![0xab; 48]);
        let record = Record::from_rdata(origin.clone(), 3600.into(), data.pack(63));

        let rrsigs = key.sign(&origin, std::slice::from_ref(&record)).unwrap();
        assert_eq!(rrsigs.len(), 1);
        assert_eq!(rrsigs[0].name(), &origin);
        assert_eq!(
            rrsigs[0].rrsig_type_covered(),
            Some(record.record_type())
        );
    }

    #[test]
    fn test_sign_empty_set_fails() {
        let path = generated_key_file();
        let key =
            ZoneSigningKey::load(&path, Algorithm::ECDSAP256SHA256, 3600.into()).unwrap();
        let _ = fs::remove_file(&path);

        let origin = Name::from_str("example.com.").unwrap();
        assert!(key.sign(&origin, &[]).is_err());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut path = std::env::temp_dir();
        path.push(format!("zone-digest-test-garbage-{}.der", std::process::id()));
        fs::write(&path, b"not a key").unwrap();

        let result = ZoneSigningKey::load(&path, Algorithm::ECDSAP256SHA256, 3600.into());
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(ZoneDigestError::Key(_))));
    }

    #[test]
    fn test_parse_key_algorithm() {
        assert_eq!(
            parse_key_algorithm("ECDSAP256SHA256").unwrap(),
            Algorithm::ECDSAP256SHA256
        );
        assert_eq!(parse_key_algorithm("13").unwrap(), Algorithm::ECDSAP256SHA256);
        assert!(parse_key_algorithm("bogus").is_err());
    }
}
