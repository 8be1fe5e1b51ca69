//! Placeholder, calculation, and verification of apex digest records.

use hickory_proto::rr::RecordType;
use tracing::{error, info, warn};

use crate::digest::DigestAlgorithm;
use crate::error::ZoneDigestError;
use crate::rr::{DigestRdata, Record};
use crate::sign::ZoneSigningKey;
use crate::zone::Zone;

/// Replace any existing apex digest records with all-zero placeholders
/// for the requested digest types.
///
/// Duplicate requests are coalesced with a warning, first occurrence
/// winning. The placeholder carries the SOA serial and the SOA record's
/// TTL, so the digest covers a record of the final shape.
///
/// # Errors
///
/// Fails when the zone has no SOA, or when a requested digest type cannot
/// be produced.
pub fn add_placeholders(zone: &mut Zone, digest_types: &[u8]) -> Result<(), ZoneDigestError> {
    info!("removing existing digest records at apex");
    zone.remove_at_apex(zone.codec().digest_type(), None);

    let soa = zone.soa().ok_or(ZoneDigestError::MissingSoa)?;
    let serial = zone.serial();
    let ttl = soa.ttl();

    let mut seen = Vec::with_capacity(digest_types.len());
    for &code in digest_types {
        if seen.contains(&code) {
            warn!("ignoring duplicate digest type {code}");
            continue;
        }
        seen.push(code);

        let algorithm = DigestAlgorithm::from_code(code)?;
        let data = DigestRdata::placeholder(serial, algorithm);
        let record = Record::from_rdata(
            zone.origin().clone(),
            ttl,
            data.pack(zone.codec().digest_type_code()),
        );

        info!("add placeholder digest record with digest type {code}");
        zone.add_record(record)?;
    }

    Ok(())
}

/// Compute the zone digest for every apex digest record and patch the
/// digest bytes in place, preserving serial, digest type, and parameter.
///
/// When a signing key is supplied, stale signatures over the digest
/// record set are dropped and fresh RRSIGs are inserted.
///
/// # Errors
///
/// Fails when no apex digest record exists (use placeholders first), or
/// when a record names a digest type that cannot be produced.
pub fn calculate(zone: &mut Zone, key: Option<&ZoneSigningKey>) -> Result<(), ZoneDigestError> {
    let found = zone.apex_digest_records();
    if found.is_empty() {
        return Err(ZoneDigestError::MissingDigestRecord);
    }

    let mut updated = Vec::with_capacity(found.len());
    for record in found {
        let data = DigestRdata::unpack(record.rdata())?;
        let algorithm = DigestAlgorithm::from_code(data.algorithm())?;

        info!("calculating digest for type {}", data.algorithm());
        let digest = zone.digest(algorithm)?;

        let mut patched = record.clone();
        patched.set_data(
            data.with_digest(digest)
                .pack(zone.codec().digest_type_code()),
        );
        updated.push(patched);
    }

    zone.remove_at_apex(zone.codec().digest_type(), None);
    for record in &updated {
        zone.add_record(record.clone())?;
    }

    if let Some(key) = key {
        let rrsigs = key.sign(zone.origin(), &updated)?;
        zone.remove_at_apex(RecordType::RRSIG, Some(zone.codec().digest_type()));
        for rrsig in rrsigs {
            zone.add_record(rrsig)?;
        }
    }

    Ok(())
}

/// Check every apex digest record against a freshly computed digest.
///
/// Serial mismatches against the SOA and digest mismatches set the
/// failure bit without aborting; unsupported digest types are reported
/// and skipped. Returns true when everything checked out.
///
/// # Errors
///
/// Fails when no apex digest record exists.
pub fn verify(zone: &mut Zone) -> Result<bool, ZoneDigestError> {
    let found = zone.apex_digest_records();
    if found.is_empty() {
        return Err(ZoneDigestError::MissingDigestRecord);
    }

    let soa_serial = zone.serial();
    let mut ok = true;

    for record in found {
        let data = DigestRdata::unpack(record.rdata())?;

        if data.serial() != soa_serial {
            warn!(
                "SOA serial ({soa_serial}) does not match digest record serial ({})",
                data.serial()
            );
            ok = false;
        }

        let algorithm = match DigestAlgorithm::from_code(data.algorithm()) {
            Ok(algorithm) => algorithm,
            Err(_) => {
                warn!("unable to verify unsupported digest type {}", data.algorithm());
                continue;
            }
        };

        let calculated = zone.digest(algorithm)?;
        if calculated != data.digest() {
            error!(
                "found and calculated digests for type {} do NOT match",
                data.algorithm()
            );
            error!("found     : {}", hex::encode(data.digest()));
            error!("calculated: {}", hex::encode(&calculated));
            ok = false;
        } else {
            info!(
                "found and calculated digests for type {} match",
                data.algorithm()
            );
        }
    }

    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DigestRecordType;
    use crate::rr::{Name, SerialNumber};
    use crate::store::{Backend, DEFAULT_TREE_WIDTH};
    use std::str::FromStr;

    const ZONE: &str = "\
example.com. 3600 IN SOA ns1.example.com. hostmaster.example.com. 2024010101 7200 3600 1209600 3600
example.com. 3600 IN NS ns1.example.com.
ns1.example.com. 3600 IN A 192.0.2.53
www.example.com. 300 IN A 192.0.2.80
";

    fn load(backend: Backend) -> Zone {
        Zone::from_text(
            Name::from_str("example.com.").unwrap(),
            ZONE,
            backend,
            DigestRecordType::Standard,
        )
        .unwrap()
    }

    #[test]
    fn test_placeholder_shape() {
        let mut zone = load(Backend::Flat);
        add_placeholders(&mut zone, &[1]).unwrap();

        let records = zone.apex_digest_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ttl(), 3600.into());

        let data = DigestRdata::unpack(records[0].rdata()).unwrap();
        assert_eq!(data.serial(), SerialNumber::from(2024010101));
        assert_eq!(data.algorithm(), 1);
        assert_eq!(data.reserved(), 0);
        assert_eq!(data.digest(), &[0u8; 48]);
    }

    #[test]
    fn test_duplicate_placeholder_coalesced() {
        crate::subscribe();
        let mut zone = load(Backend::Flat);
        add_placeholders(&mut zone, &[1, 1]).unwrap();
        assert_eq!(zone.apex_digest_records().len(), 1);
    }

    #[test]
    fn test_placeholders_replace_existing() {
        let mut zone = load(Backend::Flat);
        add_placeholders(&mut zone, &[1, 2]).unwrap();
        assert_eq!(zone.apex_digest_records().len(), 2);

        add_placeholders(&mut zone, &[1]).unwrap();
        assert_eq!(zone.apex_digest_records().len(), 1);
    }

    #[test]
    fn test_unsupported_placeholder_aborts() {
        let mut zone = load(Backend::Flat);
        assert!(matches!(
            add_placeholders(&mut zone, &[240]),
            Err(ZoneDigestError::UnsupportedAlgorithm(240))
        ));
    }

    #[test]
    fn test_calculate_requires_digest_record() {
        let mut zone = load(Backend::Flat);
        assert!(matches!(
            calculate(&mut zone, None),
            Err(ZoneDigestError::MissingDigestRecord)
        ));
        assert!(matches!(
            verify(&mut zone),
            Err(ZoneDigestError::MissingDigestRecord)
        ));
    }

    #[test]
    fn test_calculate_then_verify() {
        let mut zone = load(Backend::Flat);
        add_placeholders(&mut zone, &[1]).unwrap();
        calculate(&mut zone, None).unwrap();

        let data = DigestRdata::unpack(zone.apex_digest_records()[0].rdata()).unwrap();
        assert_ne!(data.digest(), &[0u8; 48]);
        assert!(verify(&mut zone).unwrap());
    }

    #[test]
    fn test_calculate_then_verify_multiple_algorithms() {
        let mut zone = load(Backend::Tree {
            depth: 2,
            width: DEFAULT_TREE_WIDTH,
        });
        add_placeholders(&mut zone, &[1, 2]).unwrap();
        calculate(&mut zone, None).unwrap();
        assert!(verify(&mut zone).unwrap());
    }

    #[test]
    fn test_verify_detects_mutation() {
        crate::subscribe();
        let mut zone = load(Backend::Flat);
        add_placeholders(&mut zone, &[1]).unwrap();
        calculate(&mut zone, None).unwrap();

        zone.apply_update("add sneaky.example.com. 300 IN A 192.0.2.66\n")
            .unwrap();
        assert!(!verify(&mut zone).unwrap());
    }

    #[test]
    fn test_verify_flags_serial_mismatch() {
        crate::subscribe();
        let mut zone = load(Backend::Flat);
        add_placeholders(&mut zone, &[1]).unwrap();
        calculate(&mut zone, None).unwrap();

        // Replace the SOA with one carrying a newer serial.
        zone.apply_update(concat!(
            "del example.com. 3600 IN SOA ns1.example.com. hostmaster.example.com. 2024010101 7200 3600 1209600 3600\n",
            "add example.com. 3600 IN SOA ns1.example.com. hostmaster.example.com. 2024010102 7200 3600 1209600 3600\n",
        ))
        .unwrap();
        assert!(!verify(&mut zone).unwrap());
    }

    #[test]
    fn test_verify_skips_unknown_digest_type() {
        crate::subscribe();
        let mut zone = load(Backend::Flat);

        // A digest record of an unassigned type is reported and skipped,
        // not counted as a failure.
        let data = DigestRdata::new(zone.serial(), 200, vec![0xaa; 16]);
        let record = Record::from_rdata(
            zone.origin().clone(),
            3600.into(),
            data.pack(zone.codec().digest_type_code()),
        );
        zone.add_record(record).unwrap();

        assert!(verify(&mut zone).unwrap());
    }
}
