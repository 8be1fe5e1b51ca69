use std::{fs, io, path::Path};

use hickory_proto::rr::{LowerName, Name, RecordType};
use hickory_proto::serialize::txt::Parser;
use tracing::{debug, error, info, warn};

use crate::codec::{DigestRecordType, RecordCodec};
use crate::digest::DigestAlgorithm;
use crate::error::ZoneDigestError;
use crate::rr::{Record, SerialNumber, TimeToLive};
use crate::store::{Backend, ZoneStore};

/// Counters for an applied update file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateStats {
    pub additions: usize,
    pub deletions: usize,
}

/// A DNS zone held in memory for digest maintenance.
///
/// Created once from an input zone file, mutated by placeholder insertion,
/// digest patching, and incremental updates, then written out or
/// discarded.
#[derive(Debug)]
pub struct Zone {
    origin: Name,
    origin_lower: LowerName,
    codec: RecordCodec,
    store: Box<dyn ZoneStore>,
}

impl Zone {
    /// Load a zone from a DNS zone file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// zone has no SOA record.
    pub fn read_from_file(
        origin: Name,
        path: impl AsRef<Path>,
        backend: Backend,
        digest_type: DigestRecordType,
    ) -> Result<Self, ZoneDigestError> {
        let zone_path = path.as_ref();
        info!("loading zone file: {:?}", zone_path);

        let buf = fs::read_to_string(zone_path).inspect_err(|e| {
            error!("failed to read {}: {:?}", zone_path.display(), e);
        })?;

        Self::from_text(origin, &buf, backend, digest_type)
    }

    /// Load a zone from zone-file text.
    ///
    /// Records whose owner falls outside the origin are dropped with a
    /// warning; the digest record and RRSIG shapes the library parser
    /// predates are handled by the codec.
    pub fn from_text(
        origin: Name,
        text: &str,
        backend: Backend,
        digest_type: DigestRecordType,
    ) -> Result<Self, ZoneDigestError> {
        let codec = RecordCodec::new(origin.clone(), digest_type);
        let origin_lower = LowerName::new(&origin);
        let store = backend.build(origin_lower.clone())?;

        let mut zone = Zone {
            origin,
            origin_lower,
            codec,
            store,
        };

        let extracted = zone.codec.extract_owned_lines(text, TimeToLive::ZERO)?;
        let (parsed_origin, rrsets) =
            Parser::new(extracted.passthrough, None, Some(zone.origin.clone()))
                .parse()
                .map_err(|e| {
                    error!("failed to parse zone: {e}");
                    ZoneDigestError::ZoneFile(e.to_string())
                })?;
        debug!("parsed zone {parsed_origin} with {} record sets", rrsets.len());

        let mut count = 0;
        for rrset in rrsets.into_values() {
            for record in rrset.records_without_rrsigs() {
                count += zone.insert_loaded(record.clone().into())?;
            }
        }
        for record in extracted.records {
            count += zone.insert_loaded(record)?;
        }

        if zone.soa().is_none() {
            return Err(ZoneDigestError::MissingSoa);
        }

        info!("zone file loaded: {} with {} records", zone.origin, count);
        Ok(zone)
    }

    /// Insert a record from input, dropping out-of-zone data.
    fn insert_loaded(&mut self, record: Record) -> Result<usize, ZoneDigestError> {
        if !self.origin_lower.zone_of(&LowerName::new(record.name())) {
            warn!("ignoring out-of-zone data for '{}'", record.name());
            return Ok(0);
        }
        self.store.add(record)?;
        Ok(1)
    }
}

impl Zone {
    /// Get the name of this zone
    pub fn origin(&self) -> &Name {
        &self.origin
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    /// The zone's SOA record, from the apex.
    pub fn soa(&self) -> Option<Record> {
        self.store
            .apex_records()
            .into_iter()
            .find(|record| record.record_type() == RecordType::SOA)
            .cloned()
    }

    /// The serial number of this zone, from the SOA record.
    pub fn serial(&self) -> SerialNumber {
        self.soa()
            .as_ref()
            .and_then(|soa| soa.rdata().as_soa())
            .map_or(SerialNumber::ZERO, |soa| SerialNumber::from(soa.serial()))
    }

    /// Number of records in the zone.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Insert a record.
    pub fn add_record(&mut self, record: Record) -> Result<(), ZoneDigestError> {
        self.store.add(record)
    }

    /// Remove all apex records of `rtype` (RRSIGs filtered by their
    /// type-covered), returning the removed records.
    pub fn remove_at_apex(
        &mut self,
        rtype: RecordType,
        covered: Option<RecordType>,
    ) -> Vec<Record> {
        self.store.remove_at_apex(rtype, covered)
    }

    /// Apex records of the digest type, in order of appearance.
    pub fn apex_digest_records(&self) -> Vec<Record> {
        let digest_type = self.codec.digest_type();
        self.store
            .apex_records()
            .into_iter()
            .filter(|record| record.record_type() == digest_type)
            .cloned()
            .collect()
    }

    /// Compute the zone digest for one algorithm over the current store.
    pub fn digest(&mut self, algorithm: DigestAlgorithm) -> Result<Vec<u8>, ZoneDigestError> {
        self.store.digest(&self.codec, algorithm)
    }

    /// Apply incremental updates: one `add <rr>` or `del <rr>` directive
    /// per line, the record in presentation form relative to the origin.
    ///
    /// Directive lines that do not split into a command and a record body
    /// warn and are skipped; a record body that fails to parse aborts.
    /// `del` removes the first record equal in owner, type, class, and
    /// RDATA, and warns when nothing matches.
    pub fn apply_update(&mut self, text: &str) -> Result<UpdateStats, ZoneDigestError> {
        info!("updating zone...");
        let mut stats = UpdateStats::default();

        for (index, raw_line) in text.lines().enumerate() {
            let line = index + 1;
            let Some((command, rr_text)) = raw_line
                .trim_end()
                .split_once(|c: char| c.is_whitespace())
            else {
                warn!("update line {line}: unparseable input");
                continue;
            };
            let rr_text = rr_text.trim_start();
            if rr_text.is_empty() {
                warn!("update line {line}: unparseable input");
                continue;
            }

            let record = self
                .parse_rr(rr_text)
                .map_err(|error| ZoneDigestError::Update {
                    line,
                    reason: error.to_string(),
                })?;

            match command {
                "add" => {
                    self.store.add(record)?;
                    stats.additions += 1;
                }
                "del" => {
                    if self.store.remove_record(&record)? {
                        stats.deletions += 1;
                    } else {
                        warn!("update line {line}: no matching record to delete: {record}");
                    }
                }
                other => {
                    warn!("update line {line}: expected 'add' or 'del', found '{other}'");
                    continue;
                }
            }
        }

        info!("{} additions, {} deletions", stats.additions, stats.deletions);
        Ok(stats)
    }

    /// Parse a single record in presentation form, relative to the
    /// origin.
    fn parse_rr(&self, text: &str) -> Result<Record, ZoneDigestError> {
        let extracted = self.codec.extract_owned_lines(text, TimeToLive::ZERO)?;
        if let Some(record) = extracted.records.into_iter().next() {
            return Ok(record);
        }

        let snippet = format!("$TTL 0\n{text}\n");
        let (_, rrsets) = Parser::new(snippet, None, Some(self.origin.clone()))
            .parse()
            .map_err(|e| ZoneDigestError::ZoneFile(e.to_string()))?;

        rrsets
            .into_values()
            .flat_map(|rrset| {
                rrset
                    .records_without_rrsigs()
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .next()
            .map(Record::from)
            .ok_or_else(|| ZoneDigestError::ZoneFile("no record found".into()))
    }

    /// Write the zone in presentation format, records in canonical order.
    pub fn write_to<W: io::Write>(&self, out: &mut W) -> Result<(), ZoneDigestError> {
        let mut records = self.store.records_canonical();
        records.sort_unstable();

        for record in records {
            writeln!(out, "{}", self.codec.format_record(record))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_TREE_WIDTH;
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
    fn test_load_counts_records() {
        let zone = load(Backend::Flat);
        assert_eq!(zone.len(), 4);
        assert_eq!(zone.serial(), SerialNumber::from(2024010101));
    }

    #[test]
    fn test_load_requires_soa() {
        let result = Zone::from_text(
            Name::from_str("example.com.").unwrap(),
            "www.example.com. 300 IN A 192.0.2.80\n",
            Backend::Flat,
            DigestRecordType::Standard,
        );
        assert!(matches!(result, Err(ZoneDigestError::MissingSoa)));
    }

    #[test]
    fn test_load_drops_out_of_zone_records() {
        crate::subscribe();
        let text = format!("{ZONE}www.example.net. 300 IN A 192.0.2.99\n");
        let zone = Zone::from_text(
            Name::from_str("example.com.").unwrap(),
            &text,
            Backend::Flat,
            DigestRecordType::Standard,
        )
        .unwrap();

        assert_eq!(zone.len(), 4);
        let mut without = load(Backend::Flat);
        let mut with = zone;
        assert_eq!(
            with.digest(DigestAlgorithm::Sha384).unwrap(),
            without.digest(DigestAlgorithm::Sha384).unwrap()
        );
    }

    #[test]
    fn test_update_add_and_del_round_trip() {
        crate::subscribe();
        let mut zone = load(Backend::Tree {
            depth: 2,
            width: DEFAULT_TREE_WIDTH,
        });
        let before = zone.digest(DigestAlgorithm::Sha384).unwrap();

        let stats = zone
            .apply_update("add ftp.example.com. 300 IN A 192.0.2.21\n")
            .unwrap();
        assert_eq!(stats.additions, 1);
        assert_ne!(zone.digest(DigestAlgorithm::Sha384).unwrap(), before);

        let stats = zone
            .apply_update("del ftp.example.com. 300 IN A 192.0.2.21\n")
            .unwrap();
        assert_eq!(stats.deletions, 1);
        assert_eq!(zone.digest(DigestAlgorithm::Sha384).unwrap(), before);
    }

    #[test]
    fn test_update_skips_malformed_directives() {
        crate::subscribe();
        let mut zone = load(Backend::Flat);
        let stats = zone
            .apply_update("bogus ftp.example.com. 300 IN A 192.0.2.21\nnonsense\n")
            .unwrap();
        assert_eq!(stats, UpdateStats::default());
        assert_eq!(zone.len(), 4);
    }

    #[test]
    fn test_update_aborts_on_bad_record() {
        let mut zone = load(Backend::Flat);
        let result = zone.apply_update("add ftp.example.com. 300 IN A not-an-address\n");
        assert!(matches!(result, Err(ZoneDigestError::Update { line: 1, .. })));
    }

    #[test]
    fn test_write_round_trip_preserves_digest() {
        let mut zone = load(Backend::Flat);
        let digest = zone.digest(DigestAlgorithm::Sha384).unwrap();

        let mut out = Vec::new();
        zone.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut reloaded = Zone::from_text(
            Name::from_str("example.com.").unwrap(),
            &text,
            Backend::Flat,
            DigestRecordType::Standard,
        )
        .unwrap();
        assert_eq!(reloaded.digest(DigestAlgorithm::Sha384).unwrap(), digest);
    }
}
