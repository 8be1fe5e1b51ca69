use hickory_proto::rr::{LowerName, RecordType};

use crate::codec::RecordCodec;
use crate::digest::DigestAlgorithm;
use crate::error::ZoneDigestError;
use crate::rr::Record;

use super::ZoneStore;

/// A zone store holding an unordered record list; canonical order is
/// produced on demand by sorting.
#[derive(Debug)]
pub struct FlatStore {
    origin: LowerName,
    records: Vec<Record>,
}

impl FlatStore {
    pub fn new(origin: LowerName) -> Self {
        FlatStore {
            origin,
            records: Vec::new(),
        }
    }

    fn is_apex(&self, record: &Record) -> bool {
        LowerName::new(record.name()) == self.origin
    }
}

impl ZoneStore for FlatStore {
    fn add(&mut self, record: Record) -> Result<(), ZoneDigestError> {
        self.records.push(record);
        Ok(())
    }

    fn remove_at_apex(&mut self, rtype: RecordType, covered: Option<RecordType>) -> Vec<Record> {
        let mut kept = Vec::with_capacity(self.records.len());
        let mut removed = Vec::new();

        for record in self.records.drain(..) {
            let matches = LowerName::new(record.name()) == self.origin
                && record.record_type() == rtype
                && (rtype != RecordType::RRSIG || record.rrsig_type_covered() == covered);
            if matches {
                removed.push(record);
            } else {
                kept.push(record);
            }
        }

        self.records = kept;
        removed
    }

    fn remove_record(&mut self, record: &Record) -> Result<bool, ZoneDigestError> {
        match self.records.iter().position(|existing| existing == record) {
            Some(index) => {
                self.records.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn records_canonical(&self) -> Vec<&Record> {
        let mut records: Vec<&Record> = self.records.iter().collect();
        records.sort_unstable();
        records
    }

    fn apex_records(&self) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|record| self.is_apex(record))
            .collect()
    }

    fn digest(
        &mut self,
        codec: &RecordCodec,
        algorithm: DigestAlgorithm,
    ) -> Result<Vec<u8>, ZoneDigestError> {
        let records = self.records_canonical();
        let mut ctx = algorithm.context();
        codec.digest_records(&records, &mut ctx)?;
        Ok(ctx.finish())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
