use hickory_proto::rr::{RData, RecordType, rdata::NULL};

use crate::digest::DigestAlgorithm;
use crate::error::ZoneDigestError;

use super::SerialNumber;

/// The RDATA of an apex zone digest record.
///
/// ```text
///                        1 1 1 1 1 1 1 1 1 1 2 2 2 2 2 2 2 2 2 2 3 3
///    0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |                             Serial                            |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |  Digest Type  |   Reserved    |                               |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               |
///   |                             Digest                            |
///   /                                                               /
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The serial mirrors the SOA serial at the time the digest was produced,
/// the digest type names the hash algorithm, and the reserved byte is
/// written as zero. Because the surrounding DNS library predates this
/// record type, the four fields travel as a single opaque RDATA with the
/// digest at offset 6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestRdata {
    serial: SerialNumber,
    algorithm: u8,
    reserved: u8,
    digest: Vec<u8>,
}

/// Offsets into the opaque RDATA blob.
const DIGEST_OFFSET: usize = 6;

impl DigestRdata {
    pub fn new(serial: SerialNumber, algorithm: u8, digest: Vec<u8>) -> Self {
        DigestRdata {
            serial,
            algorithm,
            reserved: 0,
            digest,
        }
    }

    /// A digest record body with the digest bytes zeroed at the
    /// algorithm's output length, inserted before the true digest is
    /// known so that the record itself is covered by the hash.
    pub fn placeholder(serial: SerialNumber, algorithm: DigestAlgorithm) -> Self {
        DigestRdata {
            serial,
            algorithm: algorithm.code(),
            reserved: 0,
            digest: vec![0; algorithm.digest_len()],
        }
    }

    pub fn serial(&self) -> SerialNumber {
        self.serial
    }

    pub fn algorithm(&self) -> u8 {
        self.algorithm
    }

    pub fn reserved(&self) -> u8 {
        self.reserved
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// A copy with new digest bytes; serial, algorithm, and the reserved
    /// byte are preserved.
    pub fn with_digest(&self, digest: Vec<u8>) -> Self {
        DigestRdata {
            digest,
            ..self.clone()
        }
    }

    /// A copy with the digest bytes zeroed, as hashed.
    ///
    /// The zeroed length is the algorithm's output size when the
    /// algorithm is known, and the stored length otherwise.
    pub fn zeroized(&self) -> Self {
        let len = DigestAlgorithm::from_code(self.algorithm)
            .map(|algorithm| algorithm.digest_len())
            .unwrap_or(self.digest.len());
        self.with_digest(vec![0; len])
    }

    /// Read the digest fields out of an opaque RDATA.
    pub fn unpack(rdata: &RData) -> Result<Self, ZoneDigestError> {
        let RData::Unknown { rdata: blob, .. } = rdata else {
            return Err(ZoneDigestError::MalformedDigestRecord(
                "expected opaque RDATA",
            ));
        };

        let buf = blob.anything();
        if buf.len() < DIGEST_OFFSET {
            return Err(ZoneDigestError::MalformedDigestRecord("RDATA too short"));
        }

        Ok(DigestRdata {
            serial: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]).into(),
            algorithm: buf[4],
            reserved: buf[5],
            digest: buf[DIGEST_OFFSET..].to_vec(),
        })
    }

    /// Pack the digest fields into an opaque RDATA under the given record
    /// type code.
    pub fn pack(&self, type_code: u16) -> RData {
        let mut buf = Vec::with_capacity(DIGEST_OFFSET + self.digest.len());
        buf.extend_from_slice(&self.serial.get().to_be_bytes());
        buf.push(self.algorithm);
        buf.push(self.reserved);
        buf.extend_from_slice(&self.digest);

        RData::Unknown {
            code: RecordType::Unknown(type_code),
            rdata: NULL::with(buf),
        }
    }
}
