//! Zone record stores.
//!
//! Two interchangeable back-ends hold the zone's records: a flat list
//! that sorts on demand, and a fixed-shape hash tree that memoizes
//! per-subtree digests so localized edits recompute only the dirty path.
//! The back-end is selected at construction; the two produce different
//! apex digests (the tree digest is a Merkle-style construction), so
//! producer and verifier must be configured identically.

mod flat;
mod tree;

use std::fmt;

use hickory_proto::rr::{LowerName, RecordType};

pub use self::flat::FlatStore;
pub use self::tree::TreeStore;

use crate::codec::RecordCodec;
use crate::digest::DigestAlgorithm;
use crate::error::ZoneDigestError;
use crate::rr::Record;

/// Hash tree width used when none is configured.
pub const DEFAULT_TREE_WIDTH: usize = 13;

/// Runtime selection of the zone store implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// A flat record list, hashed in one pass.
    Flat,
    /// A hash tree of the given shape. Depth 0 degenerates to a single
    /// leaf and hashes identically to `Flat`.
    Tree { depth: u32, width: usize },
}

impl Backend {
    pub fn build(self, origin: LowerName) -> Result<Box<dyn ZoneStore>, ZoneDigestError> {
        match self {
            Backend::Flat => Ok(Box::new(FlatStore::new(origin))),
            Backend::Tree { depth, width } => {
                Ok(Box::new(TreeStore::new(origin, depth, width)?))
            }
        }
    }
}

/// Container of all in-zone records.
///
/// Mutations go through `&mut self` and may invalidate cached digests;
/// read accessors take `&self` and leave caches untouched.
pub trait ZoneStore: fmt::Debug {
    /// Insert a record.
    fn add(&mut self, record: Record) -> Result<(), ZoneDigestError>;

    /// Remove all apex records of `rtype`, returning them. When `rtype`
    /// is RRSIG, only signatures whose type-covered equals `covered` are
    /// removed.
    fn remove_at_apex(&mut self, rtype: RecordType, covered: Option<RecordType>) -> Vec<Record>;

    /// Remove the first record equal to `record` in owner, type, class,
    /// and RDATA. Returns false when no such record exists.
    fn remove_record(&mut self, record: &Record) -> Result<bool, ZoneDigestError>;

    /// All records, in canonical enumeration order: sorted for the flat
    /// store; branch order with each leaf sorted for the tree.
    fn records_canonical(&self) -> Vec<&Record>;

    /// Records whose owner equals the zone origin.
    fn apex_records(&self) -> Vec<&Record>;

    /// Compute the zone digest over this store's contents.
    fn digest(
        &mut self,
        codec: &RecordCodec,
        algorithm: DigestAlgorithm,
    ) -> Result<Vec<u8>, ZoneDigestError>;

    /// Number of records held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
