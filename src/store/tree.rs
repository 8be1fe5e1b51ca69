use hickory_proto::rr::{LowerName, Name, RecordType};
use hickory_proto::serialize::binary::BinEncodable;

use crate::codec::RecordCodec;
use crate::digest::DigestAlgorithm;
use crate::error::ZoneDigestError;
use crate::rr::Record;

use super::ZoneStore;

/// A fixed-shape hash tree over the zone's records.
///
/// Every owner name routes deterministically to one leaf bucket; internal
/// nodes cache the digest of their subtree. A mutation marks the
/// root-to-leaf path dirty, so recomputing the apex digest revisits only
/// the subtrees an edit touched. The tree digest is a Merkle-style
/// construction (an internal node hashes its children's digests in branch
/// order, a leaf hashes its records' canonical wire forms) and is not
/// interchangeable with the flat digest except at depth 0.
#[derive(Debug)]
pub struct TreeStore {
    origin: LowerName,
    max_depth: u32,
    width: usize,
    apex_key: Vec<u8>,
    root: Node,
}

#[derive(Debug)]
struct Node {
    children: Vec<Option<Box<Node>>>,
    records: Vec<Record>,
    cached: Option<(DigestAlgorithm, Vec<u8>)>,
    dirty: bool,
}

impl Node {
    fn new() -> Self {
        Node {
            children: Vec::new(),
            records: Vec::new(),
            cached: None,
            dirty: true,
        }
    }
}

/// The routing key for an owner name: its lowercase DNS wire form. The
/// function is part of the producer/verifier deployment contract.
fn routing_key(name: &Name) -> Result<Vec<u8>, ZoneDigestError> {
    Ok(name.to_lowercase().to_bytes()?)
}

/// Child index for a routing key at the given depth.
fn branch_of(depth: u32, key: &[u8], width: usize) -> usize {
    let position = depth as usize % key.len();
    key[position] as usize % width
}

impl TreeStore {
    pub fn new(origin: LowerName, max_depth: u32, width: usize) -> Result<Self, ZoneDigestError> {
        if width == 0 {
            return Err(ZoneDigestError::Config("hash tree width must be at least 1"));
        }

        let apex_key = routing_key(&Name::from(origin.clone()))?;
        Ok(TreeStore {
            origin,
            max_depth,
            width,
            apex_key,
            root: Node::new(),
        })
    }

    /// Read-only walk to the leaf for a routing key; never touches dirty
    /// flags, and returns None when the path was never allocated.
    fn leaf(&self, key: &[u8]) -> Option<&Node> {
        let mut node = &self.root;
        for depth in 0..self.max_depth {
            let branch = branch_of(depth, key, self.width);
            node = node.children.get(branch)?.as_deref()?;
        }
        Some(node)
    }

    /// Mutating walk to the leaf for a routing key. Missing nodes are
    /// allocated and the whole path, root to leaf, is marked dirty.
    fn leaf_mut(&mut self, key: &[u8]) -> &mut Node {
        let width = self.width;
        let mut node = &mut self.root;
        for depth in 0..self.max_depth {
            node.dirty = true;
            if node.children.is_empty() {
                node.children.resize_with(width, || None);
            }
            let branch = branch_of(depth, key, width);
            node = node.children[branch].get_or_insert_with(|| Box::new(Node::new()));
        }
        node.dirty = true;
        node
    }

    /// Drop the leaf for `key` when it holds no records, and any
    /// internal node left with no occupied children. A slot that is
    /// `None` contributes nothing to its parent's digest, which keeps an
    /// incrementally emptied tree identical to one rebuilt from the
    /// remaining records.
    fn prune(&mut self, key: &[u8]) {
        Self::prune_node(&mut self.root, 0, self.max_depth, self.width, key);
    }

    /// Returns true when the subtree holds no records and can be dropped.
    fn prune_node(node: &mut Node, depth: u32, max_depth: u32, width: usize, key: &[u8]) -> bool {
        if depth < max_depth {
            if !node.children.is_empty() {
                let branch = branch_of(depth, key, width);
                if let Some(child) = node.children[branch].as_deref_mut()
                    && Self::prune_node(child, depth + 1, max_depth, width, key)
                {
                    node.children[branch] = None;
                }
            }
            node.children.iter().flatten().next().is_none()
        } else {
            node.records.is_empty()
        }
    }

    fn matches_apex(&self, record: &Record, rtype: RecordType, covered: Option<RecordType>) -> bool {
        LowerName::new(record.name()) == self.origin
            && record.record_type() == rtype
            && (rtype != RecordType::RRSIG || record.rrsig_type_covered() == covered)
    }

    fn digest_node(
        node: &mut Node,
        depth: u32,
        max_depth: u32,
        codec: &RecordCodec,
        algorithm: DigestAlgorithm,
    ) -> Result<Vec<u8>, ZoneDigestError> {
        if !node.dirty
            && let Some((cached_algorithm, cached)) = &node.cached
            && *cached_algorithm == algorithm
        {
            return Ok(cached.clone());
        }

        let mut ctx = algorithm.context();
        if depth < max_depth {
            for child in node.children.iter_mut().flatten() {
                let child_digest =
                    Self::digest_node(child, depth + 1, max_depth, codec, algorithm)?;
                ctx.update(&child_digest);
            }
        } else {
            let mut records: Vec<&Record> = node.records.iter().collect();
            records.sort_unstable();
            codec.digest_records(&records, &mut ctx)?;
        }

        let digest = ctx.finish();
        node.cached = Some((algorithm, digest.clone()));
        node.dirty = false;
        Ok(digest)
    }

    fn collect<'a>(node: &'a Node, depth: u32, max_depth: u32, out: &mut Vec<&'a Record>) {
        if depth < max_depth {
            for child in node.children.iter().flatten() {
                Self::collect(child, depth + 1, max_depth, out);
            }
        } else {
            let mut records: Vec<&Record> = node.records.iter().collect();
            records.sort_unstable();
            out.extend(records);
        }
    }

    fn count(node: &Node) -> usize {
        node.records.len()
            + node
                .children
                .iter()
                .flatten()
                .map(|child| Self::count(child))
                .sum::<usize>()
    }
}

impl ZoneStore for TreeStore {
    fn add(&mut self, record: Record) -> Result<(), ZoneDigestError> {
        let key = routing_key(record.name())?;
        self.leaf_mut(&key).records.push(record);
        Ok(())
    }

    fn remove_at_apex(&mut self, rtype: RecordType, covered: Option<RecordType>) -> Vec<Record> {
        let has_match = self.leaf(&self.apex_key).is_some_and(|leaf| {
            leaf.records
                .iter()
                .any(|record| self.matches_apex(record, rtype, covered))
        });
        if !has_match {
            return Vec::new();
        }

        let key = self.apex_key.clone();
        let origin = self.origin.clone();
        let leaf = self.leaf_mut(&key);

        let mut kept = Vec::with_capacity(leaf.records.len());
        let mut removed = Vec::new();
        for record in leaf.records.drain(..) {
            let matches = LowerName::new(record.name()) == origin
                && record.record_type() == rtype
                && (rtype != RecordType::RRSIG || record.rrsig_type_covered() == covered);
            if matches {
                removed.push(record);
            } else {
                kept.push(record);
            }
        }
        leaf.records = kept;

        self.prune(&key);
        removed
    }

    fn remove_record(&mut self, record: &Record) -> Result<bool, ZoneDigestError> {
        let key = routing_key(record.name())?;
        let present = self
            .leaf(&key)
            .is_some_and(|leaf| leaf.records.iter().any(|existing| existing == record));
        if !present {
            return Ok(false);
        }

        let leaf = self.leaf_mut(&key);
        if let Some(index) = leaf.records.iter().position(|existing| existing == record) {
            leaf.records.remove(index);
        }

        self.prune(&key);
        Ok(true)
    }

    fn records_canonical(&self) -> Vec<&Record> {
        let mut out = Vec::with_capacity(self.len());
        Self::collect(&self.root, 0, self.max_depth, &mut out);
        out
    }

    fn apex_records(&self) -> Vec<&Record> {
        self.leaf(&self.apex_key)
            .map(|leaf| {
                leaf.records
                    .iter()
                    .filter(|record| LowerName::new(record.name()) == self.origin)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn digest(
        &mut self,
        codec: &RecordCodec,
        algorithm: DigestAlgorithm,
    ) -> Result<Vec<u8>, ZoneDigestError> {
        Self::digest_node(&mut self.root, 0, self.max_depth, codec, algorithm)
    }

    fn len(&self) -> usize {
        Self::count(&self.root)
    }
}
