//! Zone digests for DNS zones.
//!
//! A zone digest is a single resource record at the zone apex whose RDATA
//! holds a cryptographic hash over the canonical serialization of every
//! in-zone record. This crate computes, inserts, verifies, and re-signs
//! that record, with a choice of two zone stores: a flat record list and a
//! fixed-shape hash tree that recomputes only the subtrees a localized
//! edit actually touched.

pub mod codec;
pub mod digest;
pub mod engine;
pub mod error;
pub mod rr;
pub mod sign;
pub mod store;
pub mod zone;

pub use self::codec::{DigestRecordType, RecordCodec};
pub use self::digest::DigestAlgorithm;
pub use self::error::ZoneDigestError;
pub use self::store::Backend;
pub use self::zone::Zone;

#[cfg(test)]
/// Registers a global default tracing subscriber when called for the first time. This is intended
/// for use in tests.
pub(crate) fn subscribe() {
    use std::sync::Once;
    static INSTALL_TRACING_SUBSCRIBER: Once = Once::new();
    INSTALL_TRACING_SUBSCRIBER.call_once(|| {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).unwrap();
    });
}
