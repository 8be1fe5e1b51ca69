use std::io;

use hickory_proto::ProtoError;
use hickory_proto::dnssec::DnsSecError;

#[derive(Debug, thiserror::Error)]
pub enum ZoneDigestError {
    #[error("dns protocol error: {0}")]
    Protocol(#[from] ProtoError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("parsing zone data: {0}")]
    ZoneFile(String),

    #[error("no SOA record found in zone")]
    MissingSoa,

    #[error("no digest record found at zone apex; use -p to add one")]
    MissingDigestRecord,

    #[error("unsupported digest type {0}")]
    UnsupportedAlgorithm(u8),

    #[error("malformed digest record: {0}")]
    MalformedDigestRecord(&'static str),

    #[error("loading signing key: {0}")]
    Key(String),

    #[error("dnssec error: {0}")]
    DnsSec(#[from] DnsSecError),

    #[error("update file line {line}: {reason}")]
    Update { line: usize, reason: String },

    #[error("invalid configuration: {0}")]
    Config(&'static str),
}
