//! Resource Record Definitions for DNS

mod digest_record;
mod record;
mod serial;
mod ttl;

pub use self::digest_record::DigestRdata;
pub use self::record::Record;
pub use self::serial::SerialNumber;
pub use self::ttl::TimeToLive;

/// DNS Name with case preserved.
///
pub use hickory_proto::rr::Name;

/// DNS Name converted to the canonical lowercase form.
///
pub use hickory_proto::rr::LowerName;

/// Trait for converting zone-digest types to their hickory-dns equivalents
///
/// This trait provides a consistent interface for converting internal types
/// to their hickory-dns counterparts, enabling compatibility with the
/// hickory-dns ecosystem.
pub trait AsHickory {
    /// The corresponding hickory-dns type
    type Hickory;

    /// Convert this type to its hickory-dns equivalent
    ///
    /// # Returns
    ///
    /// A new instance of the hickory-dns equivalent type
    fn as_hickory(&self) -> Self::Hickory;
}
