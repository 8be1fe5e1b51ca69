use std::{cmp::Ordering, fmt};

use hickory_proto::{
    dnssec::rdata::DNSSECRData,
    rr::{DNSClass, Name, RData, RecordData as _, RecordType},
};

use super::{AsHickory, ttl::TimeToLive};

/// DNS Resource Record
///
/// The record model the digest engine works over: an owner name, a class,
/// a TTL, and opaque record data. Most record types are never interpreted;
/// the digest is computed over their wire encoding.
#[derive(Debug, Clone, Eq)]
pub struct Record {
    name_labels: Name,
    dns_class: DNSClass,
    ttl: TimeToLive,
    rdata: RData,
}

impl Record {
    pub fn from_rdata(name: Name, ttl: TimeToLive, rdata: RData) -> Self {
        Record {
            name_labels: name,
            dns_class: DNSClass::IN,
            ttl,
            rdata,
        }
    }

    /// Label of the record resource
    pub fn name(&self) -> &Name {
        &self.name_labels
    }

    /// DNS Class of the record resource
    pub fn dns_class(&self) -> DNSClass {
        self.dns_class
    }

    pub fn set_dns_class(&mut self, dns_class: DNSClass) {
        self.dns_class = dns_class;
    }

    /// Time to Live of the record resource
    pub fn ttl(&self) -> TimeToLive {
        self.ttl
    }

    /// Sets the TTL, in seconds, to the specified value
    pub fn set_ttl(&mut self, ttl: TimeToLive) {
        self.ttl = ttl;
    }

    /// Record Data of the record resource
    pub fn rdata(&self) -> &RData {
        &self.rdata
    }

    pub fn set_data(&mut self, rdata: RData) {
        self.rdata = rdata;
    }

    /// Record Type of the record resource
    pub fn record_type(&self) -> RecordType {
        self.rdata.record_type()
    }

    /// The type-covered field, when this record is an RRSIG.
    pub fn rrsig_type_covered(&self) -> Option<RecordType> {
        match &self.rdata {
            RData::DNSSEC(DNSSECRData::RRSIG(sig)) => Some(sig.type_covered()),
            _ => None,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "{name} {ttl} {class} {ty} {rdata}",
            name = self.name_labels,
            ttl = self.ttl,
            class = self.dns_class,
            ty = self.record_type(),
            rdata = self.rdata,
        )?;

        Ok(())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.name_labels == other.name_labels
            && self.dns_class == other.dns_class
            && self.rdata == other.rdata
    }
}

impl Ord for Record {
    /// Canonical ordering as defined by
    ///  [RFC 4034](https://tools.ietf.org/html/rfc4034#section-6), DNSSEC Resource Records, March 2005
    ///
    /// ```text
    /// 6.3.  Canonical RR Ordering within an RRset
    ///
    ///    For the purposes of DNS security, RRs with the same owner name,
    ///    class, and type are sorted by treating the RDATA portion of the
    ///    canonical form of each RR as a left-justified unsigned octet
    ///    sequence in which the absence of an octet sorts before a zero
    ///    octet.
    /// ```
    ///
    /// The TTL does not participate: two records that differ only in TTL
    /// are duplicates for digest purposes and must sort adjacently.
    fn cmp(&self, other: &Self) -> Ordering {
        self.name_labels
            .cmp(&other.name_labels)
            .then(self.record_type().cmp(&other.record_type()))
            .then(self.dns_class.cmp(&other.dns_class))
            .then(self.rdata.cmp(&other.rdata))
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<hickory_proto::rr::Record> for Record {
    fn from(value: hickory_proto::rr::Record) -> Self {
        Record {
            name_labels: value.name().clone(),
            dns_class: value.dns_class(),
            ttl: value.ttl().into(),
            rdata: value.data().clone(),
        }
    }
}

impl AsHickory for Record {
    type Hickory = hickory_proto::rr::Record;

    fn as_hickory(&self) -> Self::Hickory {
        let mut record = hickory_proto::rr::Record::from_rdata(
            self.name().clone(),
            self.ttl().into(),
            self.rdata().clone(),
        );
        record.set_dns_class(self.dns_class);
        record
    }
}
