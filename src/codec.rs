//! Record encoding policy for the zone digest.
//!
//! The [`RecordCodec`] owns every encoding decision the digest depends on:
//! the numeric type code of the digest record, the canonical wire form fed
//! to the hash, the zeroization of the digest record's own digest bytes,
//! and the exclusion of signatures over the digest record. It also owns
//! the presentation format of two record shapes, the digest record and
//! RRSIG, because the surrounding DNS library predates the digest type
//! and its zone-file parser does not accept either shape.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use hickory_proto::dnssec::Algorithm;
use hickory_proto::dnssec::rdata::{DNSSECRData, RRSIG};
use hickory_proto::rr::{DNSClass, LowerName, Name, RData, RecordType, rdata::NULL};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder, EncodeMode};
use tracing::warn;

use crate::digest::DigestContext;
use crate::error::ZoneDigestError;
use crate::rr::{AsHickory, DigestRdata, Record, TimeToLive};

/// The numeric RR type carrying the zone digest.
///
/// The code is not negotiated on the wire; producer and verifier must be
/// configured identically. It is chosen once, when the codec is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DigestRecordType {
    /// The type code from the registry, 63.
    #[default]
    Standard,
    /// The private-use fallback code, 65317.
    Private,
}

impl DigestRecordType {
    pub fn code(&self) -> u16 {
        match self {
            DigestRecordType::Standard => 63,
            DigestRecordType::Private => 65317,
        }
    }

    pub fn record_type(&self) -> RecordType {
        RecordType::Unknown(self.code())
    }
}

/// Input text split into the lines the codec parses itself and the
/// remainder handed to the DNS library's zone-file parser.
#[derive(Debug)]
pub struct ExtractedInput {
    pub passthrough: String,
    pub records: Vec<Record>,
}

/// Encoding policy for digest computation and zone-file round-trips.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    origin: Name,
    origin_lower: LowerName,
    digest_type: DigestRecordType,
}

enum OwnedShape {
    Rrsig,
    DigestGeneric,
    DigestMnemonic,
}

impl RecordCodec {
    pub fn new(origin: Name, digest_type: DigestRecordType) -> Self {
        let origin_lower = LowerName::new(&origin);
        RecordCodec {
            origin,
            origin_lower,
            digest_type,
        }
    }

    /// The record type carrying the zone digest.
    pub fn digest_type(&self) -> RecordType {
        self.digest_type.record_type()
    }

    pub fn digest_type_code(&self) -> u16 {
        self.digest_type.code()
    }

    pub fn origin(&self) -> &Name {
        &self.origin
    }

    /// True for digest records whose owner is the zone apex.
    pub fn is_apex_digest_record(&self, record: &Record) -> bool {
        record.record_type() == self.digest_type()
            && LowerName::new(record.name()) == self.origin_lower
    }

    /// True for records excluded from the digest entirely: RRSIGs whose
    /// type-covered is the digest type.
    pub fn excluded(&self, record: &Record) -> bool {
        record.rrsig_type_covered() == Some(self.digest_type())
    }

    /// The canonical wire form of a single record: the uncompressed
    /// answer-section encoding, case preserved.
    pub fn wire(&self, record: &Record) -> Result<Vec<u8>, ZoneDigestError> {
        let rr = record.as_hickory();
        let mut buf = Vec::with_capacity(128);
        let mut encoder = BinEncoder::with_mode(&mut buf, EncodeMode::Signing);
        rr.emit(&mut encoder)?;
        Ok(buf)
    }

    /// The record as it is hashed.
    ///
    /// Apex digest records are replaced by a clone whose digest bytes are
    /// all zero; every other record passes through unchanged.
    pub fn canonical<'a>(&self, record: &'a Record) -> Result<Cow<'a, Record>, ZoneDigestError> {
        if !self.is_apex_digest_record(record) {
            return Ok(Cow::Borrowed(record));
        }

        let data = DigestRdata::unpack(record.rdata())?;
        let mut copy = record.clone();
        copy.set_data(data.zeroized().pack(self.digest_type.code()));
        Ok(Cow::Owned(copy))
    }

    /// Feed a canonically sorted run of records into a hash context.
    ///
    /// Exact duplicates (equal owner, type, class, RDATA) are collapsed to
    /// one with a warning; excluded records contribute nothing.
    pub fn digest_records(
        &self,
        records: &[&Record],
        ctx: &mut DigestContext,
    ) -> Result<(), ZoneDigestError> {
        let mut prev: Option<&Record> = None;
        for &record in records {
            if prev.is_some_and(|previous| previous == record) {
                warn!("ignoring duplicate record: {record}");
                continue;
            }
            prev = Some(record);

            if self.excluded(record) {
                continue;
            }

            let canonical = self.canonical(record)?;
            ctx.update(&self.wire(&canonical)?);
        }
        Ok(())
    }
}

impl RecordCodec {
    /// Render one record as a zone-file line.
    ///
    /// Digest records are written in the RFC 3597 generic form, RRSIGs in
    /// their standard presentation with epoch-second timestamps; all other
    /// types use the library's presentation.
    pub fn format_record(&self, record: &Record) -> String {
        let name = record.name();
        let ttl = record.ttl();
        let class = record.dns_class();

        match record.rdata() {
            RData::Unknown { code, rdata } => {
                let blob = rdata.anything();
                format!(
                    "{name} {ttl} {class} TYPE{code} \\# {len} {hex}",
                    code = u16::from(*code),
                    len = blob.len(),
                    hex = hex::encode(blob),
                )
            }
            RData::DNSSEC(DNSSECRData::RRSIG(sig)) => format!(
                "{name} {ttl} {class} RRSIG {covered} {alg} {labels} {original_ttl} {expire} {inception} {tag} {signer} {sig}",
                covered = fmt_record_type(sig.type_covered()),
                alg = u8::from(sig.algorithm()),
                labels = sig.num_labels(),
                original_ttl = sig.original_ttl(),
                expire = sig.sig_expiration().get(),
                inception = sig.sig_inception().get(),
                tag = sig.key_tag(),
                signer = sig.signer_name(),
                sig = data_encoding::BASE64.encode(sig.sig()),
            ),
            rdata => format!(
                "{name} {ttl} {class} {ty} {rdata}",
                ty = record.record_type()
            ),
        }
    }

    /// Split the record shapes this codec owns out of zone-file text.
    ///
    /// Lines carrying a digest record (generic or `ZONEMD` mnemonic form)
    /// or an RRSIG are parsed here; everything else is passed through for
    /// the library parser. Owned lines must carry an explicit owner name.
    pub fn extract_owned_lines(
        &self,
        text: &str,
        default_ttl: TimeToLive,
    ) -> Result<ExtractedInput, ZoneDigestError> {
        let mut passthrough = String::with_capacity(text.len());
        let mut records = Vec::new();

        for line in text.lines() {
            match self.parse_owned_line(line, default_ttl)? {
                Some(record) => records.push(record),
                None => {
                    passthrough.push_str(line);
                    passthrough.push('\n');
                }
            }
        }

        Ok(ExtractedInput {
            passthrough,
            records,
        })
    }

    fn parse_owned_line(
        &self,
        line: &str,
        default_ttl: TimeToLive,
    ) -> Result<Option<Record>, ZoneDigestError> {
        // A leading blank means an inherited owner name, which only the
        // library parser tracks.
        if line.starts_with([' ', '\t']) {
            return Ok(None);
        }

        let mut tokens = Vec::new();
        for token in line.split_whitespace() {
            if token.starts_with(';') {
                break;
            }
            tokens.push(token);
        }

        if tokens.len() < 2 || tokens[0].starts_with('$') {
            return Ok(None);
        }

        let owner_token = tokens[0];
        let mut ttl = default_ttl;
        let mut class = DNSClass::IN;
        let mut index = 1;

        // TTL and class may appear before the type, in either order.
        for _ in 0..2 {
            let Some(token) = tokens.get(index) else {
                return Ok(None);
            };
            if token.bytes().all(|b| b.is_ascii_digit()) {
                ttl = match token.parse::<u32>() {
                    Ok(seconds) => seconds.into(),
                    Err(_) => return Ok(None),
                };
                index += 1;
            } else if let Some(parsed) = parse_class(token) {
                class = parsed;
                index += 1;
            } else {
                break;
            }
        }

        let Some(&type_token) = tokens.get(index) else {
            return Ok(None);
        };
        let Some(shape) = self.detect_shape(type_token) else {
            return Ok(None);
        };
        let rdata_tokens = &tokens[index + 1..];

        let name = self.parse_owner(owner_token)?;
        let rdata = match shape {
            OwnedShape::Rrsig => self.parse_rrsig_rdata(rdata_tokens)?,
            OwnedShape::DigestGeneric => self.parse_generic_rdata(rdata_tokens)?,
            OwnedShape::DigestMnemonic => self.parse_mnemonic_rdata(rdata_tokens)?,
        };

        let mut record = Record::from_rdata(name, ttl, rdata);
        record.set_dns_class(class);
        Ok(Some(record))
    }

    fn detect_shape(&self, type_token: &str) -> Option<OwnedShape> {
        let upper = type_token.to_ascii_uppercase();
        if upper == "RRSIG" {
            Some(OwnedShape::Rrsig)
        } else if upper == "ZONEMD" {
            Some(OwnedShape::DigestMnemonic)
        } else {
            let code = upper.strip_prefix("TYPE")?.parse::<u16>().ok()?;
            (code == self.digest_type.code()).then_some(OwnedShape::DigestGeneric)
        }
    }

    fn parse_owner(&self, token: &str) -> Result<Name, ZoneDigestError> {
        if token == "@" {
            return Ok(self.origin.clone());
        }
        Ok(Name::parse(token, Some(&self.origin))?)
    }

    /// RFC 3597 generic RDATA: `\# <length> <hex>`.
    fn parse_generic_rdata(&self, tokens: &[&str]) -> Result<RData, ZoneDigestError> {
        let [marker, length, hex_parts @ ..] = tokens else {
            return Err(ZoneDigestError::ZoneFile(
                "generic RDATA needs a \\# marker and a length".into(),
            ));
        };
        if *marker != r"\#" {
            return Err(ZoneDigestError::ZoneFile(format!(
                "expected \\# marker, found '{marker}'"
            )));
        }
        let expected: usize = length
            .parse()
            .map_err(|_| ZoneDigestError::ZoneFile(format!("bad RDATA length '{length}'")))?;
        let bytes = hex::decode(hex_parts.concat())
            .map_err(|error| ZoneDigestError::ZoneFile(format!("bad RDATA hex: {error}")))?;
        if bytes.len() != expected {
            return Err(ZoneDigestError::ZoneFile(format!(
                "RDATA length {} does not match declared {expected}",
                bytes.len()
            )));
        }

        let rdata = RData::Unknown {
            code: RecordType::Unknown(self.digest_type.code()),
            rdata: NULL::with(bytes),
        };
        // Surface malformed digest bodies at load rather than at use.
        DigestRdata::unpack(&rdata)?;
        Ok(rdata)
    }

    /// Mnemonic digest RDATA: `<serial> <digest-type> <parameter> <hex>`.
    fn parse_mnemonic_rdata(&self, tokens: &[&str]) -> Result<RData, ZoneDigestError> {
        let [serial, algorithm, reserved, hex_parts @ ..] = tokens else {
            return Err(ZoneDigestError::ZoneFile(
                "digest RDATA needs serial, digest type, parameter, and digest".into(),
            ));
        };
        let serial: u32 = serial
            .parse()
            .map_err(|_| ZoneDigestError::ZoneFile(format!("bad serial '{serial}'")))?;
        let algorithm: u8 = algorithm
            .parse()
            .map_err(|_| ZoneDigestError::ZoneFile(format!("bad digest type '{algorithm}'")))?;
        let reserved: u8 = reserved
            .parse()
            .map_err(|_| ZoneDigestError::ZoneFile(format!("bad parameter '{reserved}'")))?;
        let digest = hex::decode(hex_parts.concat())
            .map_err(|error| ZoneDigestError::ZoneFile(format!("bad digest hex: {error}")))?;

        let mut buf = Vec::with_capacity(6 + digest.len());
        buf.extend_from_slice(&serial.to_be_bytes());
        buf.push(algorithm);
        buf.push(reserved);
        buf.extend_from_slice(&digest);

        Ok(RData::Unknown {
            code: RecordType::Unknown(self.digest_type.code()),
            rdata: NULL::with(buf),
        })
    }

    fn parse_rrsig_rdata(&self, tokens: &[&str]) -> Result<RData, ZoneDigestError> {
        let [
            covered,
            algorithm,
            labels,
            original_ttl,
            expiration,
            inception,
            key_tag,
            signer,
            sig_parts @ ..,
        ] = tokens
        else {
            return Err(ZoneDigestError::ZoneFile("truncated RRSIG RDATA".into()));
        };

        let type_covered = parse_record_type(covered)?;
        let algorithm = Algorithm::from_u8(algorithm.parse::<u8>().map_err(|_| {
            ZoneDigestError::ZoneFile(format!("bad RRSIG algorithm '{algorithm}'"))
        })?);
        let num_labels: u8 = labels
            .parse()
            .map_err(|_| ZoneDigestError::ZoneFile(format!("bad RRSIG labels '{labels}'")))?;
        let original_ttl: u32 = original_ttl.parse().map_err(|_| {
            ZoneDigestError::ZoneFile(format!("bad RRSIG original TTL '{original_ttl}'"))
        })?;
        let sig_expiration = parse_timestamp(expiration)?;
        let sig_inception = parse_timestamp(inception)?;
        let key_tag: u16 = key_tag
            .parse()
            .map_err(|_| ZoneDigestError::ZoneFile(format!("bad RRSIG key tag '{key_tag}'")))?;
        let signer_name = self.parse_owner(signer)?;
        let sig = data_encoding::BASE64
            .decode(sig_parts.concat().as_bytes())
            .map_err(|error| ZoneDigestError::ZoneFile(format!("bad RRSIG signature: {error}")))?;

        Ok(RData::DNSSEC(DNSSECRData::RRSIG(RRSIG::new(
            type_covered,
            algorithm,
            num_labels,
            original_ttl,
            sig_expiration,
            sig_inception,
            key_tag,
            signer_name,
            sig,
        ))))
    }
}

fn parse_class(token: &str) -> Option<DNSClass> {
    match token.to_ascii_uppercase().as_str() {
        "IN" => Some(DNSClass::IN),
        "CH" => Some(DNSClass::CH),
        "HS" => Some(DNSClass::HS),
        _ => None,
    }
}

fn fmt_record_type(rtype: RecordType) -> String {
    match rtype {
        RecordType::Unknown(code) => format!("TYPE{code}"),
        other => other.to_string(),
    }
}

fn parse_record_type(token: &str) -> Result<RecordType, ZoneDigestError> {
    let upper = token.to_ascii_uppercase();
    if let Some(code) = upper.strip_prefix("TYPE") {
        let code: u16 = code
            .parse()
            .map_err(|_| ZoneDigestError::ZoneFile(format!("bad record type '{token}'")))?;
        return Ok(RecordType::from(code));
    }
    upper
        .parse()
        .map_err(|_| ZoneDigestError::ZoneFile(format!("bad record type '{token}'")))
}

/// RRSIG validity timestamps: epoch seconds, or `YYYYMMDDHHmmSS`.
fn parse_timestamp(token: &str) -> Result<u32, ZoneDigestError> {
    if token.len() == 14 && token.bytes().all(|b| b.is_ascii_digit()) {
        let stamp = NaiveDateTime::parse_from_str(token, "%Y%m%d%H%M%S")
            .map_err(|error| ZoneDigestError::ZoneFile(format!("bad timestamp: {error}")))?;
        return Ok(stamp.and_utc().timestamp() as u32);
    }
    token
        .parse()
        .map_err(|_| ZoneDigestError::ZoneFile(format!("bad timestamp '{token}'")))
}
