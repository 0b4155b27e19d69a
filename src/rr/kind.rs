use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, NS, PTR, SOA, SRV, TXT};
use hickory_proto::rr::{Name, RData, Record, RecordType};

use super::TimeToLive;

/// Record types which can be served from the key-value store.
///
/// Each variant knows its storage marker (`.A`, `.SOA`, ...) and how to parse
/// a stored value into record data. The declaration order matches the DNS
/// type codes, so sorting kinds sorts them by type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    /// IPv4 address
    A,
    /// Authoritative name server
    NS,
    /// Canonical name alias
    CNAME,
    /// Start of authority
    SOA,
    /// Domain name pointer
    PTR,
    /// Mail exchange, stored as `preference<TAB>exchange`
    MX,
    /// Text, stored verbatim
    TXT,
    /// IPv6 address
    AAAA,
    /// Service locator, stored as `priority<TAB>weight<TAB>port<TAB>target`
    SRV,
}

impl RecordKind {
    /// All supported kinds, in type code order.
    pub const ALL: [RecordKind; 9] = [
        RecordKind::A,
        RecordKind::NS,
        RecordKind::CNAME,
        RecordKind::SOA,
        RecordKind::PTR,
        RecordKind::MX,
        RecordKind::TXT,
        RecordKind::AAAA,
        RecordKind::SRV,
    ];

    /// Map a DNS record type onto a supported kind.
    pub fn from_record_type(record_type: RecordType) -> Option<Self> {
        match record_type {
            RecordType::A => Some(RecordKind::A),
            RecordType::NS => Some(RecordKind::NS),
            RecordType::CNAME => Some(RecordKind::CNAME),
            RecordType::SOA => Some(RecordKind::SOA),
            RecordType::PTR => Some(RecordKind::PTR),
            RecordType::MX => Some(RecordKind::MX),
            RecordType::TXT => Some(RecordKind::TXT),
            RecordType::AAAA => Some(RecordKind::AAAA),
            RecordType::SRV => Some(RecordKind::SRV),
            _ => None,
        }
    }

    /// The DNS record type for this kind
    pub fn record_type(self) -> RecordType {
        match self {
            RecordKind::A => RecordType::A,
            RecordKind::NS => RecordType::NS,
            RecordKind::CNAME => RecordType::CNAME,
            RecordKind::SOA => RecordType::SOA,
            RecordKind::PTR => RecordType::PTR,
            RecordKind::MX => RecordType::MX,
            RecordKind::TXT => RecordType::TXT,
            RecordKind::AAAA => RecordType::AAAA,
            RecordKind::SRV => RecordType::SRV,
        }
    }

    /// The mnemonic for this kind, e.g. `AAAA`.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::NS => "NS",
            RecordKind::CNAME => "CNAME",
            RecordKind::SOA => "SOA",
            RecordKind::PTR => "PTR",
            RecordKind::MX => "MX",
            RecordKind::TXT => "TXT",
            RecordKind::AAAA => "AAAA",
            RecordKind::SRV => "SRV",
        }
    }

    /// The key segment under which values of this kind are stored, e.g. `.AAAA`.
    pub fn marker(self) -> String {
        format!(".{}", self.as_str())
    }

    /// The suffix appended to a name's key to reach values of this kind, e.g. `/.AAAA`.
    pub fn key_suffix(self) -> String {
        format!("/.{}", self.as_str())
    }

    /// Parse a key segment such as `.TXT` into a kind.
    ///
    /// Returns `None` for segments which are not type markers, or which name
    /// an unsupported type.
    pub fn from_marker(segment: &str) -> Option<Self> {
        segment.strip_prefix('.')?.parse().ok()
    }

    /// Parse a stored value into record data of this kind.
    pub fn rdata(self, raw: &str) -> Result<RData, MalformedValue> {
        let malformed = |reason: &dyn fmt::Display| MalformedValue::new(self, raw, reason);

        let rdata = match self {
            RecordKind::A => {
                let address: Ipv4Addr = raw.parse().map_err(|error| malformed(&error))?;
                RData::A(A(address))
            }
            RecordKind::AAAA => {
                let address: Ipv6Addr = raw.parse().map_err(|error| malformed(&error))?;
                RData::AAAA(AAAA(address))
            }
            RecordKind::CNAME => RData::CNAME(CNAME(self.name(raw)?)),
            RecordKind::NS => RData::NS(NS(self.name(raw)?)),
            RecordKind::PTR => RData::PTR(PTR(self.name(raw)?)),
            RecordKind::TXT => RData::TXT(TXT::new(character_strings(raw))),
            RecordKind::MX => {
                let [preference, exchange] = self.fields(raw)?;
                RData::MX(MX::new(
                    self.number(raw, "preference", preference)?,
                    self.name(exchange)?,
                ))
            }
            RecordKind::SRV => {
                let [priority, weight, port, target] = self.fields(raw)?;
                RData::SRV(SRV::new(
                    self.number(raw, "priority", priority)?,
                    self.number(raw, "weight", weight)?,
                    self.number(raw, "port", port)?,
                    self.name(target)?,
                ))
            }
            RecordKind::SOA => {
                let [mname, rname, refresh, retry, expire, minimum] = self.fields(raw)?;
                let refresh: u32 = self.number(raw, "refresh", refresh)?;
                let retry: u32 = self.number(raw, "retry", retry)?;
                let expire: u32 = self.number(raw, "expire", expire)?;
                let minimum: u32 = self.number(raw, "minimum", minimum)?;

                // hickory models these as i32; the wire carries the same 32 bits.
                RData::SOA(SOA::new(
                    self.name(mname)?,
                    self.name(rname)?,
                    0,
                    refresh as i32,
                    retry as i32,
                    expire as i32,
                    minimum,
                ))
            }
        };

        Ok(rdata)
    }

    /// Build a record of this kind from a stored value.
    ///
    /// The record is named `name`, the name that was queried, regardless of
    /// where in the store the value was found.
    pub fn synthesize(
        self,
        name: &Name,
        raw: &str,
        ttl: TimeToLive,
    ) -> Result<Record, MalformedValue> {
        let rdata = self.rdata(raw)?;
        Ok(Record::from_rdata(name.clone(), ttl.into(), rdata))
    }

    fn name(self, raw: &str) -> Result<Name, MalformedValue> {
        if raw.is_empty() {
            return Err(MalformedValue::new(self, raw, &"empty name"));
        }
        Name::from_utf8(raw).map_err(|error| MalformedValue::new(self, raw, &error))
    }

    fn number<T>(self, raw: &str, field: &str, text: &str) -> Result<T, MalformedValue>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        text.parse()
            .map_err(|error| MalformedValue::new(self, raw, &format_args!("{field}: {error}")))
    }

    /// Split a composite value into exactly `N` fields.
    ///
    /// Fields are separated by a tab. Values written with a literal `\t`
    /// escape instead of a tab character are also accepted.
    fn fields<'r, const N: usize>(self, raw: &'r str) -> Result<[&'r str; N], MalformedValue> {
        let parts: Vec<&str> = if raw.contains('\t') {
            raw.split('\t').collect()
        } else {
            raw.split("\\t").collect()
        };

        <[&str; N]>::try_from(parts).map_err(|parts| {
            MalformedValue::new(
                self,
                raw,
                &format_args!("expected {N} fields, found {}", parts.len()),
            )
        })
    }
}

/// Longest character-string a TXT record can carry.
const MAX_CHARACTER_STRING: usize = 255;

/// Split text into character-strings of at most 255 bytes, on `char` boundaries.
fn character_strings(text: &str) -> Vec<String> {
    let mut strings = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if current.len() + c.len_utf8() > MAX_CHARACTER_STRING {
            strings.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    strings.push(current);
    strings
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = UnsupportedKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnsupportedKind(s.to_owned()))
    }
}

impl From<RecordKind> for RecordType {
    fn from(kind: RecordKind) -> Self {
        kind.record_type()
    }
}

/// A record type name which has no stored representation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported record type: {0}")]
pub struct UnsupportedKind(String);

/// A stored value which cannot be parsed as the requested record type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed {kind} value {value:?}: {reason}")]
pub struct MalformedValue {
    kind: RecordKind,
    value: String,
    reason: String,
}

impl MalformedValue {
    fn new(kind: RecordKind, value: &str, reason: &dyn fmt::Display) -> Self {
        Self {
            kind,
            value: value.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// The kind of record which was being built
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// The offending stored value
    pub fn value(&self) -> &str {
        &self.value
    }
}
