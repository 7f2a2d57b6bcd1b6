//! Resource Records
//!
//! Records are built from their textual form, `"<name> [ttl] [class] <TYPE> <rdata>"`,
//! the same shape zone files use. Operators configure NS and SOA records this
//! way, and the responder synthesizes its answers from the same representation.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::dns::message::{read_name, WireError};
use crate::dns::name::{self, NameError};

/// Internet class
pub const CLASS_IN: u16 = 1;

/// TTL given to records whose text does not carry one
pub const DEFAULT_TTL: u32 = 3600;

/// Longest character-string a TXT record can hold
pub const MAX_CHARACTER_STRING: usize = 255;

/// DNS record types known to the responder
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    SOA,
    TXT,
    AAAA,
    OPT,
    ANY,
    Other(u16),
}

impl RecordType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::A,
            2 => Self::NS,
            5 => Self::CNAME,
            6 => Self::SOA,
            16 => Self::TXT,
            28 => Self::AAAA,
            41 => Self::OPT,
            255 => Self::ANY,
            other => Self::Other(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Self::A => 1,
            Self::NS => 2,
            Self::CNAME => 5,
            Self::SOA => 6,
            Self::TXT => 16,
            Self::AAAA => 28,
            Self::OPT => 41,
            Self::ANY => 255,
            Self::Other(value) => value,
        }
    }

    /// Parse a type mnemonic such as `AAAA` (case-insensitive)
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        let rtype = match text.to_ascii_uppercase().as_str() {
            "A" => Self::A,
            "NS" => Self::NS,
            "CNAME" => Self::CNAME,
            "SOA" => Self::SOA,
            "TXT" => Self::TXT,
            "AAAA" => Self::AAAA,
            "OPT" => Self::OPT,
            "ANY" => Self::ANY,
            _ => return None,
        };
        Some(rtype)
    }

    /// Question types the responder answers; everything else is skipped
    pub fn is_answerable(self) -> bool {
        matches!(
            self,
            Self::A | Self::AAAA | Self::ANY | Self::CNAME | Self::NS | Self::SOA | Self::TXT
        )
    }

    /// Does a question of this type ask for records of type `other`?
    pub fn covers(self, other: RecordType) -> bool {
        self == other || self == Self::ANY
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::NS => f.write_str("NS"),
            Self::CNAME => f.write_str("CNAME"),
            Self::SOA => f.write_str("SOA"),
            Self::TXT => f.write_str("TXT"),
            Self::AAAA => f.write_str("AAAA"),
            Self::OPT => f.write_str("OPT"),
            Self::ANY => f.write_str("ANY"),
            Self::Other(value) => write!(f, "TYPE{}", value),
        }
    }
}

/// SOA record data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soa {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

/// Record data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    CNAME(String),
    NS(String),
    SOA(Soa),
    TXT(Vec<Vec<u8>>),
    Unknown(Vec<u8>),
}

impl RData {
    /// Build TXT data holding `text` verbatim, split into character-strings
    pub fn txt(text: &str) -> Self {
        Self::TXT(character_strings(text))
    }

    /// Joined TXT content, lossily converted to UTF-8
    pub fn txt_content(&self) -> Option<String> {
        match self {
            Self::TXT(strings) => Some(String::from_utf8_lossy(&strings.concat()).into_owned()),
            _ => None,
        }
    }

    /// Parse presentation fields for a record of type `rtype`
    fn from_fields(rtype: RecordType, fields: &[String]) -> Result<Self, RecordError> {
        let invalid = || RecordError::InvalidRdata {
            rtype,
            value: fields.join(" "),
        };

        match rtype {
            RecordType::A => match fields {
                [addr] => addr.parse().map(Self::A).map_err(|_| invalid()),
                _ => Err(invalid()),
            },
            RecordType::AAAA => match fields {
                [addr] => addr.parse().map(Self::AAAA).map_err(|_| invalid()),
                _ => Err(invalid()),
            },
            RecordType::CNAME | RecordType::NS => match fields {
                [target] => {
                    name::validate(target)?;
                    let target = name::fqdn(target);
                    Ok(if rtype == RecordType::NS {
                        Self::NS(target)
                    } else {
                        Self::CNAME(target)
                    })
                }
                _ => Err(invalid()),
            },
            RecordType::SOA => match fields {
                [mname, rname, serial, refresh, retry, expire, minimum] => {
                    name::validate(mname)?;
                    name::validate(rname)?;
                    let number = |s: &String| s.parse::<u32>().map_err(|_| invalid());
                    Ok(Self::SOA(Soa {
                        mname: name::fqdn(mname),
                        rname: name::fqdn(rname),
                        serial: number(serial)?,
                        refresh: number(refresh)?,
                        retry: number(retry)?,
                        expire: number(expire)?,
                        minimum: number(minimum)?,
                    }))
                }
                _ => Err(invalid()),
            },
            RecordType::TXT => {
                if fields.is_empty() {
                    return Err(RecordError::MissingRdata(rtype));
                }
                let strings = fields.iter().flat_map(|f| character_strings(f)).collect();
                Ok(Self::TXT(strings))
            }
            other => Err(RecordError::UnsupportedType(other.to_string())),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), NameError> {
        match self {
            Self::A(addr) => buf.extend_from_slice(&addr.octets()),
            Self::AAAA(addr) => buf.extend_from_slice(&addr.octets()),
            Self::CNAME(target) | Self::NS(target) => name::encode(buf, target)?,
            Self::SOA(soa) => {
                name::encode(buf, &soa.mname)?;
                name::encode(buf, &soa.rname)?;
                for value in [soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum] {
                    buf.extend_from_slice(&value.to_be_bytes());
                }
            }
            Self::TXT(strings) => {
                for s in strings {
                    buf.push(s.len() as u8);
                    buf.extend_from_slice(s);
                }
            }
            Self::Unknown(data) => buf.extend_from_slice(data),
        }
        Ok(())
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(addr) => write!(f, "{}", addr),
            Self::AAAA(addr) => write!(f, "{}", addr),
            Self::CNAME(target) | Self::NS(target) => f.write_str(target),
            Self::SOA(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
            ),
            Self::TXT(strings) => {
                let quoted: Vec<String> = strings
                    .iter()
                    .map(|s| format!("{:?}", String::from_utf8_lossy(s)))
                    .collect();
                f.write_str(&quoted.join(" "))
            }
            Self::Unknown(data) => write!(f, "\\# {}", data.len()),
        }
    }
}

/// Errors raised while building a record from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("empty record text")]
    Empty,

    #[error("missing record type in {0:?}")]
    MissingType(String),

    #[error("unsupported record type {0}")]
    UnsupportedType(String),

    #[error("missing rdata for {0} record")]
    MissingRdata(RecordType),

    #[error("invalid {rtype} rdata {value:?}")]
    InvalidRdata { rtype: RecordType, value: String },

    #[error("unterminated quoted string in {0:?}")]
    UnterminatedQuote(String),

    #[error(transparent)]
    Name(#[from] NameError),
}

/// A resource record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub rtype: RecordType,
    pub class: u16,
    pub ttl: u32,
    pub rdata: RData,
}

impl Record {
    /// Build a record from an owner name, a type and the rdata text.
    ///
    /// TXT rdata is taken verbatim as a single value; other types parse their
    /// whitespace-separated presentation fields.
    pub fn new(name: &str, rtype: RecordType, rdata: &str) -> Result<Self, RecordError> {
        name::validate(name)?;
        let rdata = match rtype {
            RecordType::TXT => RData::txt(rdata),
            _ => {
                let fields: Vec<String> = rdata.split_whitespace().map(String::from).collect();
                if fields.is_empty() {
                    return Err(RecordError::MissingRdata(rtype));
                }
                RData::from_fields(rtype, &fields)?
            }
        };

        Ok(Self {
            name: name.to_string(),
            rtype,
            class: CLASS_IN,
            ttl: DEFAULT_TTL,
            rdata,
        })
    }

    /// Write the record in uncompressed wire form
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), NameError> {
        name::encode(buf, &self.name)?;
        buf.extend_from_slice(&self.rtype.to_u16().to_be_bytes());
        buf.extend_from_slice(&self.class.to_be_bytes());
        buf.extend_from_slice(&self.ttl.to_be_bytes());

        let len_pos = buf.len();
        buf.extend_from_slice(&[0, 0]);
        self.rdata.encode(buf)?;

        let rdlength = (buf.len() - len_pos - 2) as u16;
        buf[len_pos..len_pos + 2].copy_from_slice(&rdlength.to_be_bytes());
        Ok(())
    }

    /// Read a record starting at `offset`; returns the record and the offset after it
    pub fn decode(packet: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        let (name, pos) = read_name(packet, offset)?;
        let fixed = packet.get(pos..pos + 10).ok_or(WireError::Truncated(pos))?;

        let rtype = RecordType::from_u16(u16::from_be_bytes([fixed[0], fixed[1]]));
        let class = u16::from_be_bytes([fixed[2], fixed[3]]);
        let ttl = u32::from_be_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);
        let rdlength = u16::from_be_bytes([fixed[8], fixed[9]]) as usize;

        let start = pos + 10;
        let end = start + rdlength;
        let data = packet.get(start..end).ok_or(WireError::Truncated(start))?;

        let rdata = match rtype {
            RecordType::A => {
                let octets: [u8; 4] = data.try_into().map_err(|_| WireError::BadRdata(rtype))?;
                RData::A(Ipv4Addr::from(octets))
            }
            RecordType::AAAA => {
                let octets: [u8; 16] = data.try_into().map_err(|_| WireError::BadRdata(rtype))?;
                RData::AAAA(Ipv6Addr::from(octets))
            }
            RecordType::CNAME => RData::CNAME(read_name(packet, start)?.0),
            RecordType::NS => RData::NS(read_name(packet, start)?.0),
            RecordType::SOA => {
                let (mname, p) = read_name(packet, start)?;
                let (rname, p) = read_name(packet, p)?;
                let numbers = packet.get(p..p + 20).ok_or(WireError::Truncated(p))?;
                let field = |i: usize| {
                    u32::from_be_bytes([
                        numbers[i * 4],
                        numbers[i * 4 + 1],
                        numbers[i * 4 + 2],
                        numbers[i * 4 + 3],
                    ])
                };
                RData::SOA(Soa {
                    mname,
                    rname,
                    serial: field(0),
                    refresh: field(1),
                    retry: field(2),
                    expire: field(3),
                    minimum: field(4),
                })
            }
            RecordType::TXT => {
                let mut strings = Vec::new();
                let mut i = 0;
                while i < data.len() {
                    let len = data[i] as usize;
                    let s = data
                        .get(i + 1..i + 1 + len)
                        .ok_or(WireError::BadRdata(rtype))?;
                    strings.push(s.to_vec());
                    i += 1 + len;
                }
                RData::TXT(strings)
            }
            _ => RData::Unknown(data.to_vec()),
        };

        Ok((
            Self {
                name,
                rtype,
                class,
                ttl,
                rdata,
            },
            end,
        ))
    }
}

impl FromStr for Record {
    type Err = RecordError;

    /// Parse `"<name> [ttl] [class] <TYPE> <rdata>"`; TTL and class may come in either order
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(line)?;
        let mut tokens = tokens.into_iter();

        let owner = tokens.next().ok_or(RecordError::Empty)?;
        name::validate(&owner)?;

        let mut ttl = None;
        let mut class = None;
        let rtype = loop {
            let token = tokens
                .next()
                .ok_or_else(|| RecordError::MissingType(line.to_string()))?;

            if ttl.is_none() && token.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(value) = token.parse::<u32>() {
                    ttl = Some(value);
                    continue;
                }
            }
            if class.is_none() && token.eq_ignore_ascii_case("IN") {
                class = Some(CLASS_IN);
                continue;
            }

            match RecordType::from_mnemonic(&token) {
                Some(rtype) => break rtype,
                None => return Err(RecordError::UnsupportedType(token)),
            }
        };

        let fields: Vec<String> = tokens.collect();
        if fields.is_empty() {
            return Err(RecordError::MissingRdata(rtype));
        }

        Ok(Self {
            name: owner,
            rtype,
            class: class.unwrap_or(CLASS_IN),
            ttl: ttl.unwrap_or(DEFAULT_TTL),
            rdata: RData::from_fields(rtype, &fields)?,
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} IN {} {}", self.name, self.ttl, self.rtype, self.rdata)
    }
}

/// Split `text` into character-strings of at most 255 octets
fn character_strings(text: &str) -> Vec<Vec<u8>> {
    if text.is_empty() {
        return vec![Vec::new()];
    }
    text.as_bytes()
        .chunks(MAX_CHARACTER_STRING)
        .map(<[u8]>::to_vec)
        .collect()
}

/// Split record text into fields, honoring double quotes and `;` comments
fn tokenize(line: &str) -> Result<Vec<String>, RecordError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == ';' {
            break;
        } else if c == '"' {
            chars.next();
            let mut token = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped) => token.push(escaped),
                        None => return Err(RecordError::UnterminatedQuote(line.to_string())),
                    },
                    Some(other) => token.push(other),
                    None => return Err(RecordError::UnterminatedQuote(line.to_string())),
                }
            }
            tokens.push(token);
        } else {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == ';' {
                    break;
                }
                token.push(c);
                chars.next();
            }
            tokens.push(token);
        }
    }

    Ok(tokens)
}
