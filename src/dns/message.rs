//! DNS Messages
//!
//! Wire decoding and encoding for whole messages. Inbound names may use
//! compression pointers; outbound messages are always written uncompressed.

use crate::dns::name::{self, NameError, MAX_NAME_LEN};
use crate::dns::record::{Record, RecordType};

/// DNS packet constants
pub const HEADER_SIZE: usize = 12;
pub const MAX_UDP_PAYLOAD: usize = 512;
pub const RECV_BUFFER_SIZE: usize = 4096;

/// DNS flags
pub const FLAG_QR: u16 = 0x8000; // Query/Response
pub const FLAG_AA: u16 = 0x0400; // Authoritative Answer
pub const FLAG_TC: u16 = 0x0200; // Truncated
pub const FLAG_RD: u16 = 0x0100; // Recursion Desired
pub const FLAG_CD: u16 = 0x0010; // Checking Disabled

const OPCODE_MASK: u16 = 0x7800;
const RCODE_MASK: u16 = 0x000f;

/// Opcodes
pub const OPCODE_QUERY: u8 = 0;

/// Response codes
pub const RCODE_NOERROR: u8 = 0;
pub const RCODE_REFUSED: u8 = 5;

/// Maximum compression pointers followed while reading one name
const MAX_POINTER_HOPS: usize = 64;

/// Errors raised while decoding a packet
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("packet shorter than the DNS header ({0} bytes)")]
    ShortHeader(usize),

    #[error("packet truncated at offset {0}")]
    Truncated(usize),

    #[error("invalid label type 0x{0:02x}")]
    BadLabel(u8),

    #[error("too many compression pointers")]
    PointerLoop,

    #[error("name longer than 255 octets")]
    NameTooLong,

    #[error("malformed {0} rdata")]
    BadRdata(RecordType),
}

/// Message header; section counts are derived from the sections themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub id: u16,
    pub flags: u16,
}

impl Header {
    pub fn is_response(&self) -> bool {
        self.has_flag(FLAG_QR)
    }

    pub fn opcode(&self) -> u8 {
        ((self.flags & OPCODE_MASK) >> 11) as u8
    }

    pub fn rcode(&self) -> u8 {
        (self.flags & RCODE_MASK) as u8
    }

    pub fn set_rcode(&mut self, rcode: u8) {
        self.flags = (self.flags & !RCODE_MASK) | (u16::from(rcode) & RCODE_MASK);
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }
}

/// A question entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: RecordType,
    pub qclass: u16,
}

/// A DNS message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authority: Vec<Record>,
    pub additional: Vec<Record>,
}

impl Message {
    /// Start a reply to `request`: same ID, opcode and questions, QR and AA set,
    /// RD and CD copied, RCODE NOERROR
    pub fn reply_to(request: &Message) -> Self {
        let copied = request.header.flags & (OPCODE_MASK | FLAG_RD | FLAG_CD);
        Self {
            header: Header {
                id: request.header.id,
                flags: FLAG_QR | FLAG_AA | copied,
            },
            questions: request.questions.clone(),
            ..Default::default()
        }
    }

    /// UDP payload size the sender can receive, from its EDNS OPT record
    pub fn max_udp_payload(&self) -> usize {
        self.additional
            .iter()
            .find(|r| r.rtype == RecordType::OPT)
            .map(|opt| usize::from(opt.class).clamp(MAX_UDP_PAYLOAD, RECV_BUFFER_SIZE))
            .unwrap_or(MAX_UDP_PAYLOAD)
    }

    /// Decode a message from wire form
    pub fn decode(packet: &[u8]) -> Result<Self, WireError> {
        if packet.len() < HEADER_SIZE {
            return Err(WireError::ShortHeader(packet.len()));
        }

        let word = |i: usize| u16::from_be_bytes([packet[i], packet[i + 1]]);
        let header = Header {
            id: word(0),
            flags: word(2),
        };
        let qdcount = word(4);
        let ancount = word(6);
        let nscount = word(8);
        let arcount = word(10);

        let mut offset = HEADER_SIZE;

        let mut questions = Vec::with_capacity(qdcount as usize);
        for _ in 0..qdcount {
            let (name, pos) = read_name(packet, offset)?;
            let fixed = packet.get(pos..pos + 4).ok_or(WireError::Truncated(pos))?;
            questions.push(Question {
                name,
                qtype: RecordType::from_u16(u16::from_be_bytes([fixed[0], fixed[1]])),
                qclass: u16::from_be_bytes([fixed[2], fixed[3]]),
            });
            offset = pos + 4;
        }

        let mut read_section = |count: u16| -> Result<Vec<Record>, WireError> {
            let mut records = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (record, next) = Record::decode(packet, offset)?;
                records.push(record);
                offset = next;
            }
            Ok(records)
        };

        let answers = read_section(ancount)?;
        let authority = read_section(nscount)?;
        let additional = read_section(arcount)?;

        Ok(Self {
            header,
            questions,
            answers,
            authority,
            additional,
        })
    }

    /// Encode the message, dropping records that would push it past `max_size`.
    ///
    /// Questions are always written. When any record is dropped the TC flag is set.
    pub fn encode(&self, max_size: usize) -> Result<Vec<u8>, NameError> {
        let mut body = Vec::with_capacity(max_size);
        for question in &self.questions {
            name::encode(&mut body, &question.name)?;
            body.extend_from_slice(&question.qtype.to_u16().to_be_bytes());
            body.extend_from_slice(&question.qclass.to_be_bytes());
        }

        let mut flags = self.header.flags;
        let mut counts = [0u16; 3];
        let mut truncated = false;
        let sections = [&self.answers, &self.authority, &self.additional];

        for (count, section) in counts.iter_mut().zip(sections) {
            for record in section {
                if truncated {
                    break;
                }
                let mut encoded = Vec::new();
                record.encode(&mut encoded)?;
                if HEADER_SIZE + body.len() + encoded.len() > max_size {
                    truncated = true;
                    break;
                }
                body.extend_from_slice(&encoded);
                *count += 1;
            }
        }

        if truncated {
            flags |= FLAG_TC;
        }

        let mut packet = Vec::with_capacity(HEADER_SIZE + body.len());
        packet.extend_from_slice(&self.header.id.to_be_bytes());
        packet.extend_from_slice(&flags.to_be_bytes());
        packet.extend_from_slice(&(self.questions.len() as u16).to_be_bytes());
        for count in counts {
            packet.extend_from_slice(&count.to_be_bytes());
        }
        packet.extend_from_slice(&body);

        Ok(packet)
    }
}

/// Read a possibly compressed name at `offset`.
///
/// Returns the presentation form (always with a trailing dot) and the offset
/// just past the name at its original position.
pub fn read_name(packet: &[u8], offset: usize) -> Result<(String, usize), WireError> {
    let mut text = String::new();
    let mut pos = offset;
    let mut resume_at = None;
    let mut hops = 0;
    let mut wire_len = 1;

    loop {
        let len = *packet.get(pos).ok_or(WireError::Truncated(pos))?;
        match len & 0xC0 {
            0x00 => {
                if len == 0 {
                    pos += 1;
                    break;
                }
                let start = pos + 1;
                let end = start + len as usize;
                let label = packet.get(start..end).ok_or(WireError::Truncated(start))?;

                wire_len += label.len() + 1;
                if wire_len > MAX_NAME_LEN {
                    return Err(WireError::NameTooLong);
                }

                name::push_label(&mut text, label);
                text.push('.');
                pos = end;
            }
            0xC0 => {
                let low = *packet.get(pos + 1).ok_or(WireError::Truncated(pos + 1))?;
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(WireError::PointerLoop);
                }
                if resume_at.is_none() {
                    resume_at = Some(pos + 2);
                }
                pos = (usize::from(len & 0x3F) << 8) | usize::from(low);
            }
            _ => return Err(WireError::BadLabel(len)),
        }
    }

    if text.is_empty() {
        text.push('.');
    }

    Ok((text, resume_at.unwrap_or(pos)))
}
