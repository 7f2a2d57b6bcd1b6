//! Value Codec
//!
//! Renders registry values as answer content for each record type.
//!
//! | Type  | Set answer                  | Get answer                                   |
//! |-------|-----------------------------|----------------------------------------------|
//! | A     | sentinel `1.1.1.1`          | the value if it is IPv4, else the sentinel   |
//! | AAAA  | sentinel                    | sentinel, even for IPv6 values               |
//! | CNAME | `ok.<base>`                 | base32hex of the value + `.<base>`           |
//! | TXT   | `OK`                        | the value                                    |
//!
//! CNAME and TXT content is cut to 255 bytes without any marker. A CNAME
//! target is cut further, to the longest value prefix whose encoding still
//! forms a valid name under the base domain.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::dns::name::{self, MAX_LABEL_LEN};
use crate::dns::record::RecordType;
use crate::protocol::base32;

/// A answer when no IPv4 value applies
pub const SENTINEL_IPV4: Ipv4Addr = Ipv4Addr::new(1, 1, 1, 1);

/// AAAA answer for every query (2606:4700:4700::1111)
pub const SENTINEL_IPV6: Ipv6Addr = Ipv6Addr::new(0x2606, 0x4700, 0x4700, 0, 0, 0, 0, 0x1111);

/// Maximum length of CNAME and TXT content
pub const MAX_CONTENT_LEN: usize = 255;

/// TXT acknowledgment for a set
pub const SET_ACK_TEXT: &str = "OK";

/// Label under the base domain used as the CNAME acknowledgment for a set
pub const SET_ACK_LABEL: &str = "ok";

/// Answer types in the order they are emitted for ANY questions
const ANSWER_TYPES: [RecordType; 4] = [
    RecordType::A,
    RecordType::AAAA,
    RecordType::CNAME,
    RecordType::TXT,
];

/// One synthesized answer: a record type and its rdata text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub rtype: RecordType,
    pub content: String,
}

/// Renders answers for one base domain
#[derive(Debug, Clone)]
pub struct ValueCodec {
    base_domain: String,
}

impl ValueCodec {
    pub fn new(base_domain: &str) -> Self {
        Self {
            base_domain: name::fqdn(base_domain),
        }
    }

    /// Acknowledgment answers for a set, for the types covered by `qtype`
    pub fn set_answers(&self, qtype: RecordType) -> Vec<Answer> {
        self.render(qtype, |rtype| match rtype {
            RecordType::A => SENTINEL_IPV4.to_string(),
            RecordType::AAAA => SENTINEL_IPV6.to_string(),
            RecordType::CNAME => {
                truncate(&format!("{}.{}", SET_ACK_LABEL, self.base_domain), MAX_CONTENT_LEN)
                    .to_string()
            }
            _ => truncate(SET_ACK_TEXT, MAX_CONTENT_LEN).to_string(),
        })
    }

    /// Answers carrying a stored `value`, for the types covered by `qtype`
    pub fn get_answers(&self, value: &str, qtype: RecordType) -> Vec<Answer> {
        self.render(qtype, |rtype| match rtype {
            RecordType::A if is_ipv4(value) => value.to_string(),
            RecordType::A => SENTINEL_IPV4.to_string(),
            RecordType::AAAA => SENTINEL_IPV6.to_string(),
            RecordType::CNAME => self.cname_target(value),
            _ => {
                let text = String::from_utf8_lossy(&name::unescape(value)).into_owned();
                truncate(&text, MAX_CONTENT_LEN).to_string()
            }
        })
    }

    /// CNAME target carrying `value`: base32hex split into labels, under the base domain.
    ///
    /// Long values are cut byte by byte until the target fits in a DNS name, so
    /// the labels always decode to a prefix of the value.
    pub fn cname_target(&self, value: &str) -> String {
        let bytes = value.as_bytes();
        let mut len = bytes.len().min(MAX_CONTENT_LEN);
        loop {
            let target = self.encode_under_base(&bytes[..len]);
            if len == 0 || name::validate(&target).is_ok() {
                return target;
            }
            len -= 1;
        }
    }

    fn encode_under_base(&self, data: &[u8]) -> String {
        let encoded = base32::encode(data);
        let labels: Vec<&str> = encoded
            .as_bytes()
            .chunks(MAX_LABEL_LEN)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .collect();

        if labels.is_empty() {
            self.base_domain.clone()
        } else {
            format!("{}.{}", labels.join("."), self.base_domain)
        }
    }

    fn render(&self, qtype: RecordType, content: impl Fn(RecordType) -> String) -> Vec<Answer> {
        ANSWER_TYPES
            .iter()
            .filter(|rtype| qtype.covers(**rtype))
            .map(|&rtype| Answer {
                rtype,
                content: content(rtype),
            })
            .collect()
    }
}

/// Cut `text` to at most `max` bytes, backing off to a character boundary
pub fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// A value counts as IPv4 when it parses as an IP literal and a `.` shows up
/// before any `:`.
///
/// IPv4-mapped IPv6 literals such as `::ffff:1.2.3.4` fail the second check.
pub fn is_ipv4(value: &str) -> bool {
    if value.parse::<IpAddr>().is_err() {
        return false;
    }
    value.bytes().find(|&b| b == b'.' || b == b':') == Some(b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> ValueCodec {
        ValueCodec::new("example.com.")
    }

    fn contents(answers: &[Answer]) -> Vec<(RecordType, &str)> {
        answers.iter().map(|a| (a.rtype, a.content.as_str())).collect()
    }

    #[test]
    fn test_is_ipv4() {
        assert!(is_ipv4("1.2.3.4"));
        assert!(is_ipv4("255.255.255.255"));
        assert!(!is_ipv4("1.2.3"));
        assert!(!is_ipv4("1.2.3.256"));
        assert!(!is_ipv4("hello"));
        assert!(!is_ipv4("::1"));
        assert!(!is_ipv4("::ffff:1.2.3.4"));
        assert!(!is_ipv4("2606:4700:4700::1111"));
        assert!(!is_ipv4(""));
    }

    #[test]
    fn test_set_answers_for_any() {
        let answers = codec().set_answers(RecordType::ANY);
        assert_eq!(
            contents(&answers),
            vec![
                (RecordType::A, "1.1.1.1"),
                (RecordType::AAAA, "2606:4700:4700::1111"),
                (RecordType::CNAME, "ok.example.com."),
                (RecordType::TXT, "OK"),
            ]
        );
    }

    #[test]
    fn test_set_answers_for_single_type() {
        assert_eq!(
            contents(&codec().set_answers(RecordType::TXT)),
            vec![(RecordType::TXT, "OK")]
        );
        assert!(codec().set_answers(RecordType::NS).is_empty());
        assert!(codec().set_answers(RecordType::SOA).is_empty());
    }

    #[test]
    fn test_get_answers_ipv4_value() {
        let answers = codec().get_answers("1.2.3.4", RecordType::A);
        assert_eq!(contents(&answers), vec![(RecordType::A, "1.2.3.4")]);
    }

    #[test]
    fn test_get_answers_non_ipv4_value_uses_sentinel() {
        let answers = codec().get_answers("hello", RecordType::A);
        assert_eq!(contents(&answers), vec![(RecordType::A, "1.1.1.1")]);
    }

    #[test]
    fn test_get_aaaa_never_reflects_ipv6_values() {
        // Known limitation: only the A answer reflects stored addresses
        let answers = codec().get_answers("2001:db8::1", RecordType::AAAA);
        assert_eq!(contents(&answers), vec![(RecordType::AAAA, "2606:4700:4700::1111")]);
    }

    #[test]
    fn test_get_answers_for_any() {
        let answers = codec().get_answers("hello", RecordType::ANY);
        assert_eq!(
            contents(&answers),
            vec![
                (RecordType::A, "1.1.1.1"),
                (RecordType::AAAA, "2606:4700:4700::1111"),
                (RecordType::CNAME, "D1IMOR3F.example.com."),
                (RecordType::TXT, "hello"),
            ]
        );
    }

    #[test]
    fn test_txt_truncated_to_255() {
        let value = "v".repeat(400);
        let answers = codec().get_answers(&value, RecordType::TXT);
        assert_eq!(answers[0].content.len(), MAX_CONTENT_LEN);
    }

    #[test]
    fn test_cname_target_roundtrip() {
        let target = codec().cname_target("my value");
        let encoded = target.strip_suffix(".example.com.").unwrap();
        assert_eq!(base32::decode(encoded).unwrap(), b"my value");
    }

    #[test]
    fn test_cname_target_splits_long_labels() {
        let value = "x".repeat(60);
        let target = codec().cname_target(&value);
        assert!(target.len() <= MAX_CONTENT_LEN);
        assert!(target.split('.').all(|label| label.len() <= MAX_LABEL_LEN));

        let encoded: String = target
            .strip_suffix(".example.com.")
            .unwrap()
            .split('.')
            .collect();
        assert_eq!(base32::decode(&encoded).unwrap(), value.as_bytes());
    }

    #[test]
    fn test_long_cname_target_stays_a_valid_name() {
        let value = "z".repeat(500);
        let target = codec().cname_target(&value);
        assert!(name::validate(&target).is_ok());
        assert!(target.len() < MAX_CONTENT_LEN);

        let encoded: String = target
            .strip_suffix(".example.com.")
            .unwrap()
            .split('.')
            .collect();
        let decoded = base32::decode(&encoded).unwrap();
        assert!(!decoded.is_empty());
        assert!(value.as_bytes().starts_with(&decoded));

        // One more byte would no longer fit
        let longer = codec().encode_under_base(&value.as_bytes()[..decoded.len() + 1]);
        assert!(name::validate(&longer).is_err());
    }

    #[test]
    fn test_cname_target_under_long_base_domain() {
        let base = format!("{}.{}.{}.", "b".repeat(63), "c".repeat(63), "d".repeat(63));
        let codec = ValueCodec::new(&base);
        let target = codec.cname_target("hello world");
        assert!(name::validate(&target).is_ok());
        assert!(target.ends_with(&base));
    }

    #[test]
    fn test_txt_decodes_escaped_octets() {
        let answers = codec().get_answers("hello\\032world\\.x", RecordType::TXT);
        assert_eq!(contents(&answers), vec![(RecordType::TXT, "hello world.x")]);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("aé", 2), "a");
    }
}
