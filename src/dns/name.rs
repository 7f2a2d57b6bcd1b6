//! Domain Names
//!
//! Names travel through the responder in presentation form (`www.example.com.`).
//! Octets that would be ambiguous in that form are escaped the way zone files
//! escape them: `\.` and `\\` for the separator and the escape character,
//! `\DDD` for anything outside printable ASCII.

use std::fmt::Write;

/// Maximum length of a single label on the wire
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of a full name on the wire, including length octets
pub const MAX_NAME_LEN: usize = 255;

/// Errors raised while converting a presentation name to wire labels
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("empty label in name {0:?}")]
    EmptyLabel(String),

    #[error("label longer than 63 octets in name {0:?}")]
    LabelTooLong(String),

    #[error("name longer than 255 octets: {0:?}")]
    NameTooLong(String),

    #[error("invalid escape sequence in name {0:?}")]
    BadEscape(String),
}

/// Append the presentation form of one wire label to `out`
pub fn push_label(out: &mut String, label: &[u8]) {
    for &b in label {
        match b {
            b'.' | b'\\' => {
                out.push('\\');
                out.push(b as char);
            }
            0x21..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:03}", b);
            }
        }
    }
}

/// Split a presentation name into wire labels.
///
/// Relative names are taken to be relative to the root, so `a.b` and `a.b.`
/// produce the same labels. The root itself (`.`) has no labels.
pub fn to_labels(name: &str) -> Result<Vec<Vec<u8>>, NameError> {
    if name == "." || name.is_empty() {
        return Ok(Vec::new());
    }

    let mut labels = Vec::new();
    let mut current = Vec::new();
    let mut bytes = name.bytes();

    while let Some(b) = bytes.next() {
        match b {
            b'.' => {
                if current.is_empty() {
                    return Err(NameError::EmptyLabel(name.to_string()));
                }
                labels.push(std::mem::take(&mut current));
            }
            b'\\' => {
                let first = bytes
                    .next()
                    .ok_or_else(|| NameError::BadEscape(name.to_string()))?;
                if first.is_ascii_digit() {
                    let mut value = u32::from(first - b'0');
                    for _ in 0..2 {
                        match bytes.next() {
                            Some(d) if d.is_ascii_digit() => {
                                value = value * 10 + u32::from(d - b'0');
                            }
                            _ => return Err(NameError::BadEscape(name.to_string())),
                        }
                    }
                    let octet = u8::try_from(value)
                        .map_err(|_| NameError::BadEscape(name.to_string()))?;
                    current.push(octet);
                } else {
                    current.push(first);
                }
            }
            _ => current.push(b),
        }
        if current.len() > MAX_LABEL_LEN {
            return Err(NameError::LabelTooLong(name.to_string()));
        }
    }

    if !current.is_empty() {
        labels.push(current);
    }

    let wire_len: usize = labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
    if wire_len > MAX_NAME_LEN {
        return Err(NameError::NameTooLong(name.to_string()));
    }

    Ok(labels)
}

/// Decode the escapes in presentation text, dots included, into raw octets.
///
/// Unlike `to_labels` this never fails: an escape that does not parse is kept
/// as written.
pub fn unescape(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let digits = bytes.get(i + 1..i + 4).filter(|d| d.iter().all(u8::is_ascii_digit));
        let decimal = digits.and_then(|d| {
            let value = d.iter().fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0'));
            u8::try_from(value).ok()
        });

        match (decimal, bytes.get(i + 1)) {
            (Some(octet), _) => {
                out.push(octet);
                i += 4;
            }
            (None, Some(&next)) if !next.is_ascii_digit() => {
                out.push(next);
                i += 2;
            }
            _ => {
                out.push(b'\\');
                i += 1;
            }
        }
    }

    out
}

/// Check that a presentation name can be put on the wire
pub fn validate(name: &str) -> Result<(), NameError> {
    to_labels(name).map(|_| ())
}

/// Write a presentation name to `buf` in uncompressed wire form
pub fn encode(buf: &mut Vec<u8>, name: &str) -> Result<(), NameError> {
    for label in to_labels(name)? {
        buf.push(label.len() as u8);
        buf.extend_from_slice(&label);
    }
    buf.push(0);
    Ok(())
}

/// Return `name` with exactly one trailing dot
pub fn fqdn(name: &str) -> String {
    let trimmed = name.trim_end_matches('.');
    format!("{}.", trimmed)
}

/// Return the part of `name` in front of `zone`, without the joining dot.
///
/// Both names are compared ASCII case-insensitively. Returns `Some("")` when
/// the names are equal and `None` when `name` is not at or below `zone`.
pub fn relative_to<'a>(name: &'a str, zone: &str) -> Option<&'a str> {
    let name = name.strip_suffix('.').unwrap_or(name);
    let zone = zone.strip_suffix('.').unwrap_or(zone);

    if zone.is_empty() {
        return Some(name);
    }
    if name.len() < zone.len() {
        return None;
    }

    let split = name.len() - zone.len();
    if !name.as_bytes()[split..].eq_ignore_ascii_case(zone.as_bytes()) {
        return None;
    }
    if split == 0 {
        return Some("");
    }

    let head = name.get(..split)?;
    head.strip_suffix('.')
}

/// Is `name` at or below `zone`?
pub fn is_within(name: &str, zone: &str) -> bool {
    relative_to(name, zone).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_roundtrip_through_escapes() {
        let labels = to_labels("a\\.b.c\\032d.example.").unwrap();
        assert_eq!(labels, vec![b"a.b".to_vec(), b"c d".to_vec(), b"example".to_vec()]);

        let mut text = String::new();
        push_label(&mut text, &labels[0]);
        text.push('.');
        push_label(&mut text, &labels[1]);
        assert_eq!(text, "a\\.b.c\\032d");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("hello\\032world"), b"hello world");
        assert_eq!(unescape("a\\.b.c"), b"a.b.c");
        assert_eq!(unescape("back\\\\slash"), b"back\\slash");
        assert_eq!(unescape("\\255"), vec![255u8]);
        // Malformed escapes are kept as written
        assert_eq!(unescape("a\\300"), b"a\\300");
        assert_eq!(unescape("trailing\\"), b"trailing\\");
    }

    #[test]
    fn test_root_and_relative_names() {
        assert!(to_labels(".").unwrap().is_empty());
        assert_eq!(to_labels("a.b").unwrap(), to_labels("a.b.").unwrap());
    }

    #[test]
    fn test_rejects_bad_names() {
        assert!(matches!(to_labels("a..b."), Err(NameError::EmptyLabel(_))));
        assert!(matches!(to_labels(".a"), Err(NameError::EmptyLabel(_))));

        let long_label = "x".repeat(64);
        assert!(matches!(
            to_labels(&format!("{}.com.", long_label)),
            Err(NameError::LabelTooLong(_))
        ));

        // 4 labels of 63 octets are 257 octets on the wire
        let label = "y".repeat(63);
        let long_name = format!("{0}.{0}.{0}.{0}.", label);
        assert!(matches!(to_labels(&long_name), Err(NameError::NameTooLong(_))));

        assert!(matches!(to_labels("a\\2"), Err(NameError::BadEscape(_))));
        assert!(matches!(to_labels("a\\300.b"), Err(NameError::BadEscape(_))));
    }

    #[test]
    fn test_encode() {
        let mut buf = Vec::new();
        encode(&mut buf, "ok.example.com.").unwrap();
        assert_eq!(buf, b"\x02ok\x07example\x03com\x00".to_vec());

        let mut root = Vec::new();
        encode(&mut root, ".").unwrap();
        assert_eq!(root, vec![0]);
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to("a.b.example.com.", "example.com."), Some("a.b"));
        assert_eq!(relative_to("A.B.EXAMPLE.Com.", "example.com."), Some("A.B"));
        assert_eq!(relative_to("example.com.", "example.com."), Some(""));
        assert_eq!(relative_to("badexample.com.", "example.com."), None);
        assert_eq!(relative_to("example.org.", "example.com."), None);
        assert!(is_within("x.example.com", "example.com."));
    }

    #[test]
    fn test_fqdn() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com.."), "example.com.");
    }
}
