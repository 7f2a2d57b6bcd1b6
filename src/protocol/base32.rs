//! Base-32 with the RFC 4648 "extended hex" alphabet.
//!
//! Output is upper-case and unpadded, so every character is valid in a DNS
//! label and the encoding sorts the same way as the input.

/// RFC4648 "extended hex" encoding table
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHIJKLMNOPQRSTUV";

/// Encode bytes into an unpadded base32hex string
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u16 = 0;
    let mut bits = 0u32;

    for &byte in data {
        buffer = (buffer << 8) | u16::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1F) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(ALPHABET[((buffer << (5 - bits)) & 0x1F) as usize] as char);
    }

    out
}

/// Error returned for input that is not base32hex
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidBase32;

/// Decode a base32hex string, with or without `=` padding, in either case
#[cfg(test)]
pub fn decode(text: &str) -> Result<Vec<u8>, InvalidBase32> {
    let text = text.trim_end_matches('=');
    // Lengths that leave a dangling partial character are not valid encodings
    if matches!(text.len() % 8, 1 | 3 | 6) {
        return Err(InvalidBase32);
    }

    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u16 = 0;
    let mut bits = 0u32;

    for c in text.bytes() {
        let value = match c.to_ascii_uppercase() {
            d @ b'0'..=b'9' => d - b'0',
            l @ b'A'..=b'V' => l - b'A' + 10,
            _ => return Err(InvalidBase32),
        };
        buffer = (buffer << 5) | u16::from(value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }

    Ok(out)
}
