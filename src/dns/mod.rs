//! DNS Server Module
//!
//! A small authoritative DNS engine: wire decoding and encoding, records
//! built from their textual form, and a UDP server in front of the
//! set/get responder.
//!
//! ## Answers
//!
//! - A / AAAA: stored IPv4 value or a sentinel address
//! - CNAME: base32hex-encoded value under the base domain
//! - TXT: stored value
//! - NS / SOA: preformatted records from configuration

mod handler;
pub mod message;
pub mod name;
pub mod record;
mod server;

pub use handler::DdnsResponder;
pub use server::run_dns_server;
