//! DDNS Protocol
//!
//! Everything that gives query names their meaning: the name grammar for
//! set/get operations, the token check and the rendering of values as
//! answer records.

mod auth;
mod base32;
mod codec;
mod grammar;

pub use auth::TokenAuthenticator;
pub use codec::{Answer, ValueCodec};
pub use grammar::{is_token, DdnsQuery, NameGrammar};

#[cfg(test)]
pub use base32::decode as base32_decode;
#[cfg(test)]
pub use codec::{SENTINEL_IPV4, SENTINEL_IPV6};
