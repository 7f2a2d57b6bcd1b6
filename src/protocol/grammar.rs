//! Query Name Grammar
//!
//! Two name shapes are recognized under the base domain:
//!
//! ```text
//! <value>.<key>.<nonce>.<token>.ddns-set.<base>
//! <key>.<nonce>.<token>.ddns-get.<base>
//! ```
//!
//! Fields are peeled off from the right, one label at a time. Whatever is left
//! in front of `<key>` on a set name is the value, dots included, so values may
//! span several labels.
//!
//! The nonce has to be present and numeric but is otherwise ignored. It only
//! exists so that repeated operations produce distinct names and caching
//! resolvers never answer them from cache.

use crate::dns::name;

/// Label marking a set operation
pub const SET_MARKER: &str = "ddns-set";

/// Label marking a get operation
pub const GET_MARKER: &str = "ddns-get";

/// A query name decoded into an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdnsQuery {
    Set {
        key: String,
        value: String,
        nonce: String,
        token: String,
    },
    Get {
        key: String,
        nonce: String,
        token: String,
    },
}

impl DdnsQuery {
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Get { key, .. } => key,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Self::Set { token, .. } | Self::Get { token, .. } => token,
        }
    }
}

/// Classifies query names under one base domain
#[derive(Debug, Clone)]
pub struct NameGrammar {
    base_domain: String,
}

impl NameGrammar {
    pub fn new(base_domain: &str) -> Self {
        Self {
            base_domain: name::fqdn(base_domain),
        }
    }

    /// Decode `qname`, trying the set shape first and then the get shape.
    ///
    /// Returns `None` for names that match neither; such questions are skipped.
    pub fn classify(&self, qname: &str) -> Option<DdnsQuery> {
        self.match_set(qname).or_else(|| self.match_get(qname))
    }

    fn match_set(&self, qname: &str) -> Option<DdnsQuery> {
        let fields = self.strip_suffix(qname, SET_MARKER)?;
        let (rest, token) = fields.rsplit_once('.')?;
        let (rest, nonce) = rest.rsplit_once('.')?;
        let (value, key) = rest.rsplit_once('.')?;

        if value.is_empty() || key.is_empty() || !is_nonce(nonce) || !is_token(token) {
            return None;
        }

        Some(DdnsQuery::Set {
            key: key.to_string(),
            value: value.to_string(),
            nonce: nonce.to_string(),
            token: token.to_string(),
        })
    }

    fn match_get(&self, qname: &str) -> Option<DdnsQuery> {
        let fields = self.strip_suffix(qname, GET_MARKER)?;
        let (rest, token) = fields.rsplit_once('.')?;
        let (key, nonce) = rest.rsplit_once('.')?;

        if key.is_empty() || key.contains('.') || !is_nonce(nonce) || !is_token(token) {
            return None;
        }

        Some(DdnsQuery::Get {
            key: key.to_string(),
            nonce: nonce.to_string(),
            token: token.to_string(),
        })
    }

    /// Strip `.<marker>.<base>` and return the labels in front of it
    fn strip_suffix<'a>(&self, qname: &'a str, marker: &str) -> Option<&'a str> {
        let relative = name::relative_to(qname, &self.base_domain)?;
        let (fields, last) = relative.rsplit_once('.')?;
        if last.eq_ignore_ascii_case(marker) {
            Some(fields)
        } else {
            None
        }
    }
}

fn is_nonce(label: &str) -> bool {
    !label.is_empty() && label.bytes().all(|b| b.is_ascii_digit())
}

/// Word characters only: ASCII letters, digits and underscore
pub fn is_token(label: &str) -> bool {
    !label.is_empty() && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> NameGrammar {
        NameGrammar::new("example.com.")
    }

    #[test]
    fn test_set_query() {
        let query = grammar()
            .classify("hello.world.42.abc123.ddns-set.example.com.")
            .unwrap();
        assert_eq!(
            query,
            DdnsQuery::Set {
                key: "world".to_string(),
                value: "hello".to_string(),
                nonce: "42".to_string(),
                token: "abc123".to_string(),
            }
        );
    }

    #[test]
    fn test_set_value_spans_labels() {
        let query = grammar()
            .classify("1.2.3.4.host1.7.tok.ddns-set.example.com.")
            .unwrap();
        assert_eq!(query.key(), "host1");
        match query {
            DdnsQuery::Set { value, .. } => assert_eq!(value, "1.2.3.4"),
            other => panic!("expected set, got {:?}", other),
        }
    }

    #[test]
    fn test_get_query() {
        let query = grammar().classify("world.99.abc123.ddns-get.example.com.").unwrap();
        assert_eq!(
            query,
            DdnsQuery::Get {
                key: "world".to_string(),
                nonce: "99".to_string(),
                token: "abc123".to_string(),
            }
        );
    }

    #[test]
    fn test_fixed_labels_ignore_case_fields_keep_it() {
        let query = grammar().classify("MyKey.1.Tok_1.DDNS-GET.Example.COM.").unwrap();
        assert_eq!(query.key(), "MyKey");
        assert_eq!(query.token(), "Tok_1");
    }

    #[test]
    fn test_name_without_trailing_dot() {
        assert!(grammar().classify("k.1.t.ddns-get.example.com").is_some());
    }

    #[test]
    fn test_invalid_names() {
        let g = grammar();
        // Missing value
        assert_eq!(g.classify("key.1.tok.ddns-set.example.com."), None);
        // Non-numeric nonce
        assert_eq!(g.classify("v.key.x1.tok.ddns-set.example.com."), None);
        assert_eq!(g.classify("key.x1.tok.ddns-get.example.com."), None);
        // Token with non-word characters
        assert_eq!(g.classify("key.1.to-k.ddns-get.example.com."), None);
        // Get key cannot span labels
        assert_eq!(g.classify("a.key.1.tok.ddns-get.example.com."), None);
        // Wrong base domain
        assert_eq!(g.classify("key.1.tok.ddns-get.example.org."), None);
        // Marker not directly under the base domain
        assert_eq!(g.classify("key.1.tok.ddns-get.sub.example.com."), None);
        // Plain names
        assert_eq!(g.classify("example.com."), None);
        assert_eq!(g.classify("www.example.com."), None);
    }

    #[test]
    fn test_value_may_contain_markers() {
        let query = grammar()
            .classify("a.ddns-get.b.key.5.tok.ddns-set.example.com.")
            .unwrap();
        match query {
            DdnsQuery::Set { key, value, .. } => {
                assert_eq!(key, "key");
                assert_eq!(value, "a.ddns-get.b");
            }
            other => panic!("expected set, got {:?}", other),
        }
    }

    #[test]
    fn test_is_token() {
        assert!(is_token("abc_123"));
        assert!(!is_token(""));
        assert!(!is_token("a-b"));
    }
}
