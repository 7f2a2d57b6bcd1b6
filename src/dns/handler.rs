//! DNS Request Handler
//!
//! Turns each question of a request into answer records:
//!
//! ```text
//! classify name -> check token -> set or get in the registry -> render answers
//! ```
//!
//! A question that fails any step is dropped without an error answer; the
//! reply still goes out as NOERROR with whatever the other questions produced.
//! NS and SOA records from the configuration are appended once per message
//! when any question asks for them.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::DdnsConfig;
use crate::dns::message::{Message, Question, OPCODE_QUERY, RCODE_REFUSED};
use crate::dns::name;
use crate::dns::record::{Record, RecordError, RecordType};
use crate::metrics::Metrics;
use crate::protocol::{Answer, DdnsQuery, NameGrammar, TokenAuthenticator, ValueCodec};
use crate::registry::Registry;

/// Responder for set/get queries under one base domain
pub struct DdnsResponder {
    /// Configuration
    config: Arc<DdnsConfig>,

    grammar: NameGrammar,
    auth: TokenAuthenticator,
    codec: ValueCodec,

    /// Key-value store shared by all requests
    registry: Arc<dyn Registry>,

    metrics: Arc<Metrics>,
}

impl DdnsResponder {
    /// Create a new responder
    pub fn new(
        config: Arc<DdnsConfig>,
        registry: Arc<dyn Registry>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            grammar: NameGrammar::new(&config.base_domain),
            auth: TokenAuthenticator::new(config.token.clone()),
            codec: ValueCodec::new(&config.base_domain),
            config,
            registry,
            metrics,
        }
    }

    /// Build the reply for one request
    pub async fn handle(&self, request: &Message) -> Message {
        self.metrics.inc_queries();
        let mut reply = Message::reply_to(request);

        if request.header.opcode() != OPCODE_QUERY {
            debug!("Ignoring opcode {}", request.header.opcode());
            return reply;
        }

        // Route on the first question, refusing anything outside the zone
        let in_zone = request
            .questions
            .first()
            .is_some_and(|q| name::is_within(&q.name, &self.config.base_domain));
        if !in_zone {
            reply.header.set_rcode(RCODE_REFUSED);
            return reply;
        }

        let mut include_ns = false;
        let mut include_soa = false;

        for question in &request.questions {
            debug!("Query for {} {}", question.name, question.qtype);

            if !question.qtype.is_answerable() {
                self.metrics.inc_skipped();
                continue;
            }

            include_ns |= question.qtype.covers(RecordType::NS);
            include_soa |= question.qtype.covers(RecordType::SOA);

            self.answer_question(question, &mut reply).await;
        }

        if include_ns {
            for ns in &self.config.ns_records {
                self.append_configured(&mut reply, ns);
            }
        }
        if include_soa {
            self.append_configured(&mut reply, self.config.soa_record());
        }

        self.metrics.add_answers(reply.answers.len() as u64);
        reply
    }

    async fn answer_question(&self, question: &Question, reply: &mut Message) {
        let Some(query) = self.grammar.classify(&question.name) else {
            debug!("Skipping {}: not a set/get name", question.name);
            self.metrics.inc_skipped();
            return;
        };

        if !self.auth.verify(query.token()) {
            debug!("Skipping {}: token mismatch for key {}", question.name, query.key());
            self.metrics.inc_auth_failures();
            return;
        }

        let answers = match query {
            DdnsQuery::Set { key, value, .. } => {
                self.registry.set(&key, &value).await;
                self.metrics.inc_sets();
                info!("Registry: set {} to {}", key, value);
                self.codec.set_answers(question.qtype)
            }
            DdnsQuery::Get { key, .. } => match self.registry.get(&key).await {
                Some(value) => {
                    self.metrics.inc_gets();
                    info!("Registry: {} is {}", key, value);
                    self.codec.get_answers(&value, question.qtype)
                }
                None => {
                    self.metrics.inc_get_misses();
                    info!("Registry: no entry for {}", key);
                    return;
                }
            },
        };

        for answer in answers {
            if let Err(e) = append_answer(reply, &question.name, &answer) {
                warn!(
                    "Dropping {} answer for {}: {}",
                    answer.rtype, question.name, e
                );
            }
        }
    }

    /// Append a record configured as text, logging instead of failing on bad input
    fn append_configured(&self, reply: &mut Message, text: &str) {
        match text.parse::<Record>() {
            Ok(record) => reply.answers.push(record),
            Err(e) => warn!("Skipping configured record {:?}: {}", text, e),
        }
    }
}

fn append_answer(reply: &mut Message, owner: &str, answer: &Answer) -> Result<(), RecordError> {
    let record = Record::new(owner, answer.rtype, &answer.content)?;
    debug!("Answer {}", record);
    reply.answers.push(record);
    Ok(())
}
