//! DNS Request Handler
//!
//! Turns a decoded query into a response built from the current replica
//! view. Questions that are out of scope or of an unsupported type get no
//! response at all.

use std::sync::Arc;
use tracing::debug;

use crate::dns::classifier::{Classification, DomainConfig, SupportedType};
use crate::dns::message::{Flags, Message, OpCode, Question, ResponseCode};
use crate::dns::record::{
    address_record, authority_record, nameserver_record, service_record, text_record, Record,
};
use crate::membership::{Membership, ReplicaView};

/// Default TTL for every answer (seconds)
pub const DEFAULT_TTL: u32 = 30;

/// DNS handler for cluster discovery
pub struct ClusterDnsHandler {
    /// Source of replica views and the zone revision
    membership: Arc<Membership>,

    /// Names we answer for
    domain: DomainConfig,

    /// TTL for DNS records (seconds)
    ttl: u32,
}

impl ClusterDnsHandler {
    /// Create a new DNS handler
    pub fn new(membership: Arc<Membership>, domain: DomainConfig, ttl: u32) -> Self {
        Self {
            membership,
            domain,
            ttl,
        }
    }

    /// Build the response for `query`, or `None` when we stay silent
    pub async fn handle(&self, query: &Message) -> Option<Message> {
        if query.is_response() || query.opcode != OpCode::Query {
            debug!("Ignoring non-query message id {}", query.id);
            return None;
        }
        if query.questions.is_empty() {
            debug!("Ignoring query id {} without questions", query.id);
            return None;
        }

        // One snapshot for the whole message
        let view = self.membership.snapshot().await;

        let mut answers = Vec::new();
        let mut authoritative = true;

        for question in &query.questions {
            debug!(
                "Received query for {} (my domain: {})",
                question,
                self.domain.domain()
            );

            match self.domain.classify(question) {
                Classification::Answer(SupportedType::Address6) => {
                    authoritative = false;
                }
                Classification::Answer(supported) => {
                    answers.extend(self.answer(question, supported, &view));
                }
                Classification::AddressLiteral(address) if view.contains_address(address) => {
                    answers.push(address_record(&question.name, self.ttl, address));
                }
                Classification::AddressLiteral(address) => {
                    debug!("No replica at {}, not answering {}", address, question);
                    return None;
                }
                Classification::OutOfScope => {
                    debug!("Query outside my domain: {}", question);
                    return None;
                }
                Classification::Unsupported(rtype) => {
                    debug!("Unsupported query type {}: {}", rtype, question);
                    return None;
                }
            }
        }

        let flags = if authoritative {
            Flags::authoritative_response()
        } else {
            Flags::response()
        };

        let response = Message::build(
            query.id,
            OpCode::Query,
            ResponseCode::NoError,
            flags,
            query.questions.clone(),
            answers,
            Vec::new(),
            Vec::new(),
        );

        debug!("Response:\n{}---", response);
        Some(response)
    }

    /// Answer records for one in-scope question
    fn answer(
        &self,
        question: &Question,
        supported: SupportedType,
        view: &ReplicaView,
    ) -> Vec<Record> {
        let owner = question.name.as_str();

        match supported {
            SupportedType::Address6 => Vec::new(),
            // Every replica, leader first when the view is ordered that way
            SupportedType::Address => view
                .addresses()
                .map(|address| address_record(owner, self.ttl, address))
                .collect(),
            SupportedType::Text => vec![text_record(owner, self.ttl, view_text(view))],
            SupportedType::NameServer => view
                .nameservers()
                .map(|replica| nameserver_record(owner, self.ttl, replica.address))
                .collect(),
            SupportedType::Service => view
                .address_port_pairs()
                .map(|(address, port)| {
                    service_record(owner, self.ttl, port, self.domain.address_target(address))
                })
                .collect(),
            SupportedType::ZoneAuthority => {
                let serial = self.membership.revision().current().serial();
                vec![authority_record(owner, self.ttl, self.domain.domain(), serial)]
            }
        }
    }
}

/// `<ROLE> <address>:<port>` per replica, joined with `;`
pub fn view_text(view: &ReplicaView) -> String {
    view.replicas()
        .iter()
        .map(|replica| format!("{} {}", replica.role.name(), replica.endpoint()))
        .collect::<Vec<_>>()
        .join(";")
}
