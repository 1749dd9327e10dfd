use std::rc::Rc;

use hickory_proto::op::{Message, MessageType, ResponseCode};
use tern_dns_domain::ResolverError;
use tracing::{debug, warn};

use crate::ports::{DnsAnswer, DnsEngine};

/// Orchestrates one inbound client request against the engine, applying the
/// RCODE/flag terminate policy from §4.4 ("if the answer RCODE is still
/// NOERROR at terminate time and the result is an internal failure, set
/// RCODE to SERVFAIL; always set QR, clear AA, set RA").
pub struct HandleQueryUseCase {
    engine: Rc<dyn DnsEngine>,
}

impl HandleQueryUseCase {
    pub fn new(engine: Rc<dyn DnsEngine>) -> Self {
        Self { engine }
    }

    pub async fn execute(&self, query: &Message) -> Message {
        match self.engine.resolve(query).await {
            Ok(DnsAnswer { mut message, cache_hit, .. }) => {
                Self::finalize_header(&mut message);
                debug!(cache_hit, id = query.id(), "query resolved");
                message
            }
            Err(err) => {
                warn!(?err, id = query.id(), "query failed, answering SERVFAIL");
                Self::servfail_for(query, err)
            }
        }
    }

    fn finalize_header(message: &mut Message) {
        message.set_message_type(MessageType::Response);
        message.set_authoritative(false);
        message.set_recursion_available(true);
    }

    fn servfail_for(query: &Message, _err: ResolverError) -> Message {
        let mut response = Message::new();
        response.set_id(query.id());
        response.set_message_type(MessageType::Response);
        response.set_op_code(query.op_code());
        for q in query.queries() {
            response.add_query(q.clone());
        }
        response.set_recursion_desired(query.recursion_desired());
        response.set_recursion_available(true);
        response.set_authoritative(false);
        response.set_response_code(ResponseCode::ServFail);
        response
    }
}
