//! Serving DNS requests from a [`Resolver`]
//!
//! [`Handler`] turns a DNS request into a response message. It can be driven
//! by a hickory [`ServerFuture`](hickory_server::ServerFuture) as a
//! [`RequestHandler`], or called directly as a [`tower::Service`]. Both share
//! [`Handler::respond_to`], so they always produce the same message.
//!
//! Response codes follow the outcome of resolution:
//!
//! - answers found: `NOERROR`, authoritative
//! - no answers, enclosing SOA found: `NOERROR` when the name holds other data,
//!   otherwise `NXDOMAIN`; the SOA goes in the authority section
//! - no answers and no SOA: `REFUSED`, since the name is outside every zone
//! - malformed question, or a response sent as a request: `FORMERR`
//! - storage failure: `SERVFAIL`
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use hickory_proto::op::{Edns, Header, Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::DNSClass;
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use crate::error::ResolveError;
use crate::resolver::{Answer, Resolver};

/// The only EDNS version this server speaks.
const EDNS_VERSION: u8 = 0;

/// Smallest UDP payload advertised in a response OPT record.
const MIN_PAYLOAD: u16 = 512;

/// How a request was settled, before it is written out as a message.
#[derive(Debug)]
enum Outcome {
    /// Resolution reached a zone: answers, or an SOA vouching for their absence.
    Resolved { code: ResponseCode, answer: Answer },

    /// The request gets a bare response code and no records.
    Rejected(ResponseCode),
}

impl Outcome {
    fn code(&self) -> ResponseCode {
        match self {
            Outcome::Resolved { code, .. } | Outcome::Rejected(code) => *code,
        }
    }
}

/// Answers DNS requests using a [`Resolver`].
#[derive(Clone)]
pub struct Handler {
    resolver: Resolver,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl Handler {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Build the response message for `request`.
    ///
    /// Every response, including rejections, echoes the question and carries
    /// an OPT record when the request had one.
    #[tracing::instrument(skip_all, fields(op = %request.op_code(), id = %request.id()), level = "debug")]
    pub async fn respond_to(&self, request: &Request) -> Message {
        let outcome = match request.edns() {
            Some(edns) if edns.version() > EDNS_VERSION => {
                tracing::warn!("unsupported edns version {}", edns.version());
                Outcome::Rejected(ResponseCode::BADVERS)
            }
            _ => match self.outcome(request).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::error!("failed to resolve request: {error}");
                    Outcome::Rejected(ResponseCode::ServFail)
                }
            },
        };

        tracing::trace!(code = %outcome.code(), "responding");
        message(request, outcome)
    }

    /// Settle the request against the resolver.
    ///
    /// Only storage failures are errors; everything else maps to a response code.
    async fn outcome(&self, request: &Request) -> Result<Outcome, ResolveError> {
        if request.message_type() == MessageType::Response {
            tracing::warn!("got a response as a request from id: {}", request.id());
            return Ok(Outcome::Rejected(ResponseCode::FormErr));
        }

        if request.op_code() != OpCode::Query {
            tracing::warn!("unimplemented op code: {}", request.op_code());
            return Ok(Outcome::Rejected(ResponseCode::NotImp));
        }

        let Ok(request_info) = request.request_info() else {
            tracing::debug!("request does not hold exactly one question");
            return Ok(Outcome::Rejected(ResponseCode::FormErr));
        };

        let query = request_info.query;
        if !matches!(query.query_class(), DNSClass::IN | DNSClass::ANY) {
            tracing::debug!("refusing query for class {}", query.query_class());
            return Ok(Outcome::Rejected(ResponseCode::Refused));
        }

        let question = query.original();
        let answer = match self.resolver.lookup(question).await {
            Ok(answer) => answer,
            Err(ResolveError::InvalidName { name, reason }) => {
                tracing::debug!("rejecting query for {name:?}: {reason}");
                return Ok(Outcome::Rejected(ResponseCode::FormErr));
            }
            Err(error) => return Err(error),
        };

        let code = if !answer.answers().is_empty() {
            ResponseCode::NoError
        } else if answer.authority().is_empty() {
            tracing::debug!("no zone found for {}", question.name());
            return Ok(Outcome::Rejected(ResponseCode::Refused));
        } else if self.resolver.name_exists(question.name()).await? {
            ResponseCode::NoError
        } else {
            ResponseCode::NXDomain
        };

        Ok(Outcome::Resolved { code, answer })
    }
}

/// The OPT record sent back for a request's OPT record.
fn response_edns(request: &Edns, code: ResponseCode) -> Edns {
    let mut edns = Edns::new();
    edns.set_max_payload(request.max_payload().max(MIN_PAYLOAD));
    edns.set_version(EDNS_VERSION);
    edns.set_rcode_high(code.high());
    edns
}

fn message(request: &Request, outcome: Outcome) -> Message {
    let code = outcome.code();
    let mut header = Header::response_from_request(request.header());
    header.set_response_code(code);

    let mut message = Message::new();
    message.add_queries(request.queries().iter().map(|q| q.original().clone()));

    if let Outcome::Resolved { answer, .. } = outcome {
        header.set_authoritative(true);
        let (answers, authority) = answer.into_parts();
        message.add_answers(answers);
        message.add_name_servers(authority);
    }

    if let Some(edns) = request.edns() {
        message.set_edns(response_edns(edns, code));
    }

    message.set_header(header);
    message
}

impl tower::Service<Request> for Handler {
    type Response = Message;

    type Error = Infallible;

    type Future = Pin<Box<dyn Future<Output = Result<Message, Infallible>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.respond_to(&request).await) })
    }
}

#[async_trait::async_trait]
impl RequestHandler for Handler {
    async fn handle_request<R>(&self, request: &Request, mut response_handle: R) -> ResponseInfo
    where
        R: ResponseHandler,
    {
        let message = self.respond_to(request).await;

        let mut builder = MessageResponseBuilder::from_message_request(request);
        if let Some(edns) = message.extensions().clone() {
            builder.edns(edns);
        }

        // Authority only ever holds the zone SOA.
        let response = builder.build(
            *message.header(),
            message.answers().iter(),
            std::iter::empty(),
            message.name_servers().iter(),
            message.additionals().iter(),
        );

        match response_handle.send_response(response).await {
            Ok(info) => info,
            Err(error) => {
                tracing::error!("failed to send response: {error}");
                let mut header = Header::response_from_request(request.header());
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
