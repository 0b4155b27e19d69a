#![allow(unused)]

use std::future::poll_fn;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::task::Poll;

use futures::FutureExt as _;
use hazel_dns::storage::{Node, Storage, StorageError};
use hazel_dns::{MemoryStore, Resolver, ResolverConfig};
use hickory_proto::serialize::binary::{BinDecodable as _, BinEncodable as _};
use hickory_proto::{
    op::{Message, Query},
    rr::{Name, Record, RecordType},
    serialize::binary::{BinDecoder, BinEncoder},
    xfer::Protocol,
};
use hickory_server::{
    authority::{MessageRequest, MessageResponse},
    server::{Request, ResponseHandler, ResponseInfo},
};

/// Registers a global default tracing subscriber when called for the first time. This is intended
/// for use in tests.
pub fn subscribe() {
    static INSTALL_TRACING_SUBSCRIBER: Once = Once::new();
    INSTALL_TRACING_SUBSCRIBER.call_once(|| {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).unwrap();
    });
}

/// The zone used across the resolver tests, stored beneath `prefix`.
pub fn disco_zone(prefix: &str) -> MemoryStore {
    let store = MemoryStore::new();
    let put = |key: &str, value: &str| {
        store.set(format!("{prefix}/{key}"), value);
    };

    put(
        "net/disco/.SOA",
        "ns1.disco.net.\\tadmin.disco.net.\\t3600\\t600\\t86400\\t10",
    );
    put("net/disco/bar/.A", "1.2.3.4");
    put("net/disco/bar/.AAAA", "::1");
    put("net/disco/bar/.TXT", "hello world");
    put("net/disco/multi/.A/0", "1.1.1.1");
    put("net/disco/multi/.A/1", "1.1.1.2");
    put("net/disco/multi/.TXT", "multi");
    put("net/disco/alias/.CNAME", "bar.disco.net.");
    put("net/disco/wild/*/.AAAA", "::1");
    store
}

pub fn resolver(store: MemoryStore, prefix: &str) -> Resolver {
    Resolver::new(store, ResolverConfig::new().with_prefix(prefix))
}

pub fn name(text: &str) -> Name {
    Name::from_ascii(text).unwrap()
}

/// Encode a query message and decode it again as a server-side request.
pub fn request(message: &Message) -> Request {
    let bytes = message.to_bytes().unwrap();
    let message = MessageRequest::from_bytes(&bytes).unwrap();
    Request::new(message, ([127, 0, 0, 1], 5553).into(), Protocol::Udp)
}

pub fn query_request(name: &str, record_type: RecordType) -> Request {
    let mut message = Message::new();
    message.add_query(Query::query(self::name(name), record_type));
    request(&message)
}

/// A store whose backend is always unreachable.
#[derive(Debug, Default)]
pub struct FailingStore {
    calls: AtomicUsize,
}

impl FailingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl Storage for FailingStore {
    async fn get(&self, _prefix: &str) -> Result<Vec<Node>, StorageError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(StorageError::backend(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "store unreachable",
        )))
    }
}

#[derive(Clone, Default)]
pub struct TestResponseHandler {
    message_ready: Arc<AtomicBool>,
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        let buf = Arc::new(Mutex::new(Vec::with_capacity(512)));
        let message_ready = Arc::new(AtomicBool::new(false));
        TestResponseHandler { message_ready, buf }
    }

    fn into_inner(self) -> impl Future<Output = Vec<u8>> {
        poll_fn(move |_| {
            if self
                .message_ready
                .compare_exchange(true, false, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                let bytes: Vec<u8> = std::mem::take(&mut self.buf.lock().unwrap());
                Poll::Ready(bytes)
            } else {
                Poll::Pending
            }
        })
    }

    pub fn into_message(self) -> impl Future<Output = Message> {
        let bytes = self.into_inner();
        bytes.map(|b| {
            let mut decoder = BinDecoder::new(&b);
            Message::read(&mut decoder).expect("could not decode message")
        })
    }
}

#[async_trait::async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let buf = &mut self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(buf);
        let info = response
            .destructive_emit(&mut encoder)
            .expect("could not encode");
        self.message_ready.store(true, Ordering::Release);
        Ok(info)
    }
}
