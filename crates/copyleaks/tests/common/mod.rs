//! Scripted transport used by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use tokio::sync::mpsc;

use copyleaks::{
    ChunkStream, Exchange, RequestParts, ResponseHead, SendObserver, Transport, TransportError,
};

pub type ChunkResult = Result<Bytes, TransportError>;

/// How a scripted response body behaves once the head has been delivered.
pub enum ScriptBody {
    /// Yield these chunks, then end the stream.
    Chunks(Vec<ChunkResult>),
    /// Yield these chunks, then keep the stream open forever.
    ChunksThenHang(Vec<ChunkResult>),
    /// Yield whatever the test feeds through the channel.
    Channel(mpsc::UnboundedReceiver<ChunkResult>),
}

impl ScriptBody {
    fn into_stream(self) -> ChunkStream {
        match self {
            ScriptBody::Chunks(chunks) => Box::pin(stream::iter(chunks)),
            ScriptBody::ChunksThenHang(chunks) => {
                Box::pin(stream::iter(chunks).chain(stream::pending()))
            }
            ScriptBody::Channel(rx) => Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|chunk| (chunk, rx))
            })),
        }
    }
}

/// One scripted exchange: either a response or a transport-level failure.
pub enum Script {
    Respond { head: ResponseHead, body: ScriptBody },
    Fail(TransportError),
}

impl Script {
    pub fn ok(status: u16, headers: &[(&str, &str)], body: ScriptBody) -> Self {
        Script::Respond {
            head: head(status, headers),
            body,
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self::ok(
            status,
            &[("content-length", &body.len().to_string())],
            ScriptBody::Chunks(vec![Ok(Bytes::copy_from_slice(body.as_bytes()))]),
        )
    }
}

pub fn head(status: u16, headers: &[(&str, &str)]) -> ResponseHead {
    ResponseHead::new(
        status,
        headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

/// Transport double that pops scripted exchanges in order and records every
/// request it was handed.
#[derive(Clone, Default)]
pub struct MockTransport {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    requests: Arc<Mutex<Vec<RequestParts>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn recorded_requests(&self) -> Vec<RequestParts> {
        self.requests.lock().unwrap().clone()
    }

    fn play(&self, parts: &RequestParts) -> Result<Exchange, TransportError> {
        self.requests.lock().unwrap().push(parts.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("a scripted response for every request");
        match script {
            Script::Respond { head, body } => Ok(Exchange {
                head,
                body: body.into_stream(),
            }),
            Script::Fail(error) => Err(error),
        }
    }
}

impl Transport for MockTransport {
    async fn data(&self, parts: &RequestParts) -> Result<Exchange, TransportError> {
        self.play(parts)
    }

    async fn upload(
        &self,
        parts: &RequestParts,
        on_send: Option<SendObserver>,
    ) -> Result<Exchange, TransportError> {
        // Report send progress the way a real transport would: a partial
        // update, then the final total.
        if let (Some(observer), Some(body)) = (on_send.as_ref(), parts.body.as_ref()) {
            let total = body.len() as u64;
            if total > 1 {
                observer(total / 2, total);
            }
            observer(total, total);
        }
        self.play(parts)
    }
}
