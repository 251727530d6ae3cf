use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};

use crate::data::{RequestParts, ResponseHead};
use crate::error::TransportError;

/// Boxed stream of response body chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send + 'static>>;

/// Upload-progress observer: `(total bytes sent so far, total bytes expected)`.
///
/// Invoked by the transport as the request body is actually handed to the
/// wire, not when the body is built.
pub type SendObserver = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// An accepted exchange: the response head plus the still-streaming body.
pub struct Exchange {
    pub head: ResponseHead,
    pub body: ChunkStream,
}

/// Asynchronous transport abstraction.
///
/// This is the minimal seam the engine needs: issue a fully-specified
/// request, get back the response head and a chunk stream. Implementations
/// own their redirect, timeout and TLS configuration.
///
/// HTTP status codes are not transport errors; any response the server
/// produced is an `Ok` exchange.
pub trait Transport: Send + Sync + 'static {
    /// Issue a request whose body (if any) is sent in one piece.
    fn data(
        &self,
        parts: &RequestParts,
    ) -> impl Future<Output = Result<Exchange, TransportError>> + Send;

    /// Issue an upload request, reporting send progress as body bytes are
    /// pulled onto the wire.
    fn upload(
        &self,
        parts: &RequestParts,
        on_send: Option<SendObserver>,
    ) -> impl Future<Output = Result<Exchange, TransportError>> + Send;
}

/// Granularity of upload body chunks, and therefore of send-progress
/// callbacks.
const UPLOAD_CHUNK_BYTES: usize = 16 * 1024;

/// Production transport backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with default client configuration.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    /// Wrap an already-configured client (custom timeouts, proxies).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn builder(&self, parts: &RequestParts) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(parts.method.into(), &parts.url);
        for (name, value) in &parts.headers {
            builder = builder.header(name, value);
        }
        builder
    }
}

fn response_head(response: &reqwest::Response) -> ResponseHead {
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    ResponseHead::new(response.status().as_u16(), headers)
}

fn into_exchange(response: reqwest::Response) -> Exchange {
    let head = response_head(&response);
    let body = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(TransportError::from));
    Exchange {
        head,
        body: Box::pin(body),
    }
}

/// Chunk an upload body so progress is observable while reqwest pulls it.
fn counted_body(
    body: Bytes,
    on_send: Option<SendObserver>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let total = body.len() as u64;
    let mut offset = 0;
    let chunks = std::iter::from_fn(move || {
        if offset >= body.len() {
            return None;
        }
        let end = (offset + UPLOAD_CHUNK_BYTES).min(body.len());
        let chunk = body.slice(offset..end);
        offset = end;
        Some(chunk)
    });

    let mut sent = 0u64;
    stream::iter(chunks.map(move |chunk| {
        sent += chunk.len() as u64;
        if let Some(observer) = &on_send {
            observer(sent, total);
        }
        Ok(chunk)
    }))
}

impl Transport for ReqwestTransport {
    async fn data(&self, parts: &RequestParts) -> Result<Exchange, TransportError> {
        let mut builder = self.builder(parts);
        if let Some(body) = &parts.body {
            builder = builder.body(body.clone());
        }
        let response = builder.send().await?;
        Ok(into_exchange(response))
    }

    async fn upload(
        &self,
        parts: &RequestParts,
        on_send: Option<SendObserver>,
    ) -> Result<Exchange, TransportError> {
        let mut builder = self.builder(parts);
        if let Some(body) = &parts.body {
            builder = builder.body(reqwest::Body::wrap_stream(counted_body(
                body.clone(),
                on_send,
            )));
        }
        let response = builder.send().await?;
        Ok(into_exchange(response))
    }
}
