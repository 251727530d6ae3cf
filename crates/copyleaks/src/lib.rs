//! Asynchronous client engine for the Copyleaks plagiarism scanning API.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and types
//! - [`core`] - Pure transformations (response decoding, body encoding)
//! - [`effects`] - I/O operations with trait abstraction
//!
//! One shared [`CopyleaksSession`] multiplexes any number of concurrent
//! requests over a single transport. Each request owns a per-task delegate
//! that buffers streamed bytes, tracks progress and gates the completion
//! handler; a thread-safe registry maps live task ids to their delegates.
//! Terminal state is decoded by a pure serializer that honors the
//! service's out-of-band `copyleaks-error-code` header before anything
//! else.
//!
//! Requests drive themselves on the tokio runtime; construct sessions and
//! issue requests from within one.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use copyleaks::{ApiConfig, CopyleaksCloud, CopyleaksSession, MemoryTokenStore, ProductType};
//!
//! # async fn run() -> Result<(), copyleaks::ApiError> {
//! let session = CopyleaksSession::new(ApiConfig::default(), Arc::new(MemoryTokenStore::new()))?;
//! let cloud = CopyleaksCloud::new(session, ProductType::Businesses);
//!
//! cloud.login("user@example.com", "api-key").await?;
//! let created = cloud.create_by_url("https://example.com/article").await?;
//! # let _ = created;
//! # Ok(())
//! # }
//! ```

pub mod cloud;
pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use cloud::{CopyleaksCloud, ProductType};
pub use self::core::{ERROR_CODE_HEADER, JsonSerializer, ResponseSerializer};
pub use data::{
    AccessToken, ApiConfig, HttpMethod, MemoryTokenStore, Payload, Progress, RequestParts,
    ResponseHead, ScanOptions, TokenStore,
};
pub use effects::{
    ApiRequest, ApiResponse, ChunkStream, CopyleaksSession, DelegateRegistry, Exchange,
    ReqwestTransport, SendObserver, TaskDelegate, TaskKind, Transport,
};
pub use error::{ApiError, TransportError};
