//! I/O operations: the transport seam, per-task delegates, the delegate
//! registry, requests and the shared session.

mod delegate;
mod registry;
mod request;
mod session;
mod transport;

pub use delegate::{ReceiveObserver, TaskDelegate, TaskKind};
pub use registry::DelegateRegistry;
pub use request::{ApiRequest, ApiResponse};
pub use session::CopyleaksSession;
pub use transport::{ChunkStream, Exchange, ReqwestTransport, SendObserver, Transport};
