use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::debug;

use crate::core::{JsonSerializer, ResponseSerializer};
use crate::data::{Payload, Progress, RequestParts, ResponseHead};
use crate::effects::delegate::{TaskDelegate, TaskKind};
use crate::effects::registry::DelegateRegistry;
use crate::effects::transport::{SendObserver, Transport};
use crate::error::{ApiError, TransportError};

/// Control signals a caller can send to a running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskControl {
    Running,
    Suspended,
    Cancelled,
}

pub(crate) type DriverFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// All response state returned from a completed request.
pub struct ApiResponse<V = Payload> {
    /// The request that was sent to the server.
    pub request: Arc<RequestParts>,
    /// The server's response head, if one arrived.
    pub response: Option<ResponseHead>,
    /// The buffered response body, if any bytes arrived.
    pub data: Option<Bytes>,
    /// The serialized outcome.
    pub result: Result<V, ApiError>,
}

/// One logical HTTP exchange: a transport task plus its delegate.
///
/// The request is resumed by the session that built it. `suspend` and
/// `cancel` are non-blocking signals; cancellation is cooperative and
/// tears down through the normal completion path with a
/// [`TransportError::Cancelled`] terminal error.
pub struct ApiRequest {
    parts: Arc<RequestParts>,
    delegate: Arc<TaskDelegate>,
    control: watch::Sender<TaskControl>,
    driver: Mutex<Option<DriverFuture>>,
    handler_attached: AtomicBool,
}

impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest").finish_non_exhaustive()
    }
}

impl ApiRequest {
    pub(crate) fn new(
        parts: Arc<RequestParts>,
        delegate: Arc<TaskDelegate>,
        control: watch::Sender<TaskControl>,
        driver: DriverFuture,
    ) -> Self {
        Self {
            parts,
            delegate,
            control,
            driver: Mutex::new(Some(driver)),
            handler_attached: AtomicBool::new(false),
        }
    }

    /// The request sent or to be sent to the server.
    pub fn parts(&self) -> &RequestParts {
        &self.parts
    }

    /// Identifier of the underlying task.
    pub fn task_id(&self) -> u64 {
        self.delegate.task_id()
    }

    /// Progress of the request lifecycle.
    pub fn progress(&self) -> Progress {
        self.delegate.progress()
    }

    /// Start (or restart after `suspend`) the underlying task.
    pub fn resume(&self) {
        self.control.send_modify(|state| {
            // Cancellation is terminal.
            if *state != TaskControl::Cancelled {
                *state = TaskControl::Running;
            }
        });
        self.spawn_driver();
    }

    /// Pause body consumption between chunks. The transport connection
    /// stays open.
    pub fn suspend(&self) {
        self.control.send_modify(|state| {
            if *state == TaskControl::Running {
                *state = TaskControl::Suspended;
            }
        });
    }

    /// Request cooperative termination. The terminal cancellation error is
    /// observed through the completion handler like any other failure.
    pub fn cancel(&self) {
        debug!(task_id = self.task_id(), "cancellation requested");
        self.control.send_replace(TaskControl::Cancelled);
        // A never-resumed task still completes through the normal path.
        self.spawn_driver();
    }

    fn spawn_driver(&self) {
        let driver = self
            .driver
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(driver) = driver {
            tokio::spawn(driver);
        }
    }

    /// Observe download progress:
    /// `(chunk length, total received, total expected)`.
    pub fn on_download_progress(
        &self,
        observer: impl Fn(u64, u64, Option<u64>) + Send + Sync + 'static,
    ) {
        self.delegate.set_receive_observer(Arc::new(observer));
    }

    /// Observe upload progress: `(total sent, total expected)`.
    pub fn on_upload_progress(&self, observer: impl Fn(u64, u64) + Send + Sync + 'static) {
        self.delegate.set_send_observer(Arc::new(observer));
    }

    /// Await completion, then serialize the terminal state.
    ///
    /// The handler side of a request runs exactly once; the future resolves
    /// strictly after the last body chunk has been applied to the buffer.
    ///
    /// # Panics
    ///
    /// Panics if a completion handler was already attached to this request.
    pub async fn response_with<S: ResponseSerializer>(&self, serializer: S) -> ApiResponse<S::Output> {
        self.claim_completion_handler();
        self.delegate.completed().await;

        let (head, data, error) = self.delegate.take_outcome();
        let result = serializer.serialize(&self.parts, head.as_ref(), data.as_deref(), error);
        ApiResponse {
            request: Arc::clone(&self.parts),
            response: head,
            data,
            result,
        }
    }

    /// Await completion and decode the body as JSON.
    pub async fn response_json(&self) -> ApiResponse {
        self.response_with(JsonSerializer).await
    }

    /// Callback flavor of [`response_json`](Self::response_json): the
    /// response is delivered to `handler` on the runtime.
    pub fn response_json_with<F>(&self, handler: F)
    where
        F: FnOnce(ApiResponse) + Send + 'static,
    {
        self.claim_completion_handler();
        let parts = Arc::clone(&self.parts);
        let delegate = Arc::clone(&self.delegate);
        tokio::spawn(async move {
            delegate.completed().await;
            let (head, data, error) = delegate.take_outcome();
            let result = JsonSerializer.serialize(&parts, head.as_ref(), data.as_deref(), error);
            handler(ApiResponse {
                request: parts,
                response: head,
                data,
                result,
            });
        });
    }

    fn claim_completion_handler(&self) {
        if self.handler_attached.swap(true, Ordering::SeqCst) {
            panic!("a completion handler was already attached to this request");
        }
    }
}

/// Drive one task to completion: issue the transport call, forward body
/// chunks to the delegate, honor control signals, and perform the single
/// completion transition plus registry removal.
pub(crate) async fn drive<T: Transport>(
    transport: Arc<T>,
    registry: Arc<DelegateRegistry>,
    parts: Arc<RequestParts>,
    delegate: Arc<TaskDelegate>,
    mut control: watch::Receiver<TaskControl>,
    send_observer: Option<SendObserver>,
) {
    if !await_running(&mut control).await {
        return finish(&registry, &delegate, Some(TransportError::Cancelled));
    }

    let call = async {
        match delegate.kind() {
            TaskKind::Upload => transport.upload(&parts, send_observer).await,
            TaskKind::Plain | TaskKind::Data => transport.data(&parts).await,
        }
    };
    let exchange = tokio::select! {
        biased;
        _ = cancelled(&mut control) => {
            return finish(&registry, &delegate, Some(TransportError::Cancelled));
        }
        result = call => match result {
            Ok(exchange) => exchange,
            Err(error) => return finish(&registry, &delegate, Some(error)),
        },
    };

    delegate.did_receive_response(exchange.head);
    let mut body = exchange.body;

    loop {
        if !await_running(&mut control).await {
            return finish(&registry, &delegate, Some(TransportError::Cancelled));
        }
        tokio::select! {
            biased;
            state = signal(&mut control) => {
                if state == TaskControl::Cancelled {
                    return finish(&registry, &delegate, Some(TransportError::Cancelled));
                }
                // Suspended: the next iteration parks in await_running.
            }
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => delegate.did_receive(&bytes),
                Some(Err(error)) => return finish(&registry, &delegate, Some(error)),
                None => break,
            },
        }
    }

    finish(&registry, &delegate, None)
}

/// Drop the registry entry and record the terminal transition. This is the
/// only place either happens, so both occur exactly once per task. The
/// entry goes first: once the completion gate opens, no delegate may still
/// be observable in the registry.
fn finish(registry: &DelegateRegistry, delegate: &TaskDelegate, error: Option<TransportError>) {
    registry.set(delegate.task_id(), None);
    delegate.did_complete(error);
}

/// Park until the task may run. Returns `false` on cancellation, or when
/// every control handle is gone while suspended (an unresumable task).
async fn await_running(control: &mut watch::Receiver<TaskControl>) -> bool {
    loop {
        let state = *control.borrow_and_update();
        match state {
            TaskControl::Running => return true,
            TaskControl::Cancelled => return false,
            TaskControl::Suspended => {
                if control.changed().await.is_err() {
                    return false;
                }
            }
        }
    }
}

/// Resolve only if the task is cancelled.
async fn cancelled(control: &mut watch::Receiver<TaskControl>) {
    while *control.borrow_and_update() != TaskControl::Cancelled {
        if control.changed().await.is_err() {
            // The request handle is gone; a running task keeps running.
            std::future::pending::<()>().await;
        }
    }
}

/// Resolve on the next control transition.
async fn signal(control: &mut watch::Receiver<TaskControl>) -> TaskControl {
    loop {
        match control.changed().await {
            Ok(()) => return *control.borrow_and_update(),
            Err(_) => std::future::pending::<()>().await,
        }
    }
}
