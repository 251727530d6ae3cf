use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use bytes::{Bytes, BytesMut};
use tokio::sync::watch;
use tracing::debug;

use crate::data::{Progress, ResponseHead};
use crate::effects::transport::SendObserver;
use crate::error::TransportError;

/// Download-progress observer:
/// `(chunk length, total bytes received, total bytes expected)`.
pub type ReceiveObserver = Arc<dyn Fn(u64, u64, Option<u64>) + Send + Sync>;

/// What kind of transfer a delegate is tracking.
///
/// One tagged type instead of a class hierarchy; `Upload` is the only kind
/// with a send-progress side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// A task with no buffered body.
    Plain,
    /// A download-style exchange whose response body is buffered.
    Data,
    /// An upload-style exchange; also buffers the response body.
    Upload,
}

/// Mutable per-task state, guarded by one lock.
struct TaskState {
    buffer: BytesMut,
    progress: Progress,
    head: Option<ResponseHead>,
    error: Option<TransportError>,
    completed: bool,
}

/// Per-task state machine driven entirely by transport callbacks.
///
/// A delegate is `Running` from construction until the single
/// `did_complete` transition; after that no callback mutates it. The
/// completion gate is a watch flag the transport driver flips and the
/// response path awaits, so a completion handler never observes a partial
/// buffer.
pub struct TaskDelegate {
    task_id: u64,
    kind: TaskKind,
    state: Mutex<TaskState>,
    completed_tx: watch::Sender<bool>,
    on_receive: OnceLock<ReceiveObserver>,
    on_send: OnceLock<SendObserver>,
}

impl TaskDelegate {
    pub fn new(task_id: u64, kind: TaskKind) -> Self {
        let (completed_tx, _) = watch::channel(false);
        Self {
            task_id,
            kind,
            state: Mutex::new(TaskState {
                buffer: BytesMut::new(),
                progress: Progress::default(),
                head: None,
                error: None,
                completed: false,
            }),
            completed_tx,
            on_receive: OnceLock::new(),
            on_send: OnceLock::new(),
        }
    }

    pub fn task_id(&self) -> u64 {
        self.task_id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Attach a byte-level download observer. Only the first observer per
    /// delegate is kept.
    pub(crate) fn set_receive_observer(&self, observer: ReceiveObserver) {
        let _ = self.on_receive.set(observer);
    }

    /// Attach an upload-progress observer. Only the first observer per
    /// delegate is kept.
    pub(crate) fn set_send_observer(&self, observer: SendObserver) {
        let _ = self.on_send.set(observer);
    }

    /// Snapshot of the progress counters.
    pub fn progress(&self) -> Progress {
        self.lock().progress
    }

    pub fn is_completed(&self) -> bool {
        self.lock().completed
    }

    /// The response head arrived; the declared content length becomes the
    /// progress total for download-style tasks.
    pub(crate) fn did_receive_response(&self, head: ResponseHead) {
        let mut state = self.lock();
        if state.completed {
            return;
        }
        if self.kind != TaskKind::Upload {
            state.progress.set_total(head.content_length());
        }
        state.head = Some(head);
    }

    /// A body chunk arrived: append it and advance the counters.
    pub(crate) fn did_receive(&self, chunk: &[u8]) {
        let (received, expected) = {
            let mut state = self.lock();
            if state.completed {
                return;
            }
            state.buffer.extend_from_slice(chunk);
            let received = state.buffer.len() as u64;
            let expected = state.head.as_ref().and_then(ResponseHead::content_length);
            // Upload tasks keep their counters on the send side; response
            // bytes are still buffered for the serializer.
            if self.kind != TaskKind::Upload {
                state.progress.advance_to(received);
            }
            (received, expected)
        };

        if let Some(observer) = self.on_receive.get() {
            observer(chunk.len() as u64, received, expected);
        }
    }

    /// Body bytes went onto the wire (upload tasks only).
    pub(crate) fn did_send_body_data(&self, total_sent: u64, total_expected: u64) {
        {
            let mut state = self.lock();
            if state.completed {
                return;
            }
            state.progress.set_total(Some(total_expected));
            state.progress.advance_to(total_sent);
        }

        if let Some(observer) = self.on_send.get() {
            observer(total_sent, total_expected);
        }
    }

    /// The single transition out of `Running`. Records the terminal error
    /// and releases every waiter on the completion gate. Later calls are
    /// no-ops, so no callback can be delivered after completion.
    pub(crate) fn did_complete(&self, error: Option<TransportError>) {
        {
            let mut state = self.lock();
            if state.completed {
                return;
            }
            state.completed = true;
            state.error = error;
        }
        debug!(task_id = self.task_id, "task completed");
        // send_replace stores the flag even while nobody is subscribed yet.
        self.completed_tx.send_replace(true);
    }

    /// Wait for the `Completed` transition. Returns immediately if it has
    /// already happened.
    pub async fn completed(&self) {
        let mut rx = self.completed_tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Hand the terminal `(head, data, error)` triple to the serializer.
    /// Must only be called after completion; the error is consumed.
    pub(crate) fn take_outcome(&self) -> (Option<ResponseHead>, Option<Bytes>, Option<TransportError>) {
        let mut state = self.lock();
        debug_assert!(state.completed, "outcome taken before completion");
        let head = state.head.clone();
        let data = if state.buffer.is_empty() {
            None
        } else {
            Some(Bytes::copy_from_slice(&state.buffer))
        };
        (head, data, state.error.take())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head_with_length(length: u64) -> ResponseHead {
        ResponseHead::new(
            200,
            vec![("content-length".to_string(), length.to_string())],
        )
    }

    #[test]
    fn chunks_accumulate_and_progress_tracks_them() {
        let delegate = TaskDelegate::new(1, TaskKind::Data);
        delegate.did_receive_response(head_with_length(1000));

        let mut observed = Vec::new();
        for chunk in [vec![1u8; 100], vec![2u8; 250], vec![3u8; 650]] {
            delegate.did_receive(&chunk);
            observed.push(delegate.progress().completed_units());
        }

        assert_eq!(observed, vec![100, 350, 1000]);
        assert_eq!(delegate.progress().total_units(), Some(1000));
    }

    #[test]
    fn callbacks_after_completion_are_dropped() {
        let delegate = TaskDelegate::new(2, TaskKind::Data);
        delegate.did_receive(b"before");
        delegate.did_complete(None);

        delegate.did_receive(b"after");
        delegate.did_complete(Some(TransportError::Timeout));

        let (_, data, error) = delegate.take_outcome();
        assert_eq!(data.as_deref(), Some(&b"before"[..]));
        assert!(error.is_none());
    }

    #[test]
    fn upload_counters_stay_on_the_send_side() {
        let delegate = TaskDelegate::new(3, TaskKind::Upload);
        delegate.did_send_body_data(512, 1024);
        delegate.did_send_body_data(1024, 1024);

        // A small JSON reply must not drag the counters back down.
        delegate.did_receive_response(head_with_length(20));
        delegate.did_receive(br#"{"Success":true}"#);

        let progress = delegate.progress();
        assert_eq!(progress.completed_units(), 1024);
        assert_eq!(progress.total_units(), Some(1024));
    }

    #[tokio::test]
    async fn completion_gate_opens_exactly_once() {
        let delegate = Arc::new(TaskDelegate::new(4, TaskKind::Data));

        let waiter = {
            let delegate = Arc::clone(&delegate);
            tokio::spawn(async move {
                delegate.completed().await;
                delegate.is_completed()
            })
        };

        delegate.did_receive(b"payload");
        delegate.did_complete(None);

        assert!(waiter.await.expect("waiter finished"));
        // Waiting again after completion returns immediately.
        delegate.completed().await;
    }

    #[test]
    fn receive_observer_sees_running_totals() {
        let delegate = TaskDelegate::new(5, TaskKind::Data);
        delegate.did_receive_response(head_with_length(6));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        delegate.set_receive_observer(Arc::new(move |chunk, received, expected| {
            sink.lock().unwrap().push((chunk, received, expected));
        }));

        delegate.did_receive(b"abc");
        delegate.did_receive(b"def");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(3, 3, Some(6)), (3, 6, Some(6))]
        );
    }
}
