use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::core::{encode_file_part, generate_boundary, multipart_content_type};
use crate::data::{ApiConfig, HttpMethod, RequestParts, ScanOptions, TokenStore};
use crate::effects::delegate::{TaskDelegate, TaskKind};
use crate::effects::registry::DelegateRegistry;
use crate::effects::request::{ApiRequest, DriverFuture, TaskControl, drive};
use crate::effects::transport::{ReqwestTransport, SendObserver, Transport};
use crate::error::ApiError;

/// Shared session: one transport, one delegate registry, process-wide
/// request defaults and the external token store.
///
/// Created once at program start and shared by every request; there is no
/// hidden global. All construction paths register the delegate before the
/// task is resumed, so no callback can arrive for an unknown task.
pub struct CopyleaksSession<T: Transport = ReqwestTransport> {
    transport: Arc<T>,
    registry: Arc<DelegateRegistry>,
    config: ApiConfig,
    token_store: Arc<dyn TokenStore>,
    next_task_id: AtomicU64,
}

impl CopyleaksSession<ReqwestTransport> {
    /// Session over the production reqwest transport.
    pub fn new(config: ApiConfig, token_store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new().map_err(|e| ApiError::Build(e.to_string()))?;
        Ok(Self::with_transport(transport, config, token_store))
    }
}

impl<T: Transport> CopyleaksSession<T> {
    /// Session over a caller-supplied transport (tests, custom clients).
    pub fn with_transport(
        transport: T,
        config: ApiConfig,
        token_store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            registry: Arc::new(DelegateRegistry::new()),
            config,
            token_store,
            next_task_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<DelegateRegistry> {
        &self.registry
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.token_store
    }

    /// Issue a request with a JSON body serialized from `params`.
    ///
    /// Serialization failure is a synchronous [`ApiError::Build`], not a
    /// network failure.
    pub fn request<P: Serialize>(
        &self,
        method: HttpMethod,
        route: &str,
        params: Option<&P>,
        options: &ScanOptions,
    ) -> Result<ApiRequest, ApiError> {
        let body = params
            .map(|params| {
                serde_json::to_vec(params)
                    .map(Bytes::from)
                    .map_err(|e| ApiError::Build(e.to_string()))
            })
            .transpose()?;
        self.request_raw(method, route, body, options)
    }

    /// Issue a request with a caller-provided (or absent) body.
    pub fn request_raw(
        &self,
        method: HttpMethod,
        route: &str,
        body: Option<Bytes>,
        options: &ScanOptions,
    ) -> Result<ApiRequest, ApiError> {
        let mut headers = self.default_headers();
        headers.extend(options.headers());

        let parts = RequestParts {
            method,
            url: self.config.endpoint(route),
            headers,
            body,
        };
        Ok(self.start_task(parts, TaskKind::Data))
    }

    /// Issue a single-file multipart upload.
    ///
    /// The body is built eagerly (boundary, base64 payload, MIME type from
    /// the file extension); the transport streams it and reports send
    /// progress through the request's delegate.
    pub fn upload(
        &self,
        route: &str,
        file_name: &str,
        contents: &[u8],
        language: &str,
        options: &ScanOptions,
    ) -> Result<ApiRequest, ApiError> {
        let boundary = generate_boundary();
        let body = encode_file_part(file_name, contents, &boundary);

        let mut headers = self.default_headers();
        headers.retain(|(name, _)| !name.eq_ignore_ascii_case("Content-Type"));
        headers.push(("Content-Type".to_string(), multipart_content_type(&boundary)));
        headers.push(("Accept".to_string(), "application/json".to_string()));
        headers.push(("Content-Length".to_string(), body.len().to_string()));
        headers.extend(options.headers());

        let parts = RequestParts {
            method: HttpMethod::Post,
            url: format!("{}?language={}", self.config.endpoint(route), language),
            headers,
            body: Some(body),
        };
        Ok(self.start_task(parts, TaskKind::Upload))
    }

    /// Headers every request carries, plus `Authorization` when the store
    /// holds a token that is still valid.
    fn default_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Cache-Control".to_string(), "no-cache".to_string()),
            ("User-Agent".to_string(), self.config.user_agent.clone()),
            (
                "Accept-Language".to_string(),
                self.config.accept_language.clone(),
            ),
        ];
        if let Some(authorization) = self
            .token_store
            .get()
            .and_then(|token| token.authorization())
        {
            headers.push(("Authorization".to_string(), authorization));
        }
        if self.config.sandbox_mode {
            headers.push(("copyleaks-sandbox-mode".to_string(), "true".to_string()));
        }
        headers
    }

    /// Create the delegate, register it, wire up the driver and resume.
    fn start_task(&self, parts: RequestParts, kind: TaskKind) -> ApiRequest {
        let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let parts = Arc::new(parts);
        let delegate = Arc::new(TaskDelegate::new(task_id, kind));
        self.registry.set(task_id, Some(Arc::clone(&delegate)));

        let send_observer: Option<SendObserver> = (kind == TaskKind::Upload).then(|| {
            let delegate = Arc::clone(&delegate);
            Arc::new(move |sent: u64, total: u64| delegate.did_send_body_data(sent, total))
                as SendObserver
        });

        let (control_tx, control_rx) = watch::channel(TaskControl::Suspended);
        let driver: DriverFuture = Box::pin(drive(
            Arc::clone(&self.transport),
            Arc::clone(&self.registry),
            Arc::clone(&parts),
            Arc::clone(&delegate),
            control_rx,
            send_observer,
        ));

        debug!(task_id, method = parts.method.as_str(), url = %parts.url, "task starting");
        let request = ApiRequest::new(parts, delegate, control_tx, driver);
        request.resume();
        request
    }
}
