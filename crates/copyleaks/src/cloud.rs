//! High-level Copyleaks API catalog over the request engine.
//!
//! Every method builds one request through the session, awaits its typed
//! result and hands back the decoded [`Payload`]; presentation stays with
//! the caller.

use bytes::Bytes;
use serde_json::{Value, json};
use tracing::debug;

use crate::data::{AccessToken, HttpMethod, Payload, ScanOptions};
use crate::effects::{CopyleaksSession, ReqwestTransport, Transport};
use crate::error::ApiError;

/// Copyleaks product line, selecting the route prefix scans run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductType {
    #[default]
    Businesses,
    Education,
    Websites,
}

impl ProductType {
    pub fn route_prefix(&self) -> &'static str {
        match self {
            ProductType::Businesses => "businesses",
            ProductType::Education => "education",
            ProductType::Websites => "websites",
        }
    }
}

/// Convenience client for the scanning API.
///
/// Holds the shared session, the product line and the optional callback
/// headers applied to every scan submission.
pub struct CopyleaksCloud<T: Transport = ReqwestTransport> {
    session: CopyleaksSession<T>,
    product: ProductType,
    options: ScanOptions,
}

impl<T: Transport> CopyleaksCloud<T> {
    pub fn new(session: CopyleaksSession<T>, product: ProductType) -> Self {
        Self {
            session,
            product,
            options: ScanOptions::default(),
        }
    }

    /// Replace the callback options applied to scan submissions.
    #[must_use]
    pub fn options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn session(&self) -> &CopyleaksSession<T> {
        &self.session
    }

    /// Login with account email and API key. The returned bearer token is
    /// parsed and handed to the session's token store so subsequent
    /// requests carry `Authorization`.
    pub async fn login(&self, email: &str, api_key: &str) -> Result<Payload, ApiError> {
        let params = json!({ "Email": email, "ApiKey": api_key });
        let payload = self
            .session
            .request(
                HttpMethod::Post,
                "account/login-api",
                Some(&params),
                &ScanOptions::default(),
            )?
            .response_json()
            .await
            .result?;

        match AccessToken::from_payload(&payload) {
            Some(token) => self.session.token_store().save(token),
            None => debug!("login response carried no token fields"),
        }
        Ok(payload)
    }

    /// Start a scan of the document behind a public URL.
    pub async fn create_by_url(&self, url: &str) -> Result<Payload, ApiError> {
        let route = format!("{}/create-by-url", self.product.route_prefix());
        let params = json!({ "Url": url });
        self.submit(HttpMethod::Post, &route, Some(&params)).await
    }

    /// Start a scan of raw text.
    pub async fn create_by_text(&self, text: &str) -> Result<Payload, ApiError> {
        let route = format!("{}/create-by-text", self.product.route_prefix());
        self.session
            .request_raw(
                HttpMethod::Post,
                &route,
                Some(Bytes::copy_from_slice(text.as_bytes())),
                &self.options,
            )?
            .response_json()
            .await
            .result
    }

    /// Start a scan by uploading a file.
    pub async fn create_by_file(
        &self,
        file_name: &str,
        contents: &[u8],
        language: &str,
    ) -> Result<Payload, ApiError> {
        let route = format!("{}/create-by-file", self.product.route_prefix());
        self.session
            .upload(&route, file_name, contents, language, &self.options)?
            .response_json()
            .await
            .result
    }

    /// Start an OCR scan by uploading an image of text.
    pub async fn create_by_ocr(
        &self,
        file_name: &str,
        contents: &[u8],
        language: &str,
    ) -> Result<Payload, ApiError> {
        let route = format!("{}/create-by-file-ocr", self.product.route_prefix());
        self.session
            .upload(&route, file_name, contents, language, &self.options)?
            .response_json()
            .await
            .result
    }

    /// Scan progress details for a process.
    pub async fn status(&self, process_id: &str) -> Result<Payload, ApiError> {
        let route = format!("{}/{}/status", self.product.route_prefix(), process_id);
        self.submit::<Value>(HttpMethod::Get, &route, None).await
    }

    /// Scan results for a completed process.
    pub async fn result(&self, process_id: &str) -> Result<Payload, ApiError> {
        let route = format!("{}/{}/result", self.product.route_prefix(), process_id);
        self.submit::<Value>(HttpMethod::Get, &route, None).await
    }

    /// Delete a completed process from the server.
    pub async fn delete_process(&self, process_id: &str) -> Result<Payload, ApiError> {
        let route = format!("{}/{}/delete", self.product.route_prefix(), process_id);
        self.submit::<Value>(HttpMethod::Delete, &route, None).await
    }

    /// All of the account's active processes.
    pub async fn processes_list(&self) -> Result<Payload, ApiError> {
        let route = format!("{}/list", self.product.route_prefix());
        self.submit::<Value>(HttpMethod::Get, &route, None).await
    }

    /// Remaining credit count.
    pub async fn count_credits(&self) -> Result<Payload, ApiError> {
        let route = format!("{}/count-credits", self.product.route_prefix());
        self.submit::<Value>(HttpMethod::Get, &route, None).await
    }

    /// Supported OCR languages.
    pub async fn ocr_languages(&self) -> Result<Payload, ApiError> {
        self.submit::<Value>(HttpMethod::Get, "miscellaneous/ocr-languages-list", None)
            .await
    }

    /// Supported file types.
    pub async fn supported_file_types(&self) -> Result<Payload, ApiError> {
        self.submit::<Value>(HttpMethod::Get, "miscellaneous/supported-file-types", None)
            .await
    }

    async fn submit<P: serde::Serialize>(
        &self,
        method: HttpMethod,
        route: &str,
        params: Option<&P>,
    ) -> Result<Payload, ApiError> {
        self.session
            .request(method, route, params, &self.options)?
            .response_json()
            .await
            .result
    }
}
