/// Optional per-call headers understood by the scanning service.
///
/// All of these are plain header injections; the service validates their
/// content, the client only checks presence.
///
/// # Examples
///
/// ```
/// use copyleaks::ScanOptions;
///
/// let options = ScanOptions::default()
///     .http_callback("https://example.com/scan-done")
///     .allow_partial_scan(true);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Endpoint the service calls back over HTTP once the scan completes.
    pub http_callback: Option<String>,

    /// Address the service mails once the scan completes.
    pub email_callback: Option<String>,

    /// Opaque payload echoed back with the completion callback.
    pub client_custom_message: Option<String>,

    /// Scan as many pages as remaining credits allow instead of rejecting
    /// the request outright.
    pub allow_partial_scan: bool,
}

impl ScanOptions {
    #[must_use]
    pub fn http_callback(mut self, url: impl Into<String>) -> Self {
        self.http_callback = Some(url.into());
        self
    }

    #[must_use]
    pub fn email_callback(mut self, address: impl Into<String>) -> Self {
        self.email_callback = Some(address.into());
        self
    }

    #[must_use]
    pub fn client_custom_message(mut self, message: impl Into<String>) -> Self {
        self.client_custom_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn allow_partial_scan(mut self, allow: bool) -> Self {
        self.allow_partial_scan = allow;
        self
    }

    /// Render the configured options as request headers.
    pub(crate) fn headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if self.allow_partial_scan {
            headers.push(("copyleaks-allow-partial-scan".to_string(), "true".to_string()));
        }
        if let Some(url) = &self.http_callback {
            headers.push(("copyleaks-http-callback".to_string(), url.clone()));
        }
        if let Some(address) = &self.email_callback {
            headers.push(("copyleaks-email-callback".to_string(), address.clone()));
        }
        if let Some(message) = &self.client_custom_message {
            headers.push(("copyleaks-client-custom-Message".to_string(), message.clone()));
        }
        headers
    }
}
