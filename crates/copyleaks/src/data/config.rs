/// Default service host.
pub const DEFAULT_HOST: &str = "api.copyleaks.com";

/// Default API version path segment.
pub const DEFAULT_VERSION: &str = "v1";

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("copyleaks-rs/", env!("CARGO_PKG_VERSION"));

/// Default `Accept-Language` value.
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US";

/// Process-wide request defaults shared by every request a session builds.
///
/// Sessions never mutate their configuration after construction; build one
/// per environment (production, sandbox) instead of toggling a shared one.
///
/// # Examples
///
/// ```
/// use copyleaks::ApiConfig;
///
/// let config = ApiConfig::default()
///     .accept_language("de-DE")
///     .sandbox_mode(true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Service host, without scheme.
    pub host: String,

    /// API version path segment.
    pub version: String,

    /// `User-Agent` header value.
    pub user_agent: String,

    /// `Accept-Language` header value.
    pub accept_language: String,

    /// When set, every request carries `copyleaks-sandbox-mode` and the
    /// service returns mock results without spending credits.
    pub sandbox_mode: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            version: DEFAULT_VERSION.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            sandbox_mode: false,
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.accept_language = accept_language.into();
        self
    }

    #[must_use]
    pub fn sandbox_mode(mut self, sandbox_mode: bool) -> Self {
        self.sandbox_mode = sandbox_mode;
        self
    }

    /// Absolute URL for a service route: `https://<host>/<version>/<route>`.
    pub fn endpoint(&self, route: &str) -> String {
        format!(
            "https://{}/{}/{}",
            self.host,
            self.version,
            route.trim_start_matches('/')
        )
    }
}
