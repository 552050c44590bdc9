/// Startup configuration handed over by the hosting page
use log::LevelFilter;
use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use crate::session::SignInRequest;

fn default_provider() -> String {
    "google".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_filter() -> LevelFilter {
    LevelFilter::Info
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    #[serde(default = "default_provider")]
    pub oauth_provider: String,
    /// Where the provider sends the browser back to; defaults to the page origin
    #[serde(default)]
    pub redirect_to: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Parsed form of `log_level`, filled in by `validate`
    #[serde(skip, default = "default_log_filter")]
    log_filter: LevelFilter,
}

impl AppConfig {
    pub fn new(supabase_url: &str, supabase_anon_key: &str) -> AppConfig {
        AppConfig {
            supabase_url: supabase_url.to_string(),
            supabase_anon_key: supabase_anon_key.to_string(),
            oauth_provider: default_provider(),
            redirect_to: None,
            log_level: default_log_level(),
            log_filter: default_log_filter(),
        }
    }

    /// Trim fields and reject anything the app cannot start with
    pub fn validate(mut self) -> Result<AppConfig, ConfigError> {
        self.supabase_url = self.supabase_url.trim().to_string();
        self.supabase_anon_key = self.supabase_anon_key.trim().to_string();
        self.oauth_provider = self.oauth_provider.trim().to_string();
        self.redirect_to = self
            .redirect_to
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        if self.supabase_url.is_empty() {
            return Err(ConfigError::MissingField("supabaseUrl"));
        }
        if self.supabase_anon_key.is_empty() {
            return Err(ConfigError::MissingField("supabaseAnonKey"));
        }
        if self.oauth_provider.is_empty() {
            return Err(ConfigError::MissingField("oauthProvider"));
        }

        Url::parse(&self.supabase_url).map_err(|e| ConfigError::InvalidUrl {
            field: "supabaseUrl",
            reason: e.to_string(),
        })?;
        if let Some(redirect) = &self.redirect_to {
            Url::parse(redirect).map_err(|e| ConfigError::InvalidUrl {
                field: "redirectTo",
                reason: e.to_string(),
            })?;
        }

        self.log_filter = self
            .log_level
            .trim()
            .parse::<LevelFilter>()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))?;
        Ok(self)
    }

    pub fn log_filter(&self) -> LevelFilter {
        self.log_filter
    }

    /// The OAuth request for this deployment; `origin` is the page's own origin
    pub fn sign_in_request(&self, origin: &str) -> SignInRequest {
        SignInRequest {
            provider: self.oauth_provider.clone(),
            redirect_to: self
                .redirect_to
                .clone()
                .unwrap_or_else(|| origin.to_string()),
        }
    }
}
