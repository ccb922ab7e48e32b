//! Startup configuration.
//!
//! Everything here is validated eagerly: an invalid environment is a
//! `ConfigError` and the process refuses to start. The refresh interval has
//! an enforced upper bound so the revocation propagation delay cannot be
//! configured away.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    pub fn is_production(self) -> bool {
        matches!(self, RunMode::Production)
    }
}

/// OAuth provider identifier. Only the validated provider set gates startup;
/// the handshake itself lives outside this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderId {
    Github,
    Google,
}

impl ProviderId {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::Github => "github",
            ProviderId::Google => "google",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "github" => Some(ProviderId::Github),
            "google" => Some(ProviderId::Google),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub run_mode: RunMode,
    pub bind_addr: String,
    pub database_url: String,
    pub auth_secret: String,
    /// Upper bound on how long cached claims are trusted without a store
    /// round trip (milliseconds).
    pub claims_refresh_interval_ms: u64,
    /// Session token lifetime (seconds); also the token `exp`.
    pub session_max_age_secs: u64,
    pub session_update_age_secs: u64,
    pub github: Option<ProviderCredentials>,
    pub google: Option<ProviderCredentials>,
    pub default_provider: ProviderId,
    pub trust_proxy_headers: bool,
}

const DEFAULT_REFRESH_INTERVAL_MS: [u64; 2] = [60_000, 5_000]; // [dev, prod]
const MAX_REFRESH_INTERVAL_MS: [u64; 2] = [300_000, 30_000];
const DEFAULT_SESSION_MAX_AGE_SECS: [u64; 2] = [604_800, 86_400];
const DEFAULT_SESSION_UPDATE_AGE_SECS: [u64; 2] = [86_400, 900];
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let run_mode = match lookup("APP_ENV").as_deref() {
            None | Some("development") => RunMode::Development,
            Some("production") => RunMode::Production,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "APP_ENV",
                    format!("must be 'development' or 'production', got {other:?}"),
                ));
            }
        };
        let mode_idx = usize::from(run_mode.is_production());

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
            return Err(ConfigError::invalid(
                "DATABASE_URL",
                "must use postgres:// or postgresql:// scheme",
            ));
        }

        let auth_secret = lookup("AUTH_SECRET").ok_or(ConfigError::Missing("AUTH_SECRET"))?;
        if run_mode.is_production() && auth_secret.len() < MIN_PRODUCTION_SECRET_LEN {
            return Err(ConfigError::invalid(
                "AUTH_SECRET",
                format!("must be at least {MIN_PRODUCTION_SECRET_LEN} characters in production"),
            ));
        }

        let claims_refresh_interval_ms = match lookup("AUTH_CLAIMS_REFRESH_INTERVAL_MS") {
            None => DEFAULT_REFRESH_INTERVAL_MS[mode_idx],
            Some(raw) => {
                let parsed: u64 = raw.trim().parse().map_err(|_| {
                    ConfigError::invalid(
                        "AUTH_CLAIMS_REFRESH_INTERVAL_MS",
                        "must be a non-negative integer",
                    )
                })?;
                if parsed > MAX_REFRESH_INTERVAL_MS[mode_idx] {
                    return Err(ConfigError::invalid(
                        "AUTH_CLAIMS_REFRESH_INTERVAL_MS",
                        format!(
                            "must be less than or equal to {}",
                            MAX_REFRESH_INTERVAL_MS[mode_idx]
                        ),
                    ));
                }
                parsed
            }
        };

        let session_max_age_secs = read_positive_integer(
            &lookup,
            "AUTH_SESSION_MAX_AGE_SECONDS",
            DEFAULT_SESSION_MAX_AGE_SECS[mode_idx],
        )?;
        let session_update_age_secs = read_positive_integer(
            &lookup,
            "AUTH_SESSION_UPDATE_AGE_SECONDS",
            DEFAULT_SESSION_UPDATE_AGE_SECS[mode_idx],
        )?;
        if session_update_age_secs > session_max_age_secs {
            return Err(ConfigError::invalid(
                "AUTH_SESSION_UPDATE_AGE_SECONDS",
                "must be less than or equal to AUTH_SESSION_MAX_AGE_SECONDS",
            ));
        }

        let github =
            read_provider_credentials(&lookup, "github", "AUTH_GITHUB_ID", "AUTH_GITHUB_SECRET")?;
        let google =
            read_provider_credentials(&lookup, "google", "AUTH_GOOGLE_ID", "AUTH_GOOGLE_SECRET")?;

        let enabled: Vec<ProviderId> = [
            github.as_ref().map(|_| ProviderId::Github),
            google.as_ref().map(|_| ProviderId::Google),
        ]
        .into_iter()
        .flatten()
        .collect();
        let Some(&fallback_provider) = enabled.first() else {
            return Err(ConfigError::invalid(
                "AUTH_PROVIDERS",
                "at least one auth provider must be configured",
            ));
        };

        let default_provider = match lookup("AUTH_DEFAULT_PROVIDER") {
            None => fallback_provider,
            Some(raw) => {
                let provider = ProviderId::parse(&raw).ok_or_else(|| {
                    ConfigError::invalid(
                        "AUTH_DEFAULT_PROVIDER",
                        format!("must be one of: github, google. Received: {raw}"),
                    )
                })?;
                if !enabled.contains(&provider) {
                    return Err(ConfigError::invalid(
                        "AUTH_DEFAULT_PROVIDER",
                        format!("{} is not configured in environment variables", raw),
                    ));
                }
                provider
            }
        };

        let trust_proxy_headers = match lookup("TRUST_PROXY_HEADERS").as_deref().map(str::trim) {
            None | Some("") | Some("false") => false,
            Some("true") => true,
            Some(_) => {
                return Err(ConfigError::invalid(
                    "TRUST_PROXY_HEADERS",
                    "must be 'true' or 'false'",
                ));
            }
        };

        Ok(Self {
            run_mode,
            bind_addr,
            database_url,
            auth_secret,
            claims_refresh_interval_ms,
            session_max_age_secs,
            session_update_age_secs,
            github,
            google,
            default_provider,
            trust_proxy_headers,
        })
    }

    pub fn refresh_interval(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.claims_refresh_interval_ms as i64)
    }
}

fn read_positive_integer(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    fallback: u64,
) -> Result<u64, ConfigError> {
    match lookup(name) {
        None => Ok(fallback),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            _ => Err(ConfigError::invalid(name, "must be a positive integer")),
        },
    }
}

fn read_provider_credentials(
    lookup: &impl Fn(&str) -> Option<String>,
    provider: &'static str,
    id_name: &'static str,
    secret_name: &'static str,
) -> Result<Option<ProviderCredentials>, ConfigError> {
    let client_id = lookup(id_name);
    let client_secret = lookup(secret_name);

    match (client_id, client_secret) {
        (Some(client_id), Some(client_secret)) => Ok(Some(ProviderCredentials {
            client_id,
            client_secret,
        })),
        (None, None) => Ok(None),
        _ => Err(ConfigError::invalid(
            "AUTH_PROVIDERS",
            format!("{provider} provider must define both {id_name} and {secret_name}"),
        )),
    }
}
