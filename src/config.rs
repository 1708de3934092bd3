use crate::models::CaptureSettings;
use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
    #[error(transparent)]
    DotEnvError(#[from] dotenvy::Error),
}

#[derive(Clone, Debug)] // Clone needed if passed around, Debug for logging
pub struct Config {
    pub bind_address: SocketAddr,
    /// Static base document the card page is built from.
    pub template_path: PathBuf,
    /// Scheme assumed when no `X-Forwarded-Proto` header is present.
    pub default_scheme: String,
    // None lets headless_chrome auto-detect an installed Chrome
    pub chrome_path: Option<PathBuf>,
    pub chrome_sandbox: bool,
    pub capture: CaptureSettings,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present; a missing file is fine, a broken one is not
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Self::from_env()
    }

    /// Reads configuration from the process environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_address_str = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let template_path = env::var("CARD_TEMPLATE_PATH")
            .unwrap_or_else(|_| "static/webpage-skeleton.html".to_string())
            .into();

        let default_scheme = env::var("DEFAULT_SCHEME").unwrap_or_else(|_| "https".to_string());
        if default_scheme != "http" && default_scheme != "https" {
            return Err(ConfigError::InvalidVar(
                "DEFAULT_SCHEME".into(),
                format!("expected http or https, got '{}'", default_scheme),
            ));
        }

        let chrome_path = env::var("CHROME_PATH").ok().filter(|p| !p.is_empty()).map(PathBuf::from);
        let chrome_sandbox = parse_var("CHROME_SANDBOX", true)?;

        let defaults = CaptureSettings::default();
        let capture = CaptureSettings {
            navigation_timeout: millis_var("CAPTURE_NAVIGATION_TIMEOUT_MS", defaults.navigation_timeout)?,
            readiness_timeout: millis_var("CAPTURE_READINESS_TIMEOUT_MS", defaults.readiness_timeout)?,
            settle_delay: millis_var("CAPTURE_SETTLE_DELAY_MS", defaults.settle_delay)?,
            ..defaults
        };

        let config = Config {
            bind_address,
            template_path,
            default_scheme,
            chrome_path,
            chrome_sandbox,
            capture,
        };

        tracing::info!(
            bind_address = %config.bind_address,
            template_path = %config.template_path.display(),
            default_scheme = %config.default_scheme,
            chrome_path = ?config.chrome_path,
            chrome_sandbox = config.chrome_sandbox,
            navigation_timeout_ms = config.capture.navigation_timeout.as_millis() as u64,
            readiness_timeout_ms = config.capture.readiness_timeout.as_millis() as u64,
            settle_delay_ms = config.capture.settle_delay.as_millis() as u64,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Idle limit for a Chrome process: longer than any single capture wait.
    pub fn browser_idle_timeout(&self) -> Duration {
        self.capture.navigation_timeout + self.capture.readiness_timeout + Duration::from_secs(30)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidVar(name.into(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn millis_var(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    let millis = parse_var(name, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}
