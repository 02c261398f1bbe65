use std::env;

use log::warn;

/// Process-wide configuration, read once at startup and injected into the
/// request layer through `web::Data`. Request gating never consults
/// mutable global state.
#[derive(Clone)]
pub struct AppConfig {
    /// When false (maintenance/dev mode), `/auth/session` accepts
    /// assertions without a digest check.
    pub auth_enabled: bool,
    /// Secret shared with the upstream identity provider.
    pub provider_secret: String,
    /// `Secure` cookies; disabled under MODE=dev.
    pub cookie_secure: bool,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let auth_enabled = match env::var("AUTH_ENABLED") {
            Ok(v) if v == "false" || v == "0" => {
                warn!("Authentication enforcement disabled.");
                false
            }
            _ => true, // Enforced as default!
        };

        let cookie_secure = match env::var("MODE") {
            Ok(mode) if mode == "dev" => {
                warn!("Under development mode.");
                false
            }
            _ => true, // Production mode as default!
        };

        let provider_secret = if auth_enabled {
            env::var("PROVIDER_SECRET").expect("PROVIDER_SECRET must be set")
        } else {
            env::var("PROVIDER_SECRET").unwrap_or_default()
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self {
            auth_enabled,
            provider_secret,
            cookie_secure,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:9000".to_string()),
            cors_origins,
        }
    }
}
