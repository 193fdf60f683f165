use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Signing secret for session tokens; a random per-process secret is
    /// generated when unset.
    pub token_secret: Option<String>,
    pub token_ttl_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("GATEWAY_PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(9443),
            token_secret: env::var("GATEWAY_TOKEN_SECRET").ok(),
            token_ttl_seconds: env::var("GATEWAY_TOKEN_TTL")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(3600), // one hour, matching the token lifetime the console expects
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 9443,
            token_secret: None,
            token_ttl_seconds: 3600,
        }
    }
}
