use std::env;

const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Browser origins allowed to call the API with credentials.
///
/// Refresh cookies are sent cross-origin, so wildcard origins are never used.
#[derive(Clone, Debug)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// Reads the comma-separated `ALLOWED_ORIGINS`.
    pub fn from_env() -> Self {
        let raw = env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string());
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Self {
        let mut allowed_origins: Vec<String> = raw
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/'))
            .filter(|origin| !origin.is_empty() && *origin != "*")
            .map(str::to_string)
            .collect();
        allowed_origins.dedup();

        Self { allowed_origins }
    }
}
