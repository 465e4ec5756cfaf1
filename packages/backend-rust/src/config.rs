use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/app.db?mode=rwc";
const DEFAULT_GUARDIAN_API_URL: &str = "https://content.guardianapis.com";
const DEFAULT_DICTIONARY_API_URL: &str = "https://api.dictionaryapi.dev/api/v2";
const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub database_url: String,
    pub jwt_secret: Option<String>,
    pub jwt_expires_in: String,
    pub cors_origins: Vec<String>,
    pub guardian_api_key: Option<String>,
    pub guardian_api_url: String,
    pub dictionary_api_url: String,
    pub dictionary_timeout: Duration,
    pub bcrypt_cost: u32,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub window_ms: u64,
    pub max: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(5000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let is_test = matches!(env_string("APP_ENV").as_deref(), Some("test"));

        Self {
            host,
            port,
            log_level,
            database_url: env_string("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            jwt_secret: env_string("JWT_SECRET"),
            jwt_expires_in: env_string("JWT_EXPIRES_IN").unwrap_or_else(|| "7d".to_string()),
            cors_origins: merge_origins(env_string("CLIENT_URL").as_deref()),
            guardian_api_key: env_string("GUARDIAN_API_KEY"),
            guardian_api_url: env_string("GUARDIAN_API_URL")
                .unwrap_or_else(|| DEFAULT_GUARDIAN_API_URL.to_string()),
            dictionary_api_url: env_string("DICTIONARY_API_URL")
                .unwrap_or_else(|| DEFAULT_DICTIONARY_API_URL.to_string()),
            dictionary_timeout: Duration::from_millis(
                env_u64("DICTIONARY_TIMEOUT_MS").unwrap_or(5000),
            ),
            bcrypt_cost: env_u64("BCRYPT_COST")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(12),
            rate_limit: RateLimitSettings {
                enabled: !is_test,
                window_ms: env_u64("RATE_LIMIT_WINDOW_MS").unwrap_or(15 * 60 * 1000),
                max: env_u64("RATE_LIMIT_MAX").unwrap_or(100),
            },
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5000,
            log_level: "info".to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            jwt_secret: None,
            jwt_expires_in: "7d".to_string(),
            cors_origins: merge_origins(None),
            guardian_api_key: None,
            guardian_api_url: DEFAULT_GUARDIAN_API_URL.to_string(),
            dictionary_api_url: DEFAULT_DICTIONARY_API_URL.to_string(),
            dictionary_timeout: Duration::from_secs(5),
            bcrypt_cost: 12,
            rate_limit: RateLimitSettings {
                enabled: true,
                window_ms: 15 * 60 * 1000,
                max: 100,
            },
        }
    }
}

/// Default dev origins plus the comma-separated `CLIENT_URL` list, deduplicated.
fn merge_origins(raw: Option<&str>) -> Vec<String> {
    let mut origins: Vec<String> = DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect();
    for origin in raw.unwrap_or_default().split(',') {
        let origin = origin.trim().trim_end_matches('/');
        if !origin.is_empty() && !origins.iter().any(|o| o == origin) {
            origins.push(origin.to_string());
        }
    }
    origins
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_urls_are_merged_without_duplicates() {
        let origins = merge_origins(Some("https://app.example.com/, http://localhost:3000,"));
        assert_eq!(
            origins,
            vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "https://app.example.com".to_string(),
            ]
        );
    }

    #[test]
    fn defaults_without_client_url() {
        assert_eq!(merge_origins(None).len(), 2);
    }
}
