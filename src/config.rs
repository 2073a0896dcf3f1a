use std::env;
use std::path::PathBuf;

use regex::Regex;

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Provider credentials set to this value turn the provider off.
const DISABLED: &str = "disabled";

fn credential(key: &str) -> Option<String> {
    var(key).filter(|v| v != DISABLED)
}

/// Snapshot of every environment variable the scanner recognizes.
///
/// Read once at startup and passed around explicitly, services never touch
/// the environment themselves.
#[derive(Debug, Clone)]
pub struct Config {
    pub library_root: PathBuf,
    pub ignore_pattern: Option<Regex>,
    pub catalog_url: String,
    pub catalog_api_key: String,
    pub postgres_url: String,
    pub rabbitmq_url: String,
    pub tmdb_token: Option<String>,
    pub tvdb_api_key: Option<String>,
    pub tvdb_pin: Option<String>,
    pub simkl_client_id: Option<String>,
    pub jwks_url: String,
    pub jwt_issuer: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            library_root: var("SCANNER_LIBRARY_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/video")),
            ignore_pattern: ignore_pattern(),
            catalog_url: var("KYOO_URL").unwrap_or_else(|| "http://api:3567/api".to_string()),
            catalog_api_key: var("KYOO_APIKEY").unwrap_or_default(),
            postgres_url: postgres_url(),
            rabbitmq_url: rabbitmq_url(),
            tmdb_token: credential("THEMOVIEDB_API_ACCESS_TOKEN"),
            tvdb_api_key: credential("TVDB_APIKEY"),
            tvdb_pin: var("TVDB_PIN"),
            simkl_client_id: var("OIDC_SIMKL_CLIENTID"),
            jwks_url: var("JWKS_URL")
                .unwrap_or_else(|| "http://auth:4568/.well-known/jwks.json".to_string()),
            jwt_issuer: var("JWT_ISSUER"),
            port: var("SCANNER_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(4389),
        }
    }
}

fn ignore_pattern() -> Option<Regex> {
    let pattern = var("LIBRARY_IGNORE_PATTERN")?;
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("Invalid ignore pattern, ignoring it: {e}");
            None
        }
    }
}

fn postgres_url() -> String {
    if let Some(url) = var("POSTGRES_URL") {
        return url;
    }
    let user = var("PGUSER").unwrap_or_else(|| "kyoo".to_string());
    let host = var("PGHOST").unwrap_or_else(|| "postgres".to_string());
    let password = var("PGPASSWORD").unwrap_or_else(|| "password".to_string());
    let port = var("PGPORT").unwrap_or_else(|| "5432".to_string());
    let database = var("PGDATABASE").unwrap_or_else(|| user.clone());
    format!("postgres://{user}:{password}@{host}:{port}/{database}")
}

fn rabbitmq_url() -> String {
    if let Some(url) = var("RABBITMQ_URL") {
        return url;
    }
    let host = var("RABBITMQ_HOST").unwrap_or_else(|| "rabbitmq".to_string());
    let port = var("RABBITMQ_PORT").unwrap_or_else(|| "5672".to_string());
    let user = var("RABBITMQ_DEFAULT_USER").unwrap_or_else(|| "guest".to_string());
    let password = var("RABBITMQ_DEFAULT_PASS").unwrap_or_else(|| "guest".to_string());
    format!("amqp://{user}:{password}@{host}:{port}/%2f")
}
