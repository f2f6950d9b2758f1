use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_MAX_FILE_SIZE: usize = 50 * 1024 * 1024;
const MAX_DOCUMENT_TTL_DAYS: i64 = 36_500;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub redis_url: String,
    pub memory_store: bool,
    pub max_file_size: usize,
    pub max_versions: usize,
    pub document_ttl_days: i64,
    pub generator_enabled: bool,
    pub generator_server: String,
    pub allow_version_deletion: bool,
    pub allow_version_download: bool,
    pub allow_custom_share_link: bool,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Hosts OpenAPI documents with version history")]
pub struct Args {
    /// Host to bind to (overrides APISCOPE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides APISCOPE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where document files are stored (overrides APISCOPE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Redis connection URL (overrides APISCOPE_REDIS_URL)
    #[arg(long)]
    pub redis_url: Option<String>,

    /// Keep records in process memory instead of Redis
    #[arg(long)]
    pub memory_store: bool,

    /// Enable the SDK generator integration (overrides APISCOPE_GENERATOR_ENABLED)
    #[arg(long)]
    pub generator_enabled: Option<bool>,

    /// SDK generator base URL (overrides APISCOPE_GENERATOR_SERVER)
    #[arg(long)]
    pub generator_server: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::resolve(args, |key| env::var(key).ok())
    }

    /// Merge CLI args over values from `lookup` (the process environment in
    /// production) over defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let string = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let list = |key: &str, default: &str| parse_csv(&string(key, default));
        let flag = |key: &str, default: bool| -> Result<bool> {
            match var(key) {
                Some(value) => parse_bool(&value)
                    .with_context(|| format!("parsing {} value `{}`", key, value)),
                None => Ok(default),
            }
        };

        let env_port: u16 = parse_var(&var, "APISCOPE_PORT", 8080)?;

        let config = Self {
            host: args.host.unwrap_or_else(|| string("APISCOPE_HOST", "0.0.0.0")),
            port: args.port.unwrap_or(env_port),
            storage_dir: args
                .storage_dir
                .unwrap_or_else(|| string("APISCOPE_STORAGE_DIR", "./storage/documents")),
            redis_url: args
                .redis_url
                .unwrap_or_else(|| string("APISCOPE_REDIS_URL", "redis://127.0.0.1:6379")),
            memory_store: args.memory_store || flag("APISCOPE_MEMORY_STORE", false)?,
            max_file_size: parse_var(&var, "APISCOPE_MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?,
            max_versions: parse_var(&var, "APISCOPE_MAX_VERSIONS", 20)?,
            document_ttl_days: parse_var(&var, "APISCOPE_DOCUMENT_TTL_DAYS", 30)?,
            generator_enabled: match args.generator_enabled {
                Some(enabled) => enabled,
                None => flag("APISCOPE_GENERATOR_ENABLED", false)?,
            },
            generator_server: args.generator_server.unwrap_or_else(|| {
                string(
                    "APISCOPE_GENERATOR_SERVER",
                    "https://api.openapi-generator.tech",
                )
            }),
            allow_version_deletion: flag("APISCOPE_ALLOW_VERSION_DELETION", false)?,
            allow_version_download: flag("APISCOPE_ALLOW_VERSION_DOWNLOAD", true)?,
            allow_custom_share_link: flag("APISCOPE_ALLOW_CUSTOM_SHARE_LINK", false)?,
            cors: CorsConfig {
                allowed_origins: list("APISCOPE_ALLOWED_ORIGINS", "*"),
                allowed_methods: list(
                    "APISCOPE_CORS_ALLOWED_METHODS",
                    "GET,POST,PUT,PATCH,DELETE,OPTIONS",
                ),
                allowed_headers: list(
                    "APISCOPE_CORS_ALLOWED_HEADERS",
                    "Authorization,Content-Type,Accept,Origin",
                ),
                expose_headers: list("APISCOPE_CORS_EXPOSE_HEADERS", "Content-Length"),
                allow_credentials: flag("APISCOPE_CORS_ALLOW_CREDENTIALS", false)?,
                max_age_secs: parse_var(&var, "APISCOPE_CORS_MAX_AGE", 600)?,
            },
        };
        config.check_ranges()?;
        Ok(config)
    }

    /// Reject values that would make every upload fail or overflow date math.
    fn check_ranges(&self) -> Result<()> {
        if !(1..=MAX_DOCUMENT_TTL_DAYS).contains(&self.document_ttl_days) {
            anyhow::bail!(
                "APISCOPE_DOCUMENT_TTL_DAYS must be between 1 and {}, got {}",
                MAX_DOCUMENT_TTL_DAYS,
                self.document_ttl_days
            );
        }
        if self.max_versions == 0 {
            anyhow::bail!("APISCOPE_MAX_VERSIONS must be at least 1");
        }
        if self.max_file_size == 0 {
            anyhow::bail!("APISCOPE_MAX_FILE_SIZE must be at least 1 byte");
        }
        Ok(())
    }

    /// Built-in defaults, ignoring CLI and environment.
    pub fn defaults() -> Result<Self> {
        Self::resolve(Args::default(), |_| None)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("`{}` is not a boolean", other),
    }
}

/// Split a comma-separated list, dropping blanks. An empty list means `*`.
fn parse_csv(raw: &str) -> Vec<String> {
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        vec!["*".to_string()]
    } else {
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig::defaults().unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:8080");
        assert_eq!(cfg.max_file_size, 50 * 1024 * 1024);
        assert_eq!(cfg.max_versions, 20);
        assert_eq!(cfg.document_ttl_days, 30);
        assert!(!cfg.generator_enabled);
        assert!(!cfg.allow_version_deletion);
        assert!(cfg.allow_version_download);
        assert_eq!(cfg.cors.allowed_origins, vec!["*"]);
        assert_eq!(cfg.cors.max_age_secs, 600);
    }

    #[test]
    fn env_then_args_precedence() {
        let args = Args {
            port: Some(9000),
            ..Args::default()
        };
        let cfg = AppConfig::resolve(
            args,
            lookup(&[
                ("APISCOPE_PORT", "7000"),
                ("APISCOPE_HOST", "127.0.0.1"),
                ("APISCOPE_GENERATOR_ENABLED", "yes"),
                ("APISCOPE_ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.host, "127.0.0.1");
        assert!(cfg.generator_enabled);
        assert_eq!(
            cfg.cors.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn bad_numbers_and_flags_are_errors() {
        assert!(AppConfig::resolve(Args::default(), lookup(&[("APISCOPE_PORT", "http")])).is_err());
        assert!(
            AppConfig::resolve(
                Args::default(),
                lookup(&[("APISCOPE_ALLOW_VERSION_DELETION", "maybe")])
            )
            .is_err()
        );
    }

    #[test]
    fn out_of_range_limits_are_errors() {
        for (key, value) in [
            ("APISCOPE_DOCUMENT_TTL_DAYS", "0"),
            ("APISCOPE_DOCUMENT_TTL_DAYS", "-1"),
            ("APISCOPE_DOCUMENT_TTL_DAYS", "200000000000"),
            ("APISCOPE_MAX_VERSIONS", "0"),
            ("APISCOPE_MAX_FILE_SIZE", "0"),
        ] {
            assert!(
                AppConfig::resolve(Args::default(), lookup(&[(key, value)])).is_err(),
                "{key}={value} should be rejected"
            );
        }

        let cfg = AppConfig::resolve(
            Args::default(),
            lookup(&[
                ("APISCOPE_DOCUMENT_TTL_DAYS", "36500"),
                ("APISCOPE_MAX_VERSIONS", "1"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.document_ttl_days, 36_500);
        assert_eq!(cfg.max_versions, 1);
    }
}
