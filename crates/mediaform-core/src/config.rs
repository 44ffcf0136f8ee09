//! Configuration module
//!
//! Server, storage, media validation, cache and transform settings, loaded
//! from the environment (a `.env` file is honoured when present).

use std::env;
use std::time::Duration;

const SERVER_PORT: u16 = 5000;
const MAX_FILE_SIZE_MB: usize = 10;
const MAX_VIDEO_SIZE_MB: usize = 200;
const CACHE_MAX_BYTES_MB: usize = 256;
const CACHE_MAX_ENTRIES: usize = 1024;
const TRANSFORM_TIMEOUT_SECS: u64 = 30;
const MAX_CONCURRENT_TRANSFORMS: usize = 4;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    /// Prefix for the URLs returned by uploads, e.g. "http://localhost:5000"
    pub public_base_url: String,
    /// "text" or "json"
    pub log_format: String,
}

/// Full application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub local_storage_path: String,
    pub max_file_size_bytes: usize,
    pub max_video_size_bytes: usize,
    pub image_allowed_extensions: Vec<String>,
    pub video_allowed_extensions: Vec<String>,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub cache_max_bytes: usize,
    pub cache_max_entries: usize,
    pub transform_timeout: Duration,
    pub max_concurrent_transforms: usize,
    /// Requests the router serves at once before queueing
    pub http_concurrency_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base: BaseConfig {
                server_port: SERVER_PORT,
                environment: "development".to_string(),
                cors_origins: vec!["*".to_string()],
                public_base_url: format!("http://localhost:{}", SERVER_PORT),
                log_format: "text".to_string(),
            },
            local_storage_path: "uploads".to_string(),
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            max_video_size_bytes: MAX_VIDEO_SIZE_MB * 1024 * 1024,
            image_allowed_extensions: split_list("jpg,jpeg,png"),
            video_allowed_extensions: split_list("mp4"),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            cache_max_bytes: CACHE_MAX_BYTES_MB * 1024 * 1024,
            cache_max_entries: CACHE_MAX_ENTRIES,
            transform_timeout: Duration::from_secs(TRANSFORM_TIMEOUT_SECS),
            max_concurrent_transforms: MAX_CONCURRENT_TRANSFORMS,
            http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let server_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let base = BaseConfig {
            server_port,
            environment,
            cors_origins: cors_origins_str
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", server_port)),
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "text".to_string())
                .to_lowercase(),
        };

        let config = Config {
            base,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "uploads".to_string()),
            max_file_size_bytes: env_or("MAX_FILE_SIZE_MB", MAX_FILE_SIZE_MB) * 1024 * 1024,
            max_video_size_bytes: env_or("MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB) * 1024 * 1024,
            image_allowed_extensions: split_list(
                &env::var("IMAGE_ALLOWED_EXTENSIONS").unwrap_or_else(|_| "jpg,jpeg,png".into()),
            ),
            video_allowed_extensions: split_list(
                &env::var("VIDEO_ALLOWED_EXTENSIONS").unwrap_or_else(|_| "mp4".into()),
            ),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            cache_max_bytes: env_or("CACHE_MAX_BYTES_MB", CACHE_MAX_BYTES_MB) * 1024 * 1024,
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", CACHE_MAX_ENTRIES),
            transform_timeout: Duration::from_secs(env_or(
                "TRANSFORM_TIMEOUT_SECS",
                TRANSFORM_TIMEOUT_SECS,
            )),
            max_concurrent_transforms: env_or(
                "MAX_CONCURRENT_TRANSFORMS",
                MAX_CONCURRENT_TRANSFORMS,
            ),
            http_concurrency_limit: env_or("HTTP_CONCURRENCY_LIMIT", HTTP_CONCURRENCY_LIMIT),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.cache_max_bytes == 0 || self.cache_max_entries == 0 {
            return Err(anyhow::anyhow!(
                "CACHE_MAX_BYTES_MB and CACHE_MAX_ENTRIES must be greater than zero"
            ));
        }
        if self.transform_timeout.is_zero() {
            return Err(anyhow::anyhow!("TRANSFORM_TIMEOUT_SECS must be greater than zero"));
        }
        if self.max_concurrent_transforms == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_TRANSFORMS must be greater than zero"
            ));
        }
        if self.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT must be greater than zero"));
        }
        for (name, path) in [("FFMPEG_PATH", &self.ffmpeg_path), ("FFPROBE_PATH", &self.ffprobe_path)]
        {
            validate_tool_path(path)
                .map_err(|reason| anyhow::anyhow!("{} is invalid: {}", name, reason))?;
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.base.environment)
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    /// Largest body any upload may carry
    pub fn max_upload_bytes(&self) -> usize {
        self.max_file_size_bytes.max(self.max_video_size_bytes)
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn env_or<T: std::str::FromStr + ToString + Copy>(name: &str, default: T) -> T {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Reject tool paths containing shell metacharacters or traversal
fn validate_tool_path(path: &str) -> Result<(), &'static str> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.is_empty() {
        return Err("path is empty");
    }
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err("path contains dangerous characters");
    }
    if path.contains("..") {
        return Err("path contains directory traversal");
    }
    Ok(())
}
