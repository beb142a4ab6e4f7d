// src/config.rs
use std::path::PathBuf;
use std::time::Duration;

use crate::AppError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const SESSION_FILE_NAME: &str = "plantlady-session.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub timeout: Duration,
    pub session_file: PathBuf,
}

impl Config {
    /// 读取环境变量（main 里已加载 .env），未设置的项用默认值
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("PLANTLADY_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "PLANTLADY_API_URL must be an http(s) URL, got '{}'",
                api_url
            )));
        }

        let timeout_ms = match lookup("PLANTLADY_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::Config(format!("PLANTLADY_TIMEOUT_MS must be milliseconds, got '{}'", raw))
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        // 浏览器里是 sessionStorage，这里放在临时目录
        let session_file = lookup("PLANTLADY_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(SESSION_FILE_NAME));

        Ok(Self {
            api_url,
            timeout: Duration::from_millis(timeout_ms),
            session_file,
        })
    }
}
