// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // 后端返回非 2xx：只保留状态码，不区分校验/不存在/服务器错误
    #[error("API error: {status}")]
    Api { status: u16, detail: Option<String> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Malformed data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Could not load user or seasons")]
    NoSeasons,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// 界面上失败时的动作，对应 "Failed to load ..." / "Failed to save ..."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Load,
    Save,
}

impl AppError {
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Api { status, .. } => Some(*status),
            AppError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// 核心逻辑：后台记录详细错误，对外只给固定文案
    pub fn user_message(&self, action: Action, subject: &str) -> String {
        match self {
            AppError::Api { status, detail } => {
                tracing::error!(status, detail = ?detail, "API request failed");
            }
            AppError::ValidationError(e) => {
                // 校验错误本身就是给用户看的
                tracing::warn!("Validation failed: {}", e);
                return format!("Invalid input: {}", e);
            }
            AppError::NotLoggedIn => return "Please log in first".to_string(),
            other => tracing::error!("{:?}", other),
        }

        match action {
            Action::Load => format!("Failed to load {}", subject),
            Action::Save => format!("Failed to save {}", subject),
        }
    }
}
