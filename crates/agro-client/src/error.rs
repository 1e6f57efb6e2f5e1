//! API 錯誤類型

use thiserror::Error;

/// 遠端 API 呼叫錯誤
#[derive(Debug, Error)]
pub enum ApiError {
    /// 伺服器回傳非 2xx 狀態
    #[error("{}", remote_display(*status, message.as_deref()))]
    Remote { status: u16, message: Option<String> },

    /// 連線失敗或逾時
    #[error("無法連線到預測服務: {0}")]
    Transport(String),

    /// 回應內容無法解析
    #[error("回應格式錯誤: {0}")]
    Decode(String),

    #[error("讀取檔案失敗: {0}")]
    Io(#[from] std::io::Error),

    #[error("無效的 API 位址: {0}")]
    InvalidUrl(String),
}

fn remote_display(status: u16, message: Option<&str>) -> String {
    match message {
        Some(message) => message.to_string(),
        None => format!("Request failed with status code {status}"),
    }
}

impl ApiError {
    /// 伺服器提供的錯誤訊息（若有）
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ApiError::Remote {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }

    /// 顯示給使用者的訊息：優先使用伺服器訊息，否則使用錯誤描述
    pub fn user_message(&self) -> String {
        self.remote_message()
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }

    /// 是否為連線層錯誤
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Remote {
                status: status.as_u16(),
                message: None,
            }
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
