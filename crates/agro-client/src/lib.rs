//! # Agro Client
//!
//! 預測服務的 HTTP 用戶端與抽象介面

pub mod api;
pub mod error;
pub mod http;

pub use api::{ForecastApi, TrainStatus, UploadAck};
pub use error::{ApiError, Result};
pub use http::{parse_remote_error, HttpForecastApi};
