//! 用戶端配置模型

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::plan::FuelSituation;
use crate::{AgroError, Result};

/// 預設 API 位址
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/";

/// 覆寫 API 位址的環境變數
pub const ENV_BASE_URL: &str = "AGRO_API_BASE_URL";

/// 預設產品清單
pub const DEFAULT_PRODUCTS: [&str; 7] = [
    "ABERDEN_ANGUS",
    "SEMBRADORA_ELECTRICA",
    "SEMILLA DE MAIZ",
    "SEMILLA DE SORGO",
    "HOMEPATIA",
    "DEFENSIVOS",
    "ALIMENTO BALANCEADO",
];

/// 用戶端配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API 位址（以 `/` 結尾）
    pub base_url: String,

    /// 請求逾時（秒），None 表示不設逾時
    pub request_timeout_secs: Option<u64>,

    /// 自動執行的防抖延遲（毫秒）
    pub debounce_ms: u64,

    /// 訓練完成後切換畫面的延遲（毫秒）
    pub navigate_delay_ms: u64,

    /// 核准時使用的預設庫存
    pub default_stock: Decimal,

    /// 核准時使用的預設燃料狀況
    pub default_fuel: FuelSituation,

    /// 模擬的產品清單
    pub products: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
            debounce_ms: 1000,
            navigate_delay_ms: 1500,
            default_stock: Decimal::from(100),
            default_fuel: FuelSituation::Critical,
            products: DEFAULT_PRODUCTS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ClientConfig {
    /// 從 TOML 文字載入（未列出的欄位使用預設值）
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| AgroError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置 API 位址
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// 建構器模式：設置請求逾時
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// 建構器模式：設置防抖延遲
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// 建構器模式：設置切換畫面延遲
    pub fn with_navigate_delay_ms(mut self, ms: u64) -> Self {
        self.navigate_delay_ms = ms;
        self
    }

    /// 建構器模式：設置產品清單
    pub fn with_products(mut self, products: Vec<String>) -> Self {
        self.products = products;
        self
    }

    /// 以環境變數覆寫（若有設定）
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        self
    }

    /// 確保位址以 `/` 結尾，否則相對路徑會取代最後一段
    pub fn normalized_base_url(&self) -> String {
        let trimmed = self.base_url.trim();
        if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn navigate_delay(&self) -> Duration {
        Duration::from_millis(self.navigate_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// 檢查配置
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AgroError::Config(format!("API 位址必須為 http(s): {url}")));
        }
        if self.products.is_empty() {
            return Err(AgroError::Config("產品清單不可為空".to_string()));
        }
        if self.default_stock < Decimal::ZERO {
            return Err(AgroError::Config("預設庫存不可為負".to_string()));
        }
        Ok(())
    }
}
