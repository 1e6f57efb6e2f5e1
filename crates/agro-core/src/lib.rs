//! # Agro Core
//!
//! 核心資料模型與類型定義（情境輸入、預測結果、採購計劃）

pub mod calendar;
pub mod config;
pub mod plan;
pub mod projection;
pub mod recommendation;
pub mod scenario;
pub mod session;

// Re-export 主要類型
pub use calendar::PlanningCalendar;
pub use config::ClientConfig;
pub use plan::{
    FuelSituation, PlanSummary, PurchasePlanEntry, PurchasePlanRequest, RowSeverity, StockLevel,
};
pub use projection::{ProjectionRow, SimulationPayload, SimulationResult};
pub use recommendation::{RecommendationRequest, RecommendationSet};
pub use scenario::{
    ClimateCode, MonthField, MonthlyScenarioInput, Scenario, ScenarioGrid, ScenarioMap,
};
pub use session::{ApprovedScenario, SessionId};

use rust_decimal::Decimal;

/// 核心錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum AgroError {
    #[error("無效的月份: {0}")]
    InvalidMonth(u8),

    #[error("無效的月份索引: {0}（必須小於 12）")]
    InvalidMonthIndex(usize),

    #[error("無效的氣候代碼: {0}（必須介於 1 到 3）")]
    InvalidClimate(u8),

    #[error("無效的展會旗標: {0}（必須為 0 或 1）")]
    InvalidFairFlag(u8),

    #[error("無效的燃料狀況代碼: {0}（必須介於 1 到 3）")]
    InvalidFuelSituation(u8),

    #[error("欄位 {field} 的數值無效: {value}")]
    InvalidFieldValue { field: &'static str, value: Decimal },

    #[error("未知的情境: {0}")]
    UnknownScenario(String),

    #[error("未知的欄位: {0}")]
    UnknownField(String),

    #[error("未知的產品: {0}")]
    UnknownProduct(String),

    #[error("配置錯誤: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AgroError>;
