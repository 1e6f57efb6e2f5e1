//! 預測服務介面

use agro_core::{
    PurchasePlanEntry, PurchasePlanRequest, RecommendationRequest, RecommendationSet,
    SimulationPayload, SimulationResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 上傳 CSV 的回應
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadAck {
    #[serde(default)]
    pub status: Option<String>,
}

/// 訓練完成的回應
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainStatus {
    pub status: String,
}

/// 遠端預測服務
///
/// 五個端點各自對應一個方法；畫面狀態只透過此介面與後端互動。
#[async_trait]
pub trait ForecastApi: Send + Sync {
    /// 上傳歷史銷售 CSV（multipart 欄位 `file`）
    async fn upload(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadAck>;

    /// 以最近上傳的資料訓練模型
    async fn train(&self) -> Result<TrainStatus>;

    /// 對產品 × 月份的情境輸入取得預測
    async fn simulate_projection(&self, payload: &[SimulationPayload]) -> Result<Vec<SimulationResult>>;

    /// 依三個情境的結果取得建議文字
    async fn recommendations(&self, results: &RecommendationRequest) -> Result<RecommendationSet>;

    /// 計算採購計劃
    async fn purchase_plan(&self, request: &PurchasePlanRequest) -> Result<Vec<PurchasePlanEntry>>;
}
