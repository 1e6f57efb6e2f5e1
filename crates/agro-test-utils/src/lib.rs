//! # Agro Test Utils
//!
//! 預測服務的記錄型假實作與測試資料

use std::collections::HashMap;
use std::time::Duration;

use agro_client::{ApiError, ForecastApi, Result, TrainStatus, UploadAck};
use agro_core::recommendation::round_half_up;
use agro_core::{
    FuelSituation, PurchasePlanEntry, PurchasePlanRequest, RecommendationRequest,
    RecommendationSet, SimulationPayload, SimulationResult,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

/// 假服務的模型基礎預測量
pub const BASE_QUANTITY: i64 = 50;
/// 假服務的提前期
pub const LEAD_TIME_DAYS: u32 = 30;
/// 假服務的最小訂購量
pub const MINIMUM_ORDER_QTY: i64 = 10;
/// 假服務的採購單價
pub const PURCHASE_PRICE: i64 = 100;
/// 假服務的銷售單價
pub const SALE_PRICE: i64 = 150;

/// 端點
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Upload,
    Train,
    SimulateProjection,
    Recommendations,
    PurchasePlan,
}

/// 已記錄的呼叫
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Upload { file_name: String, bytes: usize },
    Train,
    SimulateProjection(Vec<SimulationPayload>),
    Recommendations(RecommendationRequest),
    PurchasePlan(PurchasePlanRequest),
}

impl ApiCall {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            ApiCall::Upload { .. } => Endpoint::Upload,
            ApiCall::Train => Endpoint::Train,
            ApiCall::SimulateProjection(_) => Endpoint::SimulateProjection,
            ApiCall::Recommendations(_) => Endpoint::Recommendations,
            ApiCall::PurchasePlan(_) => Endpoint::PurchasePlan,
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<ApiCall>,
    counts: HashMap<Endpoint, usize>,
    /// (端點, 第 n 次呼叫) → 錯誤訊息
    failures: HashMap<(Endpoint, usize), String>,
    always_fail: HashMap<Endpoint, String>,
    delays: HashMap<Endpoint, Duration>,
    nth_delays: HashMap<(Endpoint, usize), Duration>,
    train_status: Option<String>,
}

/// 記錄所有呼叫的假預測服務
///
/// 計算結果固定可預測；可指定特定呼叫失敗或延遲（延遲使用 tokio 時間，可配合暫停時鐘）。
#[derive(Debug, Default)]
pub struct FakeForecastApi {
    state: Mutex<FakeState>,
}

impl FakeForecastApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：第 `nth` 次（從 1 起算）呼叫該端點時回傳錯誤
    pub fn with_failure(self, endpoint: Endpoint, nth: usize, message: impl Into<String>) -> Self {
        self.state.lock().failures.insert((endpoint, nth), message.into());
        self
    }

    /// 建構器模式：該端點每次呼叫都回傳錯誤
    pub fn with_permanent_failure(self, endpoint: Endpoint, message: impl Into<String>) -> Self {
        self.state.lock().always_fail.insert(endpoint, message.into());
        self
    }

    /// 建構器模式：該端點每次呼叫前等待
    pub fn with_delay(self, endpoint: Endpoint, delay: Duration) -> Self {
        self.state.lock().delays.insert(endpoint, delay);
        self
    }

    /// 建構器模式：第 `nth` 次呼叫前等待（優先於一般延遲）
    pub fn with_nth_delay(self, endpoint: Endpoint, nth: usize, delay: Duration) -> Self {
        self.state.lock().nth_delays.insert((endpoint, nth), delay);
        self
    }

    /// 建構器模式：設置訓練回應的狀態文字
    pub fn with_train_status(self, status: impl Into<String>) -> Self {
        self.state.lock().train_status = Some(status.into());
        self
    }

    /// 所有呼叫（依呼叫順序）
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.state.lock().calls.iter().map(ApiCall::endpoint).collect()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.state.lock().counts.get(&endpoint).copied().unwrap_or(0)
    }

    /// 所有預測請求
    pub fn projection_requests(&self) -> Vec<Vec<SimulationPayload>> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::SimulateProjection(payload) => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// 所有採購計劃請求
    pub fn purchase_plan_requests(&self) -> Vec<PurchasePlanRequest> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::PurchasePlan(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// 記錄呼叫，回傳需等待的時間與（若有）預設錯誤
    fn record(&self, call: ApiCall) -> (Option<Duration>, Option<ApiError>) {
        let endpoint = call.endpoint();
        let mut state = self.state.lock();
        state.calls.push(call);
        let nth = {
            let count = state.counts.entry(endpoint).or_insert(0);
            *count += 1;
            *count
        };

        let delay = state
            .nth_delays
            .get(&(endpoint, nth))
            .or_else(|| state.delays.get(&endpoint))
            .copied();
        let failure = state
            .failures
            .get(&(endpoint, nth))
            .or_else(|| state.always_fail.get(&endpoint))
            .map(|message| ApiError::Remote {
                status: 400,
                message: Some(message.clone()),
            });
        (delay, failure)
    }

    async fn enter(&self, call: ApiCall) -> Result<()> {
        let (delay, failure) = self.record(call);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ForecastApi for FakeForecastApi {
    async fn upload(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadAck> {
        self.enter(ApiCall::Upload {
            file_name: file_name.to_string(),
            bytes: contents.len(),
        })
        .await?;
        Ok(UploadAck {
            status: Some("Archivo subido".to_string()),
        })
    }

    async fn train(&self) -> Result<TrainStatus> {
        self.enter(ApiCall::Train).await?;
        let status = self
            .state
            .lock()
            .train_status
            .clone()
            .unwrap_or_else(|| "Modelo entrenado con éxito".to_string());
        Ok(TrainStatus { status })
    }

    async fn simulate_projection(&self, payload: &[SimulationPayload]) -> Result<Vec<SimulationResult>> {
        self.enter(ApiCall::SimulateProjection(payload.to_vec())).await?;
        Ok(payload.iter().map(project).collect())
    }

    async fn recommendations(&self, results: &RecommendationRequest) -> Result<RecommendationSet> {
        self.enter(ApiCall::Recommendations(results.clone())).await?;
        Ok(results.map(|scenario, rows| {
            let total: Decimal = rows.iter().map(|r| r.final_quantity).sum();
            format!("Escenario {}: {} unidades proyectadas.", scenario.label(), total)
        }))
    }

    async fn purchase_plan(&self, request: &PurchasePlanRequest) -> Result<Vec<PurchasePlanEntry>> {
        self.enter(ApiCall::PurchasePlan(request.clone())).await?;
        Ok(plan(request))
    }
}

/// 假預測：基礎量固定，最終量 = 基礎量 × (1 + 成長%)
pub fn project(payload: &SimulationPayload) -> SimulationResult {
    let input = &payload.input;
    let base = Decimal::from(BASE_QUANTITY);
    let hundred = Decimal::ONE_HUNDRED;
    let final_quantity = round_half_up(base * (Decimal::ONE + input.organic_growth_pct / hundred));
    let sale_price = Decimal::from(SALE_PRICE) * (Decimal::ONE + input.price_change_pct / hundred);
    let revenue = (final_quantity * sale_price).round_dp(2);
    let margin = (revenue - final_quantity * Decimal::from(PURCHASE_PRICE)).round_dp(2);

    SimulationResult {
        month: input.month,
        product: payload.product.clone(),
        climate: input.climate.get(),
        fair: u8::from(input.fair),
        price_change_pct: input.price_change_pct,
        organic_growth_pct: input.organic_growth_pct,
        base_quantity: base,
        final_quantity,
        projected_revenue: revenue,
        projected_margin: margin,
        lead_time_days: LEAD_TIME_DAYS,
        minimum_order_qty: Decimal::from(MINIMUM_ORDER_QTY),
        purchase_price: Decimal::from(PURCHASE_PRICE),
    }
}

/// 假採購計劃：逐列扣減需求，庫存不足時依最小訂購量向上取整採購
pub fn plan(request: &PurchasePlanRequest) -> Vec<PurchasePlanEntry> {
    let mut stock = request.stock_actual;
    let extra_lead = match request.situacion_combustible {
        FuelSituation::Critical => 15,
        _ => 0,
    };

    request
        .proyeccion_ventas
        .iter()
        .map(|row| {
            let demand = row.final_quantity;
            let initial = stock;
            let purchase = if initial < demand {
                round_up_to_moq(demand - initial, row.minimum_order_qty)
            } else {
                Decimal::ZERO
            };
            let final_stock = initial + purchase - demand;
            stock = final_stock;

            let recommendation = if final_stock < Decimal::ZERO {
                format!("¡ALERTA! Quiebre de stock. Faltan {} uds. Aumentar compra.", final_stock.abs())
            } else if final_stock < demand * Decimal::new(2, 1) {
                format!("ADVERTENCIA: Stock final bajo ({final_stock} uds). Riesgo de quiebre.")
            } else if purchase > Decimal::ZERO {
                format!("OK. Pedido requerido. Costo: ${}", (purchase * row.purchase_price).round())
            } else {
                "OK. Stock suficiente.".to_string()
            };

            PurchasePlanEntry {
                month: row.month,
                product: row.product.clone(),
                projected_demand: demand,
                initial_stock: initial,
                required_purchase: purchase,
                final_stock,
                logistics_note: format!("Pedir {} días antes", row.lead_time_days + extra_lead),
                recommendation,
                lead_time_days: None,
                minimum_order_qty: None,
                final_quantity: None,
                purchase_price: None,
            }
        })
        .collect()
}

fn round_up_to_moq(shortfall: Decimal, moq: Decimal) -> Decimal {
    if moq <= Decimal::ZERO {
        return shortfall;
    }
    if shortfall < moq {
        return moq;
    }
    let remainder = shortfall % moq;
    if remainder > Decimal::ZERO {
        shortfall - remainder + moq
    } else {
        shortfall
    }
}

/// 測試資料：指定產品與每月最終預測量的結果列（月份依計劃順序）
pub fn projection_rows(product: &str, demands: &[i64]) -> Vec<SimulationResult> {
    const MONTHS: [u8; 12] = [11, 12, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
    demands
        .iter()
        .zip(MONTHS.iter().cycle())
        .map(|(&demand, &month)| SimulationResult {
            month,
            product: product.to_string(),
            climate: 1,
            fair: 0,
            price_change_pct: Decimal::ZERO,
            organic_growth_pct: Decimal::ZERO,
            base_quantity: Decimal::from(demand),
            final_quantity: Decimal::from(demand),
            projected_revenue: Decimal::from(demand * SALE_PRICE),
            projected_margin: Decimal::from(demand * (SALE_PRICE - PURCHASE_PRICE)),
            lead_time_days: LEAD_TIME_DAYS,
            minimum_order_qty: Decimal::from(MINIMUM_ORDER_QTY),
            purchase_price: Decimal::from(PURCHASE_PRICE),
        })
        .collect()
}

/// 測試資料：單一採購計劃列
pub fn plan_entry(product: &str, month: u8, demand: i64, final_stock: i64, recommendation: &str) -> PurchasePlanEntry {
    PurchasePlanEntry {
        month,
        product: product.to_string(),
        projected_demand: Decimal::from(demand),
        initial_stock: Decimal::from(final_stock + demand),
        required_purchase: Decimal::ZERO,
        final_stock: Decimal::from(final_stock),
        logistics_note: format!("Pedir {LEAD_TIME_DAYS} días antes"),
        recommendation: recommendation.to_string(),
        lead_time_days: None,
        minimum_order_qty: None,
        final_quantity: None,
        purchase_price: None,
    }
}
