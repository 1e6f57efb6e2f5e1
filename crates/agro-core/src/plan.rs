//! 採購計劃模型

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::projection::{ProjectionRow, SimulationResult};
use crate::AgroError;

/// 燃料/物流狀況
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FuelSituation {
    /// 正常（標準成本）
    Normal,
    /// 危急（成本上升）
    Critical,
    /// 嚴重（成本大幅上升）
    Severe,
}

impl FuelSituation {
    /// API 使用的代碼
    pub fn code(&self) -> u8 {
        match self {
            FuelSituation::Normal => 1,
            FuelSituation::Critical => 2,
            FuelSituation::Severe => 3,
        }
    }

    /// 顯示用描述
    pub fn description(&self) -> &'static str {
        match self {
            FuelSituation::Normal => "Normal (costos estándar)",
            FuelSituation::Critical => "Crítico (costos elevados)",
            FuelSituation::Severe => "Severo (costos muy elevados)",
        }
    }
}

impl Default for FuelSituation {
    fn default() -> Self {
        FuelSituation::Critical
    }
}

impl TryFrom<u8> for FuelSituation {
    type Error = AgroError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(FuelSituation::Normal),
            2 => Ok(FuelSituation::Critical),
            3 => Ok(FuelSituation::Severe),
            other => Err(AgroError::InvalidFuelSituation(other)),
        }
    }
}

impl From<FuelSituation> for u8 {
    fn from(fuel: FuelSituation) -> Self {
        fuel.code()
    }
}

impl fmt::Display for FuelSituation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 採購計劃請求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasePlanRequest {
    /// 現有庫存
    pub stock_actual: Decimal,

    /// 燃料狀況代碼
    pub situacion_combustible: FuelSituation,

    /// 已核准的銷售預測
    pub proyeccion_ventas: Vec<ProjectionRow>,
}

impl PurchasePlanRequest {
    /// 創建新的請求（尚無預測列）
    pub fn new(stock: Decimal, fuel: FuelSituation) -> Self {
        Self {
            stock_actual: stock,
            situacion_combustible: fuel,
            proyeccion_ventas: Vec::new(),
        }
    }

    /// 建構器模式：由預測結果轉換預測列
    pub fn with_results<'a>(mut self, results: impl IntoIterator<Item = &'a SimulationResult>) -> Self {
        self.proyeccion_ventas = results.into_iter().map(ProjectionRow::from).collect();
        self
    }

    pub fn rows(&self) -> &[ProjectionRow] {
        &self.proyeccion_ventas
    }
}

/// 採購計劃列（遠端計算結果）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasePlanEntry {
    #[serde(rename = "MES")]
    pub month: u8,

    #[serde(rename = "PRODUCTO")]
    pub product: String,

    #[serde(rename = "DEMANDA_PROYECTADA")]
    pub projected_demand: Decimal,

    #[serde(rename = "STOCK_INICIAL")]
    pub initial_stock: Decimal,

    #[serde(rename = "COMPRA_REQUERIDA")]
    pub required_purchase: Decimal,

    #[serde(rename = "STOCK_FINAL")]
    pub final_stock: Decimal,

    /// 物流提示（例如「提前 N 天下單」）
    #[serde(rename = "AVISO")]
    pub logistics_note: String,

    /// 建議文字，內容含 ALERTA / ADVERTENCIA 時需標示
    #[serde(rename = "RECOMENDACION")]
    pub recommendation: String,

    #[serde(rename = "LEAD_TIME_DIAS", default, skip_serializing_if = "Option::is_none")]
    pub lead_time_days: Option<u32>,

    #[serde(rename = "CANT_MIN_COMPRAS", default, skip_serializing_if = "Option::is_none")]
    pub minimum_order_qty: Option<Decimal>,

    #[serde(
        rename = "CANTIDAD_PROYECTADA_FINAL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub final_quantity: Option<Decimal>,

    #[serde(rename = "PRECIO_DE_COMPRA", default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<Decimal>,
}

impl PurchasePlanEntry {
    /// 依建議文字判斷列的嚴重程度
    pub fn severity(&self) -> RowSeverity {
        RowSeverity::classify(&self.recommendation)
    }

    /// 是否為警示或警告列
    pub fn is_flagged(&self) -> bool {
        self.severity() != RowSeverity::Normal
    }

    pub fn is_product(&self, product: &str) -> bool {
        self.product == product
    }

    /// 期末庫存水位
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::classify(self.final_stock)
    }

    /// 本月是否需要採購
    pub fn needs_purchase(&self) -> bool {
        self.required_purchase > Decimal::ZERO
    }
}

/// 期末庫存水位：低於 50 為 Low，低於 100 為 Medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockLevel {
    Low,
    Medium,
    Healthy,
}

impl StockLevel {
    pub const LOW_THRESHOLD: i64 = 50;
    pub const MEDIUM_THRESHOLD: i64 = 100;

    pub fn classify(final_stock: Decimal) -> Self {
        if final_stock < Decimal::from(Self::LOW_THRESHOLD) {
            StockLevel::Low
        } else if final_stock < Decimal::from(Self::MEDIUM_THRESHOLD) {
            StockLevel::Medium
        } else {
            StockLevel::Healthy
        }
    }
}

/// 列的標示程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowSeverity {
    /// 含「ALERTA」
    Alert,
    /// 含「ADVERTENCIA」
    Warning,
    Normal,
}

impl RowSeverity {
    pub const ALERT_MARKER: &'static str = "ALERTA";
    pub const WARNING_MARKER: &'static str = "ADVERTENCIA";

    /// 依文字內容分類（ALERTA 優先）
    pub fn classify(text: &str) -> Self {
        if text.contains(Self::ALERT_MARKER) {
            RowSeverity::Alert
        } else if text.contains(Self::WARNING_MARKER) {
            RowSeverity::Warning
        } else {
            RowSeverity::Normal
        }
    }
}

/// 採購計劃摘要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    /// 列數
    pub rows: usize,
    /// 預測需求總量
    pub total_demand: Decimal,
    /// 需採購總量
    pub total_required_purchase: Decimal,
    /// 期末庫存總量
    pub total_final_stock: Decimal,
    /// 警示/警告列數
    pub flagged_rows: usize,
}

impl PlanSummary {
    /// 對指定列計算摘要
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a PurchasePlanEntry>) -> Self {
        rows.into_iter().fold(Self::default(), |mut summary, row| {
            summary.rows += 1;
            summary.total_demand += row.projected_demand;
            summary.total_required_purchase += row.required_purchase;
            summary.total_final_stock += row.final_stock;
            if row.is_flagged() {
                summary.flagged_rows += 1;
            }
            summary
        })
    }
}

/// 依產品篩選計劃列（None 表示不篩選）
pub fn filter_by_product<'a>(
    rows: &'a [PurchasePlanEntry],
    product: Option<&'a str>,
) -> impl Iterator<Item = &'a PurchasePlanEntry> + 'a {
    rows.iter()
        .filter(move |row| product.map_or(true, |p| row.is_product(p)))
}
