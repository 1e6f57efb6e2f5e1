//! 銷售預測模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::scenario::{MonthlyScenarioInput, ScenarioGrid};

/// 預測請求列（產品 × 月份）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPayload {
    /// 產品名稱
    #[serde(rename = "PRODUCTO")]
    pub product: String,

    /// 該月的情境輸入
    #[serde(flatten)]
    pub input: MonthlyScenarioInput,
}

impl SimulationPayload {
    /// 創建新的預測請求列
    pub fn new(product: impl Into<String>, input: MonthlyScenarioInput) -> Self {
        Self {
            product: product.into(),
            input,
        }
    }

    /// 展開所有產品 × 十二個月（產品優先，月份依計劃順序）
    pub fn cross_product(products: &[String], grid: &ScenarioGrid) -> Vec<Self> {
        products
            .iter()
            .flat_map(|product| {
                grid.rows()
                    .iter()
                    .map(move |row| Self::new(product.clone(), row.clone()))
            })
            .collect()
    }
}

/// 遠端模型回傳的預測結果（唯讀）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    #[serde(rename = "MES")]
    pub month: u8,

    #[serde(rename = "PRODUCTO")]
    pub product: String,

    #[serde(rename = "CLIMA")]
    pub climate: u8,

    #[serde(rename = "FERIA")]
    pub fair: u8,

    #[serde(rename = "CAMBIO_PRECIO_PCT")]
    pub price_change_pct: Decimal,

    #[serde(rename = "CRECIMIENTO_ORGANICO")]
    pub organic_growth_pct: Decimal,

    /// 模型基礎預測量
    #[serde(rename = "CANTIDAD_PROYECTADA_IA_BASE")]
    pub base_quantity: Decimal,

    /// 套用價格與成長後的預測量
    #[serde(rename = "CANTIDAD_PROYECTADA_FINAL")]
    pub final_quantity: Decimal,

    #[serde(rename = "INGRESOS_PROYECTADOS")]
    pub projected_revenue: Decimal,

    #[serde(rename = "MARGEN_PROYECTADO")]
    pub projected_margin: Decimal,

    /// 提前期（天）
    #[serde(rename = "LEAD_TIME_DIAS")]
    pub lead_time_days: u32,

    /// 最小訂購量
    #[serde(rename = "CANT_MIN_COMPRAS")]
    pub minimum_order_qty: Decimal,

    /// 採購單價
    #[serde(rename = "PRECIO_DE_COMPRA")]
    pub purchase_price: Decimal,
}

impl SimulationResult {
    /// 檢查是否屬於指定產品
    pub fn is_product(&self, product: &str) -> bool {
        self.product == product
    }
}

/// 加總預測量
pub fn total_final_quantity<'a>(rows: impl IntoIterator<Item = &'a SimulationResult>) -> Decimal {
    rows.into_iter().map(|r| r.final_quantity).sum()
}

/// 採購計劃請求中的預測列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    #[serde(rename = "MES")]
    pub month: u8,

    #[serde(rename = "PRODUCTO")]
    pub product: String,

    #[serde(rename = "LEAD_TIME_DIAS")]
    pub lead_time_days: u32,

    #[serde(rename = "CANT_MIN_COMPRAS")]
    pub minimum_order_qty: Decimal,

    #[serde(rename = "CANTIDAD_PROYECTADA_FINAL")]
    pub final_quantity: Decimal,

    #[serde(rename = "PRECIO_DE_COMPRA")]
    pub purchase_price: Decimal,
}

impl From<&SimulationResult> for ProjectionRow {
    fn from(result: &SimulationResult) -> Self {
        Self {
            month: result.month,
            product: result.product.clone(),
            lead_time_days: result.lead_time_days,
            minimum_order_qty: result.minimum_order_qty,
            final_quantity: result.final_quantity,
            purchase_price: result.purchase_price,
        }
    }
}
