//! 模擬結果圖表資料

use std::str::FromStr;

use agro_core::{AgroError, PlanningCalendar, Scenario, ScenarioMap, SimulationResult};
use rust_decimal::Decimal;

/// 圖表類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
}

impl FromStr for ChartKind {
    type Err = AgroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" | "linea" | "línea" => Ok(ChartKind::Line),
            "bar" | "barras" => Ok(ChartKind::Bar),
            other => Err(AgroError::UnknownField(other.to_string())),
        }
    }
}

/// 單一數列：某情境（與產品）十二個月的預測量
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub scenario: Scenario,
    /// None 表示所選產品的數列
    pub product: Option<String>,
    pub label: String,
    pub values: Vec<Decimal>,
}

impl ChartSeries {
    pub fn total(&self) -> Decimal {
        self.values.iter().copied().sum()
    }
}

/// 圖表資料
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub kind: ChartKind,
    /// 計劃順序的月份標籤
    pub labels: Vec<&'static str>,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// 建立圖表資料
///
/// 選定產品時每個情境一條數列；未選定時每個（情境, 產品）一條。
/// 每個點是該月份 `CANTIDAD_PROYECTADA_FINAL` 的總和，尚無結果的情境略過。
pub fn build_chart(
    results: &ScenarioMap<Option<Vec<SimulationResult>>>,
    product: Option<&str>,
    calendar: &PlanningCalendar,
    kind: ChartKind,
) -> ChartData {
    let months = calendar.months();
    let mut series = Vec::new();

    for (scenario, rows) in results.iter() {
        let Some(rows) = rows else { continue };

        match product {
            Some(product) => series.push(ChartSeries {
                scenario,
                product: None,
                label: scenario.label().to_string(),
                values: monthly_totals(rows, product, &months),
            }),
            None => {
                for name in products_in_order(rows) {
                    series.push(ChartSeries {
                        scenario,
                        label: format!("{} - {}", scenario.label(), name),
                        values: monthly_totals(rows, &name, &months),
                        product: Some(name),
                    });
                }
            }
        }
    }

    ChartData {
        kind,
        labels: calendar.labels().to_vec(),
        series,
    }
}

fn monthly_totals(rows: &[SimulationResult], product: &str, months: &[u8; 12]) -> Vec<Decimal> {
    months
        .iter()
        .map(|&month| {
            rows.iter()
                .filter(|r| r.month == month && r.is_product(product))
                .map(|r| r.final_quantity)
                .sum()
        })
        .collect()
}

/// 依首次出現順序列出產品
fn products_in_order(rows: &[SimulationResult]) -> Vec<String> {
    let mut products: Vec<String> = Vec::new();
    for row in rows {
        if !products.iter().any(|p| p == &row.product) {
            products.push(row.product.clone());
        }
    }
    products
}
