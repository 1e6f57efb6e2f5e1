//! 已核准情境的工作階段資料

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plan::PurchasePlanEntry;
use crate::projection::SimulationResult;
use crate::scenario::Scenario;

/// 工作階段 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 由模擬畫面交給計劃畫面的核准情境
///
/// `baseline` 保存核准時的完整預測結果，計劃畫面重新計算時以此為基礎。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedScenario {
    pub id: SessionId,
    pub scenario: Scenario,
    pub baseline: Vec<SimulationResult>,
    pub initial_plan: Vec<PurchasePlanEntry>,
    pub approved_at: DateTime<Utc>,
}

impl ApprovedScenario {
    /// 創建新的核准情境
    pub fn new(
        scenario: Scenario,
        baseline: Vec<SimulationResult>,
        initial_plan: Vec<PurchasePlanEntry>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            scenario,
            baseline,
            initial_plan,
            approved_at: Utc::now(),
        }
    }

    /// 預測結果中出現的產品（排序、不重複）
    pub fn products(&self) -> Vec<String> {
        self.baseline
            .iter()
            .map(|row| row.product.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// 指定產品的預測結果
    pub fn baseline_for<'a>(&'a self, product: &'a str) -> impl Iterator<Item = &'a SimulationResult> + 'a {
        self.baseline.iter().filter(move |row| row.is_product(product))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn result(product: &str, month: u8) -> SimulationResult {
        SimulationResult {
            month,
            product: product.to_string(),
            climate: 1,
            fair: 0,
            price_change_pct: Decimal::ZERO,
            organic_growth_pct: Decimal::ZERO,
            base_quantity: Decimal::from(50),
            final_quantity: Decimal::from(50),
            projected_revenue: Decimal::ZERO,
            projected_margin: Decimal::ZERO,
            lead_time_days: 30,
            minimum_order_qty: Decimal::from(10),
            purchase_price: Decimal::from(100),
        }
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_products_and_baseline_filter() {
        let approved = ApprovedScenario::new(
            Scenario::Conservador,
            vec![
                result("SEMILLA DE SORGO", 11),
                result("DEFENSIVOS", 11),
                result("SEMILLA DE SORGO", 12),
            ],
            Vec::new(),
        );

        assert_eq!(approved.products(), vec!["DEFENSIVOS", "SEMILLA DE SORGO"]);
        assert_eq!(approved.baseline_for("SEMILLA DE SORGO").count(), 2);
        assert_eq!(approved.baseline_for("HOMEPATIA").count(), 0);
    }
}
