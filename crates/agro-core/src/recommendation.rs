//! 情境建議

use rust_decimal::Decimal;

use crate::projection::{total_final_quantity, SimulationResult};
use crate::scenario::{Scenario, ScenarioMap};

/// 三個情境的建議文字
pub type RecommendationSet = ScenarioMap<String>;

/// 建議請求：三個情境的完整預測結果
pub type RecommendationRequest = ScenarioMap<Vec<SimulationResult>>;

/// 本地備援倍數（以保守情境總量為基準）
pub fn fallback_factor(scenario: Scenario) -> Decimal {
    match scenario {
        Scenario::Peor => Decimal::new(75, 2),
        Scenario::Conservador => Decimal::ONE,
        Scenario::Mejor => Decimal::new(125, 2),
    }
}

/// 四捨五入到整數（0.5 向正無限大進位）
pub fn round_half_up(value: Decimal) -> Decimal {
    (value + Decimal::new(5, 1)).floor().normalize()
}

/// 遠端建議服務失敗時的本地備援文字
pub fn fallback_recommendations(conservative: &[SimulationResult]) -> RecommendationSet {
    let total = total_final_quantity(conservative);
    ScenarioMap::from_fn(|scenario| {
        let volume = round_half_up(total * fallback_factor(scenario));
        format!(
            "Se proyecta un volumen de {} unidades para el escenario {}.",
            volume,
            scenario.label()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn result(final_quantity: Decimal) -> SimulationResult {
        SimulationResult {
            month: 11,
            product: "SEMILLA DE MAIZ".to_string(),
            climate: 1,
            fair: 0,
            price_change_pct: Decimal::ZERO,
            organic_growth_pct: Decimal::ZERO,
            base_quantity: final_quantity,
            final_quantity,
            projected_revenue: Decimal::ZERO,
            projected_margin: Decimal::ZERO,
            lead_time_days: 30,
            minimum_order_qty: Decimal::from(10),
            purchase_price: Decimal::from(100),
        }
    }

    #[rstest]
    #[case(Decimal::new(25, 1), Decimal::from(3))]
    #[case(Decimal::new(24, 1), Decimal::from(2))]
    #[case(Decimal::new(-25, 1), Decimal::from(-2))]
    #[case(Decimal::from(600), Decimal::from(600))]
    fn test_round_half_up(#[case] value: Decimal, #[case] expected: Decimal) {
        assert_eq!(round_half_up(value), expected);
    }

    #[test]
    fn test_fallback_scales_conservative_total() {
        let rows: Vec<SimulationResult> = (0..12).map(|_| result(Decimal::from(50))).collect();
        let set = fallback_recommendations(&rows);

        assert_eq!(
            set.peor,
            "Se proyecta un volumen de 450 unidades para el escenario Peor."
        );
        assert_eq!(
            set.conservador,
            "Se proyecta un volumen de 600 unidades para el escenario Conservador."
        );
        assert_eq!(
            set.mejor,
            "Se proyecta un volumen de 750 unidades para el escenario Mejor."
        );
    }

    #[test]
    fn test_fallback_rounds_fractional_volumes() {
        // 0.75 × 11 = 8.25 → 8，1.25 × 11 = 13.75 → 14
        let set = fallback_recommendations(&[result(Decimal::from(11))]);
        assert!(set.peor.contains(" 8 unidades"));
        assert!(set.mejor.contains(" 14 unidades"));
    }

    #[test]
    fn test_fallback_with_no_rows() {
        let set = fallback_recommendations(&[]);
        assert!(set.conservador.contains(" 0 unidades"));
    }
}
