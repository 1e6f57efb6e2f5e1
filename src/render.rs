//! 終端機文字輸出

use std::fmt::Write;

use agro_core::{
    FuelSituation, PlanSummary, PlanningCalendar, PurchasePlanEntry, RecommendationSet, Scenario, ScenarioGrid,
    StockLevel,
};
use agro_views::{ChartData, ChartKind, PlanRow, RecommendationSource, Status, StatusKind};
use rust_decimal::Decimal;

const BAR_WIDTH: u32 = 30;

pub fn status_line(status: &Status) -> String {
    let tag = match status.kind {
        StatusKind::Info => "INFO",
        StatusKind::Busy => "....",
        StatusKind::Success => " OK ",
        StatusKind::Warning => "WARN",
        StatusKind::Error => "ERR ",
    };
    format!("[{tag}] {}", status.text)
}

/// 情境輸入表格
pub fn grid(grid: &ScenarioGrid, calendar: &PlanningCalendar) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>3} {:<4} {:>5} {:>5} {:>8} {:>11}", "#", "Mes", "Clima", "Feria", "Precio%", "Crecimiento%");
    for (index, (row, label)) in grid.rows().iter().zip(calendar.labels()).enumerate() {
        let _ = writeln!(
            out,
            "{:>3} {:<4} {:>5} {:>5} {:>8} {:>11}",
            index,
            label,
            row.climate.get(),
            u8::from(row.fair),
            row.price_change_pct,
            row.organic_growth_pct
        );
    }
    out
}

/// 圖表：折線圖輸出數值表，長條圖輸出每月長條
pub fn chart(data: &ChartData) -> String {
    if data.is_empty() {
        return "(sin resultados)\n".to_string();
    }

    let mut out = String::new();
    match data.kind {
        ChartKind::Line => {
            let _ = write!(out, "{:<32}", "Serie");
            for label in &data.labels {
                let _ = write!(out, "{label:>7}");
            }
            out.push('\n');
            for series in &data.series {
                let _ = write!(out, "{:<32}", series.label);
                for value in &series.values {
                    let _ = write!(out, "{:>7}", value.round());
                }
                out.push('\n');
            }
        }
        ChartKind::Bar => {
            let max = data
                .series
                .iter()
                .flat_map(|s| s.values.iter().copied())
                .max()
                .unwrap_or(Decimal::ZERO);
            for series in &data.series {
                let _ = writeln!(out, "{}", series.label);
                for (label, value) in data.labels.iter().zip(&series.values) {
                    let _ = writeln!(out, "  {label:<4} {:<width$} {}", bar(*value, max), value.round(), width = BAR_WIDTH as usize);
                }
            }
        }
    }
    out
}

fn bar(value: Decimal, max: Decimal) -> String {
    if max <= Decimal::ZERO || value <= Decimal::ZERO {
        return String::new();
    }
    let scaled = (value * Decimal::from(BAR_WIDTH) / max).round();
    let len = u32::try_from(scaled.mantissa()).unwrap_or(0).min(BAR_WIDTH);
    "#".repeat(len as usize)
}

pub fn recommendations(set: &RecommendationSet, source: RecommendationSource) -> String {
    let mut out = String::new();
    if source == RecommendationSource::Fallback {
        out.push_str("(recomendaciones locales)\n");
    }
    for (scenario, text) in set.iter() {
        let _ = writeln!(out, "{:<12} {}", scenario.label(), text);
    }
    out
}

/// 計劃畫面的參數列
pub fn plan_parameters(scenario: Scenario, stock: Decimal, fuel: FuelSituation, recalculating: bool) -> String {
    let mut line = format!(
        "Escenario aprobado: {} | Stock: {} | Combustible: {} ({})",
        scenario.label(),
        stock,
        fuel.code(),
        fuel.description()
    );
    if recalculating {
        line.push_str(" | Recalculando...");
    }
    line
}

/// 需採購時加上「+」
fn purchase_cell(entry: &PurchasePlanEntry) -> String {
    if entry.needs_purchase() {
        format!("+{}", entry.required_purchase)
    } else {
        entry.required_purchase.to_string()
    }
}

/// 庫存偏低加「!」，過低加「!!」
fn stock_cell(entry: &PurchasePlanEntry) -> String {
    let mark = match entry.stock_level() {
        StockLevel::Low => "!!",
        StockLevel::Medium => "!",
        StockLevel::Healthy => "",
    };
    format!("{}{mark}", entry.final_stock)
}

/// 採購計劃摘要與表格
pub fn plan(summary: &PlanSummary, rows: &[PlanRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Demanda total: {} | Compra requerida: {} | Stock final: {} | Alertas: {}",
        summary.total_demand, summary.total_required_purchase, summary.total_final_stock, summary.flagged_rows
    );
    let _ = writeln!(
        out,
        "  {:<4} {:<22} {:>8} {:>8} {:>8} {:>8}  {:<22} {}",
        "Mes", "Producto", "Demanda", "Inicial", "Compra", "Final", "Aviso", "Recomendación"
    );
    for row in rows {
        let marker = match row.severity {
            agro_core::RowSeverity::Alert => "!!",
            agro_core::RowSeverity::Warning => " !",
            agro_core::RowSeverity::Normal => "  ",
        };
        let e = &row.entry;
        let month = agro_core::calendar::month_label(e.month).unwrap_or("?");
        let _ = writeln!(
            out,
            "{marker}{:<4} {:<22} {:>8} {:>8} {:>8} {:>8}  {:<22} {}",
            month,
            e.product,
            e.projected_demand,
            e.initial_stock,
            purchase_cell(e),
            stock_cell(e),
            e.logistics_note,
            e.recommendation
        );
    }
    out
}
