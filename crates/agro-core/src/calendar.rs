//! 計劃年度日曆模型

use chrono::Month;

/// 月份的西班牙文簡稱（索引 0 = 一月）
const MONTH_LABELS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// 計劃年度日曆
///
/// 農業銷售年度從十一月開始，十二個月依序為 11, 12, 1, …, 10。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanningCalendar {
    /// 年度起始月份
    start: Month,
}

impl PlanningCalendar {
    /// 創建以指定月份起始的日曆
    pub fn new(start: Month) -> Self {
        Self { start }
    }

    /// 起始月份
    pub fn start(&self) -> Month {
        self.start
    }

    /// 計劃年度的月份代碼（1–12），依計劃順序排列
    pub fn months(&self) -> [u8; 12] {
        let first = self.start.number_from_month() as u8;
        let mut months = [0u8; 12];
        for (offset, slot) in months.iter_mut().enumerate() {
            *slot = ((first - 1 + offset as u8) % 12) + 1;
        }
        months
    }

    /// 依計劃順序的月份標籤
    pub fn labels(&self) -> [&'static str; 12] {
        self.months().map(|month| MONTH_LABELS[usize::from(month - 1)])
    }

    /// 月份代碼在計劃年度中的位置
    pub fn position(&self, month: u8) -> Option<usize> {
        self.months().iter().position(|&m| m == month)
    }

    /// 指定位置的月份代碼
    pub fn month_at(&self, index: usize) -> Option<u8> {
        self.months().get(index).copied()
    }
}

impl Default for PlanningCalendar {
    fn default() -> Self {
        Self::new(Month::November)
    }
}

/// 月份代碼的標籤（無效代碼回傳 None）
pub fn month_label(month: u8) -> Option<&'static str> {
    match month {
        1..=12 => Some(MONTH_LABELS[usize::from(month - 1)]),
        _ => None,
    }
}
