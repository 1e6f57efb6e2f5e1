//! 情境輸入模型

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::PlanningCalendar;
use crate::{AgroError, Result};

/// 規劃情境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// 最差情境
    Peor,
    /// 保守情境
    Conservador,
    /// 最佳情境
    Mejor,
}

impl Scenario {
    /// 所有情境（執行順序）
    pub const ALL: [Scenario; 3] = [Scenario::Peor, Scenario::Conservador, Scenario::Mejor];

    /// API 使用的鍵名
    pub fn key(&self) -> &'static str {
        match self {
            Scenario::Peor => "peor",
            Scenario::Conservador => "conservador",
            Scenario::Mejor => "mejor",
        }
    }

    /// 顯示用標籤
    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Peor => "Peor",
            Scenario::Conservador => "Conservador",
            Scenario::Mejor => "Mejor",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Scenario {
    type Err = AgroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "peor" | "worst" => Ok(Scenario::Peor),
            "conservador" | "conservative" => Ok(Scenario::Conservador),
            "mejor" | "best" => Ok(Scenario::Mejor),
            other => Err(AgroError::UnknownScenario(other.to_string())),
        }
    }
}

/// 依情境索引的容器
///
/// 欄位名稱與 API 的 `{peor, conservador, mejor}` 物件一致，可直接序列化。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMap<T> {
    pub peor: T,
    pub conservador: T,
    pub mejor: T,
}

impl<T> ScenarioMap<T> {
    /// 以函數為每個情境建立值
    pub fn from_fn(mut f: impl FnMut(Scenario) -> T) -> Self {
        Self {
            peor: f(Scenario::Peor),
            conservador: f(Scenario::Conservador),
            mejor: f(Scenario::Mejor),
        }
    }

    pub fn get(&self, scenario: Scenario) -> &T {
        match scenario {
            Scenario::Peor => &self.peor,
            Scenario::Conservador => &self.conservador,
            Scenario::Mejor => &self.mejor,
        }
    }

    pub fn get_mut(&mut self, scenario: Scenario) -> &mut T {
        match scenario {
            Scenario::Peor => &mut self.peor,
            Scenario::Conservador => &mut self.conservador,
            Scenario::Mejor => &mut self.mejor,
        }
    }

    /// 依執行順序迭代
    pub fn iter(&self) -> impl Iterator<Item = (Scenario, &T)> + '_ {
        Scenario::ALL.into_iter().map(move |s| (s, self.get(s)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(Scenario, &T) -> U) -> ScenarioMap<U> {
        ScenarioMap::from_fn(|s| f(s, self.get(s)))
    }
}

/// 氣候代碼（1–3）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ClimateCode(u8);

impl ClimateCode {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 3;

    pub fn new(code: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&code) {
            Ok(Self(code))
        } else {
            Err(AgroError::InvalidClimate(code))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ClimateCode {
    type Error = AgroError;

    fn try_from(code: u8) -> Result<Self> {
        Self::new(code)
    }
}

impl From<ClimateCode> for u8 {
    fn from(code: ClimateCode) -> Self {
        code.0
    }
}

/// 展會旗標以 0/1 傳輸
pub(crate) mod fair_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*flag))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(serde::de::Error::custom(crate::AgroError::InvalidFairFlag(other))),
        }
    }
}

/// 可編輯的月份欄位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthField {
    Climate,
    Fair,
    PriceChangePct,
    OrganicGrowthPct,
}

impl MonthField {
    /// API 欄位名稱
    pub fn wire_name(&self) -> &'static str {
        match self {
            MonthField::Climate => "CLIMA",
            MonthField::Fair => "FERIA",
            MonthField::PriceChangePct => "CAMBIO_PRECIO_PCT",
            MonthField::OrganicGrowthPct => "CRECIMIENTO_ORGANICO",
        }
    }
}

impl FromStr for MonthField {
    type Err = AgroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "clima" | "climate" => Ok(MonthField::Climate),
            "feria" | "fair" => Ok(MonthField::Fair),
            "precio" | "cambio_precio_pct" | "price" => Ok(MonthField::PriceChangePct),
            "crecimiento" | "crecimiento_organico" | "growth" => {
                Ok(MonthField::OrganicGrowthPct)
            }
            other => Err(AgroError::UnknownField(other.to_string())),
        }
    }
}

/// 單月情境輸入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyScenarioInput {
    /// 月份（1–12）
    #[serde(rename = "MES")]
    pub month: u8,

    /// 氣候代碼
    #[serde(rename = "CLIMA")]
    pub climate: ClimateCode,

    /// 是否有展會/活動
    #[serde(rename = "FERIA", with = "fair_flag")]
    pub fair: bool,

    /// 價格變動百分比（可為負）
    #[serde(rename = "CAMBIO_PRECIO_PCT")]
    pub price_change_pct: Decimal,

    /// 自然成長百分比
    #[serde(rename = "CRECIMIENTO_ORGANICO")]
    pub organic_growth_pct: Decimal,
}

impl MonthlyScenarioInput {
    /// 創建新的月份輸入（中性數值）
    pub fn new(month: u8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(AgroError::InvalidMonth(month));
        }
        Ok(Self::neutral(month))
    }

    fn neutral(month: u8) -> Self {
        Self {
            month,
            climate: ClimateCode(ClimateCode::MIN),
            fair: false,
            price_change_pct: Decimal::ZERO,
            organic_growth_pct: Decimal::ZERO,
        }
    }

    /// 隨機預設值：氣候 1–3、展會 0/1、價格 -20..=20、成長 0..=10
    pub fn random<R: Rng + ?Sized>(month: u8, rng: &mut R) -> Result<Self> {
        let mut input = Self::new(month)?;
        input.randomize(rng);
        Ok(input)
    }

    fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.climate = ClimateCode(rng.gen_range(ClimateCode::MIN..=ClimateCode::MAX));
        self.fair = rng.gen_bool(0.5);
        self.price_change_pct = Decimal::from(rng.gen_range(-20i32..=20));
        self.organic_growth_pct = Decimal::from(rng.gen_range(0i32..=10));
    }

    /// 建構器模式：設置氣候
    pub fn with_climate(mut self, climate: ClimateCode) -> Self {
        self.climate = climate;
        self
    }

    /// 建構器模式：設置展會旗標
    pub fn with_fair(mut self, fair: bool) -> Self {
        self.fair = fair;
        self
    }

    /// 建構器模式：設置價格變動
    pub fn with_price_change_pct(mut self, pct: Decimal) -> Self {
        self.price_change_pct = pct;
        self
    }

    /// 建構器模式：設置自然成長
    pub fn with_organic_growth_pct(mut self, pct: Decimal) -> Self {
        self.organic_growth_pct = pct;
        self
    }

    /// 更新單一欄位（僅套用數字輸入本身的限制）
    pub fn set(&mut self, field: MonthField, value: Decimal) -> Result<()> {
        let invalid = || AgroError::InvalidFieldValue {
            field: field.wire_name(),
            value,
        };

        match field {
            MonthField::Climate => {
                let code = whole_u8(value).ok_or_else(invalid)?;
                self.climate = ClimateCode::new(code)?;
            }
            MonthField::Fair => {
                self.fair = match whole_u8(value) {
                    Some(0) => false,
                    Some(1) => true,
                    _ => return Err(invalid()),
                };
            }
            MonthField::PriceChangePct => self.price_change_pct = value,
            MonthField::OrganicGrowthPct => self.organic_growth_pct = value,
        }
        Ok(())
    }
}

fn whole_u8(value: Decimal) -> Option<u8> {
    if value.fract().is_zero() {
        value.to_u8()
    } else {
        None
    }
}

/// 單一情境的十二個月輸入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioGrid {
    rows: Vec<MonthlyScenarioInput>,
}

impl ScenarioGrid {
    /// 以中性數值建立
    pub fn neutral(calendar: &PlanningCalendar) -> Self {
        Self {
            rows: calendar
                .months()
                .into_iter()
                .map(MonthlyScenarioInput::neutral)
                .collect(),
        }
    }

    /// 以隨機預設值建立
    pub fn random<R: Rng + ?Sized>(calendar: &PlanningCalendar, rng: &mut R) -> Self {
        let mut grid = Self::neutral(calendar);
        for row in &mut grid.rows {
            row.randomize(rng);
        }
        grid
    }

    pub fn rows(&self) -> &[MonthlyScenarioInput] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&MonthlyScenarioInput> {
        self.rows.get(index)
    }

    /// 更新指定月份（計劃順序索引）的欄位
    pub fn update(&mut self, index: usize, field: MonthField, value: Decimal) -> Result<()> {
        self.rows
            .get_mut(index)
            .ok_or(AgroError::InvalidMonthIndex(index))?
            .set(field, value)
    }

    /// 以自訂函數改寫所有月份
    pub fn apply(mut self, mut f: impl FnMut(&mut MonthlyScenarioInput)) -> Self {
        self.rows.iter_mut().for_each(|row| f(row));
        self
    }
}
