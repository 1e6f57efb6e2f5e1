//! # Agro Views
//!
//! 三個畫面（設定、模擬、採購計劃）的狀態機、防抖計時器與導覽

pub mod chart;
pub mod debounce;
pub mod guard;
pub mod plan;
pub mod router;
pub mod session;
pub mod setup;
pub mod simulator;

pub use chart::{ChartData, ChartKind, ChartSeries};
pub use debounce::Debouncer;
pub use guard::{RequestGuard, RequestTicket};
pub use plan::{PlanOutcome, PlanRow, PlanScreen, PlanView};
pub use router::{Navigation, Route, Router};
pub use session::SessionStore;
pub use setup::SetupView;
pub use simulator::{RecommendationSource, RunOutcome, ScenarioPhase, SimulatorView};

use std::fmt;

/// 狀態訊息的種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    /// 請求進行中
    Busy,
    Success,
    /// 功能降級但流程完成
    Warning,
    Error,
}

/// 畫面狀態訊息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

impl Status {
    pub fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(StatusKind::Info, text)
    }

    pub fn busy(text: impl Into<String>) -> Self {
        Self::new(StatusKind::Busy, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(StatusKind::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(StatusKind::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(StatusKind::Error, text)
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
