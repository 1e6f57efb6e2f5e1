//! 畫面路由

use std::fmt;
use std::time::Duration;

use agro_core::SessionId;
use tracing::info;

/// 畫面路由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/`
    Setup,
    /// `/simulador`
    Simulator,
    /// `/compras`，攜帶核准情境的工作階段 ID
    Plan(SessionId),
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Setup => "/",
            Route::Simulator => "/simulador",
            Route::Plan(_) => "/compras",
        }
    }

    /// 由路徑解析；`/compras` 需要工作階段 ID
    pub fn from_path(path: &str, session: Option<SessionId>) -> Option<Self> {
        match path {
            "/" => Some(Route::Setup),
            "/simulador" => Some(Route::Simulator),
            "/compras" => session.map(Route::Plan),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// 畫面要求的導覽（可延遲）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub route: Route,
    pub after: Duration,
}

impl Navigation {
    pub fn now(route: Route) -> Self {
        Self {
            route,
            after: Duration::ZERO,
        }
    }

    pub fn delayed(route: Route, after: Duration) -> Self {
        Self { route, after }
    }
}

/// 目前畫面與導覽歷程
#[derive(Debug, Clone)]
pub struct Router {
    current: Route,
    history: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            current: Route::Setup,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> Route {
        self.current
    }

    pub fn history(&self) -> &[Route] {
        &self.history
    }

    /// 立即切換畫面
    pub fn navigate(&mut self, route: Route) {
        info!(from = %self.current, to = %route, "切換畫面");
        self.history.push(self.current);
        self.current = route;
    }

    /// 等待導覽延遲後切換
    pub async fn follow(&mut self, navigation: Navigation) -> Route {
        if !navigation.after.is_zero() {
            tokio::time::sleep(navigation.after).await;
        }
        self.navigate(navigation.route);
        self.current
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
