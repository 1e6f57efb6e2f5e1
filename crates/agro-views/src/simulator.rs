//! 模擬畫面：三個情境的輸入、預測、建議與核准

use std::sync::Arc;

use agro_client::ForecastApi;
use agro_core::recommendation::fallback_recommendations;
use agro_core::{
    ApprovedScenario, ClientConfig, MonthField, PlanningCalendar, PurchasePlanRequest,
    RecommendationSet, Scenario, ScenarioGrid, ScenarioMap, SimulationPayload, SimulationResult,
};
use parking_lot::Mutex;
use rand::Rng;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::chart::{build_chart, ChartData, ChartKind};
use crate::debounce::Debouncer;
use crate::guard::{RequestGuard, RequestTicket};
use crate::router::{Navigation, Route};
use crate::session::SessionStore;
use crate::Status;

/// 單一情境的狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioPhase {
    /// 尚未編輯
    Unedited,
    /// 已編輯，尚未送出
    Edited,
    /// 請求進行中
    Submitted,
    /// 已有結果
    ResultAvailable,
}

/// 建議文字的來源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationSource {
    Remote,
    /// 遠端失敗，使用本地備援
    Fallback,
}

/// 一次 run-all 的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RecommendationSource),
    /// 某情境失敗，其後的情境未送出
    Failed { scenario: Scenario, message: String },
    /// 已有更新的 run-all，結果被捨棄
    Superseded,
}

#[derive(Debug, Clone)]
struct ScenarioSlot {
    grid: ScenarioGrid,
    phase: ScenarioPhase,
    results: Option<Vec<SimulationResult>>,
}

impl ScenarioSlot {
    fn new(grid: ScenarioGrid) -> Self {
        Self {
            grid,
            phase: ScenarioPhase::Unedited,
            results: None,
        }
    }
}

#[derive(Debug)]
struct SimulatorState {
    slots: ScenarioMap<ScenarioSlot>,
    active: Scenario,
    auto_run: bool,
    selected_product: Option<String>,
    chart_kind: ChartKind,
    recommendations: Option<(RecommendationSet, RecommendationSource)>,
    running: bool,
    approving: bool,
    status: Status,
}

struct Shared {
    api: Arc<dyn ForecastApi>,
    sessions: SessionStore,
    config: ClientConfig,
    calendar: PlanningCalendar,
    state: Mutex<SimulatorState>,
    debouncer: Mutex<Debouncer>,
    guard: RequestGuard,
}

/// 模擬畫面
///
/// 可複製的控制代碼；防抖工作持有一份副本並在觸發時執行 run-all。
#[derive(Clone)]
pub struct SimulatorView {
    shared: Arc<Shared>,
}

/// 以隨機預設值建立三個情境的輸入
pub fn random_grids<R: Rng + ?Sized>(calendar: &PlanningCalendar, rng: &mut R) -> ScenarioMap<ScenarioGrid> {
    ScenarioMap::from_fn(|_| ScenarioGrid::random(calendar, &mut *rng))
}

impl SimulatorView {
    pub fn new(
        api: Arc<dyn ForecastApi>,
        sessions: SessionStore,
        config: ClientConfig,
        grids: ScenarioMap<ScenarioGrid>,
    ) -> Self {
        let debouncer = Debouncer::new(config.debounce());
        let state = SimulatorState {
            slots: grids.map(|_, grid| ScenarioSlot::new(grid.clone())),
            active: Scenario::Conservador,
            auto_run: true,
            selected_product: config.products.first().cloned(),
            chart_kind: ChartKind::default(),
            recommendations: None,
            running: false,
            approving: false,
            status: Status::info("Listo para simular."),
        };

        Self {
            shared: Arc::new(Shared {
                api,
                sessions,
                config,
                calendar: PlanningCalendar::default(),
                state: Mutex::new(state),
                debouncer: Mutex::new(debouncer),
                guard: RequestGuard::new(),
            }),
        }
    }

    // ---- 輸入 ----

    pub fn active_tab(&self) -> Scenario {
        self.shared.state.lock().active
    }

    pub fn set_active_tab(&self, scenario: Scenario) {
        self.shared.state.lock().active = scenario;
    }

    /// 編輯目前分頁的欄位；自動執行開啟時排程 run-all
    pub fn edit(&self, index: usize, field: MonthField, value: Decimal) -> agro_core::Result<()> {
        let auto_run = {
            let mut state = self.shared.state.lock();
            let active = state.active;
            let slot = state.slots.get_mut(active);
            slot.grid.update(index, field, value)?;
            if slot.phase != ScenarioPhase::Submitted {
                slot.phase = ScenarioPhase::Edited;
            }
            debug!(scenario = %active, index, field = field.wire_name(), %value, "編輯情境輸入");
            state.auto_run
        };

        if auto_run {
            self.schedule_run();
        }
        Ok(())
    }

    pub fn auto_run(&self) -> bool {
        self.shared.state.lock().auto_run
    }

    /// 關閉自動執行時取消尚未觸發的 run-all
    pub fn set_auto_run(&self, enabled: bool) {
        self.shared.state.lock().auto_run = enabled;
        if !enabled {
            self.shared.debouncer.lock().cancel();
        }
    }

    fn schedule_run(&self) {
        let view = self.clone();
        self.shared.debouncer.lock().schedule(async move {
            view.run_all().await;
        });
    }

    /// 取出尚未完成的自動執行工作
    pub fn take_pending_run(&self) -> Option<JoinHandle<()>> {
        self.shared.debouncer.lock().take_pending()
    }

    pub fn has_pending_run(&self) -> bool {
        self.shared.debouncer.lock().is_pending()
    }

    // ---- 查詢 ----

    pub fn grid(&self, scenario: Scenario) -> ScenarioGrid {
        self.shared.state.lock().slots.get(scenario).grid.clone()
    }

    pub fn phase(&self, scenario: Scenario) -> ScenarioPhase {
        self.shared.state.lock().slots.get(scenario).phase
    }

    pub fn results(&self, scenario: Scenario) -> Option<Vec<SimulationResult>> {
        self.shared.state.lock().slots.get(scenario).results.clone()
    }

    pub fn recommendations(&self) -> Option<(RecommendationSet, RecommendationSource)> {
        self.shared.state.lock().recommendations.clone()
    }

    pub fn status(&self) -> Status {
        self.shared.state.lock().status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    pub fn products(&self) -> &[String] {
        &self.shared.config.products
    }

    pub fn calendar(&self) -> &PlanningCalendar {
        &self.shared.calendar
    }

    // ---- 圖表 ----

    pub fn selected_product(&self) -> Option<String> {
        self.shared.state.lock().selected_product.clone()
    }

    /// 選擇圖表產品（None 表示全部）
    pub fn select_product(&self, product: Option<String>) -> agro_core::Result<()> {
        if let Some(name) = &product {
            if !self.shared.config.products.contains(name) {
                return Err(agro_core::AgroError::UnknownProduct(name.clone()));
            }
        }
        self.shared.state.lock().selected_product = product;
        Ok(())
    }

    pub fn chart_kind(&self) -> ChartKind {
        self.shared.state.lock().chart_kind
    }

    pub fn set_chart_kind(&self, kind: ChartKind) {
        self.shared.state.lock().chart_kind = kind;
    }

    pub fn chart(&self) -> ChartData {
        let state = self.shared.state.lock();
        let results = state.slots.map(|_, slot| slot.results.clone());
        build_chart(
            &results,
            state.selected_product.as_deref(),
            &self.shared.calendar,
            state.chart_kind,
        )
    }

    // ---- run-all ----

    /// 依序對三個情境取得預測，全部成功後取得建議
    pub async fn run_all(&self) -> RunOutcome {
        let ticket = self.shared.guard.issue();
        let payloads = {
            let mut state = self.shared.state.lock();
            state.running = true;
            state.status = Status::busy("Calculando 3 escenarios...");
            state
                .slots
                .map(|_, slot| SimulationPayload::cross_product(&self.shared.config.products, &slot.grid))
        };
        info!(ticket = ticket.value(), rows = payloads.peor.len(), "開始執行三個情境");

        let mut collected: ScenarioMap<Vec<SimulationResult>> = ScenarioMap::default();
        for scenario in Scenario::ALL {
            if let Err(outcome) = self.run_scenario(ticket, scenario, payloads.get(scenario), &mut collected).await {
                return outcome;
            }
        }

        self.finish_with_recommendations(ticket, collected).await
    }

    async fn run_scenario(
        &self,
        ticket: RequestTicket,
        scenario: Scenario,
        payload: &[SimulationPayload],
        collected: &mut ScenarioMap<Vec<SimulationResult>>,
    ) -> Result<(), RunOutcome> {
        let previous = {
            let mut state = self.shared.state.lock();
            if !self.shared.guard.is_latest(ticket) {
                return Err(RunOutcome::Superseded);
            }
            let slot = state.slots.get_mut(scenario);
            let previous = match slot.phase {
                // 前一次 run-all 仍在進行
                ScenarioPhase::Submitted if slot.results.is_some() => ScenarioPhase::ResultAvailable,
                ScenarioPhase::Submitted => ScenarioPhase::Edited,
                phase => phase,
            };
            slot.phase = ScenarioPhase::Submitted;
            previous
        };

        let response = self.shared.api.simulate_projection(payload).await;

        let mut state = self.shared.state.lock();
        if !self.shared.guard.is_latest(ticket) {
            debug!(scenario = %scenario, "捨棄過期的預測結果");
            let slot = state.slots.get_mut(scenario);
            if slot.phase == ScenarioPhase::Submitted {
                slot.phase = previous;
            }
            return Err(RunOutcome::Superseded);
        }

        match response {
            Ok(rows) => {
                debug!(scenario = %scenario, rows = rows.len(), "收到預測結果");
                let slot = state.slots.get_mut(scenario);
                slot.results = Some(rows.clone());
                slot.phase = ScenarioPhase::ResultAvailable;
                *collected.get_mut(scenario) = rows;
                Ok(())
            }
            Err(err) => {
                let message = err.user_message();
                error!(scenario = %scenario, error = %err, "情境預測失敗");
                state.slots.get_mut(scenario).phase = previous;
                state.running = false;
                state.status = Status::error(format!("Error en la simulación: {message}"));
                Err(RunOutcome::Failed { scenario, message })
            }
        }
    }

    async fn finish_with_recommendations(
        &self,
        ticket: RequestTicket,
        collected: ScenarioMap<Vec<SimulationResult>>,
    ) -> RunOutcome {
        self.shared.state.lock().status = Status::busy("Analizando resultados...");

        let (set, source) = match self.shared.api.recommendations(&collected).await {
            Ok(set) => (set, RecommendationSource::Remote),
            Err(err) => {
                warn!(error = %err, "建議服務無法使用，改用本地備援");
                (fallback_recommendations(&collected.conservador), RecommendationSource::Fallback)
            }
        };

        let mut state = self.shared.state.lock();
        if !self.shared.guard.is_latest(ticket) {
            return RunOutcome::Superseded;
        }
        state.recommendations = Some((set, source));
        state.running = false;
        state.status = match source {
            RecommendationSource::Remote => {
                Status::success("Simulación completa y recomendaciones generadas.")
            }
            RecommendationSource::Fallback => {
                Status::warning("Simulación completa (usando recomendaciones locales).")
            }
        };
        info!(?source, "三個情境執行完成");
        RunOutcome::Completed(source)
    }

    // ---- 核准 ----

    /// 情境已有結果且沒有進行中的核准
    pub fn can_approve(&self, scenario: Scenario) -> bool {
        let state = self.shared.state.lock();
        state.slots.get(scenario).results.is_some() && !state.approving
    }

    /// 核准情境：取得初始採購計劃、存入工作階段並導覽到計劃畫面
    pub async fn approve(&self, scenario: Scenario) -> Option<Navigation> {
        let baseline = {
            let mut state = self.shared.state.lock();
            if state.approving {
                return None;
            }
            let Some(rows) = state.slots.get(scenario).results.clone() else {
                state.status = Status::error(format!(
                    "No hay resultados para el escenario {}. Ejecute la simulación primero.",
                    scenario.label()
                ));
                return None;
            };
            state.approving = true;
            state.status = Status::busy(format!("Generando Plan de Compra para escenario {scenario}..."));
            rows
        };

        let request = PurchasePlanRequest::new(self.shared.config.default_stock, self.shared.config.default_fuel)
            .with_results(&baseline);
        let response = self.shared.api.purchase_plan(&request).await;

        let mut state = self.shared.state.lock();
        state.approving = false;
        match response {
            Ok(plan) => {
                info!(scenario = %scenario, rows = plan.len(), "情境已核准");
                let id = self
                    .shared
                    .sessions
                    .insert(ApprovedScenario::new(scenario, baseline, plan));
                state.status = Status::success("Plan de Compra generado. Navegando a vista de Plan...");
                Some(Navigation::now(Route::Plan(id)))
            }
            Err(err) => {
                error!(scenario = %scenario, error = %err, "採購計劃產生失敗");
                state.status = Status::error(format!(
                    "Error al generar Plan de Compra: {}",
                    err.user_message()
                ));
                None
            }
        }
    }
}
