//! 採購計劃畫面

use std::sync::Arc;

use agro_client::ForecastApi;
use agro_core::plan::filter_by_product;
use agro_core::{
    AgroError, ApprovedScenario, ClientConfig, FuelSituation, PlanSummary, PurchasePlanEntry,
    PurchasePlanRequest, RowSeverity, SessionId,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::debounce::Debouncer;
use crate::guard::{RequestGuard, RequestTicket};
use crate::session::SessionStore;
use crate::Status;

/// 沒有核准情境時的提示
pub const MISSING_SCENARIO_PROMPT: &str =
    "No se ha aprobado ningún escenario. Vuelve a Simulación y aprueba un escenario para ver el plan de compra.";

const SELECT_PRODUCT_PROMPT: &str = "Seleccione un producto para calcular el plan de compra.";

/// 進入計劃畫面的結果
pub enum PlanScreen {
    /// 找不到工作階段
    Missing { prompt: &'static str },
    Ready(PlanView),
}

impl PlanScreen {
    /// 依工作階段 ID 開啟計劃畫面
    pub fn open(
        sessions: &SessionStore,
        id: SessionId,
        api: Arc<dyn ForecastApi>,
        config: &ClientConfig,
    ) -> Self {
        match sessions.get(id) {
            Some(session) => PlanScreen::Ready(PlanView::new(api, session, config)),
            None => PlanScreen::Missing {
                prompt: MISSING_SCENARIO_PROMPT,
            },
        }
    }

    pub fn into_view(self) -> Option<PlanView> {
        match self {
            PlanScreen::Ready(view) => Some(view),
            PlanScreen::Missing { .. } => None,
        }
    }
}

/// 一次重新計算的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Updated { rows: usize },
    Failed(String),
    /// 已有更新的請求，回應被捨棄
    Superseded,
    /// 尚未選擇產品
    NoProduct,
}

/// 表格列
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRow {
    pub entry: PurchasePlanEntry,
    pub severity: RowSeverity,
}

#[derive(Debug)]
struct PlanState {
    stock: Decimal,
    fuel: FuelSituation,
    product: Option<String>,
    rows: Vec<PurchasePlanEntry>,
    /// 進行中的最新請求
    in_flight: Option<RequestTicket>,
    status: Status,
}

struct Shared {
    api: Arc<dyn ForecastApi>,
    session: Arc<ApprovedScenario>,
    state: Mutex<PlanState>,
    debouncer: Mutex<Debouncer>,
    guard: RequestGuard,
}

/// 採購計劃畫面
///
/// 必須先選擇產品才會顯示計劃；參數變更以防抖方式重新計算。
#[derive(Clone)]
pub struct PlanView {
    shared: Arc<Shared>,
}

impl PlanView {
    pub fn new(api: Arc<dyn ForecastApi>, session: Arc<ApprovedScenario>, config: &ClientConfig) -> Self {
        let status = Status::info(format!(
            "Escenario aprobado: {}. {SELECT_PRODUCT_PROMPT}",
            session.scenario.key().to_uppercase()
        ));
        Self {
            shared: Arc::new(Shared {
                api,
                session,
                state: Mutex::new(PlanState {
                    stock: config.default_stock,
                    fuel: config.default_fuel,
                    product: None,
                    rows: Vec::new(),
                    in_flight: None,
                    status,
                }),
                debouncer: Mutex::new(Debouncer::new(config.debounce())),
                guard: RequestGuard::new(),
            }),
        }
    }

    pub fn session(&self) -> &ApprovedScenario {
        &self.shared.session
    }

    /// 核准情境中可選的產品
    pub fn available_products(&self) -> Vec<String> {
        self.shared.session.products()
    }

    // ---- 參數 ----

    pub fn stock(&self) -> Decimal {
        self.shared.state.lock().stock
    }

    /// 設定現有庫存（不可為負）
    pub fn set_stock(&self, stock: Decimal) -> agro_core::Result<()> {
        if stock < Decimal::ZERO {
            return Err(AgroError::InvalidFieldValue {
                field: "stock_actual",
                value: stock,
            });
        }
        self.shared.state.lock().stock = stock;
        self.parameters_changed();
        Ok(())
    }

    pub fn fuel(&self) -> FuelSituation {
        self.shared.state.lock().fuel
    }

    pub fn set_fuel(&self, fuel: FuelSituation) {
        self.shared.state.lock().fuel = fuel;
        self.parameters_changed();
    }

    pub fn product(&self) -> Option<String> {
        self.shared.state.lock().product.clone()
    }

    /// 選擇產品：清除目前的計劃並排程重新計算；None 表示清除篩選
    pub fn select_product(&self, product: Option<String>) -> agro_core::Result<()> {
        if let Some(name) = &product {
            if !self.available_products().contains(name) {
                return Err(AgroError::UnknownProduct(name.clone()));
            }
        }

        // 切換產品後，先前產品的回應一律作廢
        self.shared.guard.invalidate();
        let selected = {
            let mut state = self.shared.state.lock();
            state.rows.clear();
            state.in_flight = None;
            state.status = match &product {
                Some(name) => Status::info(format!("Producto seleccionado: {name}. Recalculando plan...")),
                None => Status::info(SELECT_PRODUCT_PROMPT),
            };
            state.product = product;
            state.product.is_some()
        };

        if selected {
            self.schedule_recompute();
        } else {
            self.shared.debouncer.lock().cancel();
        }
        Ok(())
    }

    fn parameters_changed(&self) {
        let has_product = {
            let mut state = self.shared.state.lock();
            if state.product.is_none() {
                state.status = Status::info(SELECT_PRODUCT_PROMPT);
            }
            state.product.is_some()
        };
        if has_product {
            self.schedule_recompute();
        }
    }

    fn schedule_recompute(&self) {
        let view = self.clone();
        self.shared.debouncer.lock().schedule(async move {
            view.recompute().await;
        });
    }

    pub fn take_pending_recompute(&self) -> Option<JoinHandle<()>> {
        self.shared.debouncer.lock().take_pending()
    }

    // ---- 計算 ----

    /// 以目前參數重新取得所選產品的計劃
    pub async fn recompute(&self) -> PlanOutcome {
        let ticket = self.shared.guard.issue();
        let request = {
            let mut state = self.shared.state.lock();
            let Some(product) = state.product.clone() else {
                state.status = Status::info(SELECT_PRODUCT_PROMPT);
                return PlanOutcome::NoProduct;
            };
            state.in_flight = Some(ticket);
            state.status = Status::busy("Recalculando plan de compra...");
            PurchasePlanRequest::new(state.stock, state.fuel)
                .with_results(self.shared.session.baseline_for(&product))
        };
        debug!(
            ticket = ticket.value(),
            stock = %request.stock_actual,
            fuel = request.situacion_combustible.code(),
            rows = request.proyeccion_ventas.len(),
            "重新計算採購計劃"
        );

        let response = self.shared.api.purchase_plan(&request).await;

        let mut state = self.shared.state.lock();
        if !self.shared.guard.is_latest(ticket) {
            debug!(ticket = ticket.value(), "捨棄過期的採購計劃");
            if state.in_flight == Some(ticket) {
                state.in_flight = None;
            }
            return PlanOutcome::Superseded;
        }
        state.in_flight = None;
        match response {
            Ok(rows) => {
                let count = rows.len();
                info!(rows = count, "採購計劃已更新");
                state.rows = rows;
                state.status = Status::success(format!(
                    "Plan recalculado con Stock: {}, Combustible: {}",
                    request.stock_actual,
                    request.situacion_combustible.code()
                ));
                PlanOutcome::Updated { rows: count }
            }
            Err(err) => {
                let message = err.user_message();
                error!(error = %err, "採購計劃重新計算失敗");
                state.status = Status::error(format!("Error al recalcular: {message}"));
                PlanOutcome::Failed(message)
            }
        }
    }

    // ---- 顯示 ----

    pub fn status(&self) -> Status {
        self.shared.state.lock().status.clone()
    }

    /// 是否有尚未回應的重新計算
    pub fn is_recalculating(&self) -> bool {
        self.shared.state.lock().in_flight.is_some()
    }

    /// 顯示中的表格列（只包含所選產品）
    pub fn rows(&self) -> Vec<PlanRow> {
        let state = self.shared.state.lock();
        let Some(product) = state.product.as_deref() else {
            return Vec::new();
        };
        filter_by_product(&state.rows, Some(product))
            .map(|entry| PlanRow {
                severity: entry.severity(),
                entry: entry.clone(),
            })
            .collect()
    }

    /// 顯示中表格列的摘要
    pub fn summary(&self) -> PlanSummary {
        let state = self.shared.state.lock();
        match state.product.as_deref() {
            Some(product) => PlanSummary::from_rows(filter_by_product(&state.rows, Some(product))),
            None => PlanSummary::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_test_utils::{plan_entry, projection_rows, Endpoint, FakeForecastApi};
    use std::time::Duration;

    fn approved(sessions: &SessionStore) -> SessionId {
        let mut baseline = projection_rows("SEMILLA DE MAIZ", &[50; 12]);
        baseline.extend(projection_rows("DEFENSIVOS", &[80; 12]));
        sessions.insert(ApprovedScenario::new(agro_core::Scenario::Conservador, baseline, Vec::new()))
    }

    fn open_with(api: &Arc<FakeForecastApi>, config: &ClientConfig) -> PlanView {
        let sessions = SessionStore::new();
        let id = approved(&sessions);
        PlanScreen::open(&sessions, id, api.clone(), config)
            .into_view()
            .unwrap()
    }

    fn open(api: &Arc<FakeForecastApi>) -> PlanView {
        open_with(api, &ClientConfig::default())
    }

    #[test]
    fn test_unknown_session_is_missing() {
        let api: Arc<dyn ForecastApi> = Arc::new(FakeForecastApi::new());
        let screen = PlanScreen::open(&SessionStore::new(), SessionId::new(), api, &ClientConfig::default());
        assert!(matches!(screen, PlanScreen::Missing { prompt } if prompt == MISSING_SCENARIO_PROMPT));
    }

    #[tokio::test]
    async fn test_no_rows_until_product_selected() {
        let api = Arc::new(FakeForecastApi::new());
        let plan = open(&api);

        assert_eq!(plan.available_products(), vec!["DEFENSIVOS", "SEMILLA DE MAIZ"]);
        assert!(plan.rows().is_empty());
        assert_eq!(plan.summary(), PlanSummary::default());
        assert_eq!(plan.recompute().await, PlanOutcome::NoProduct);

        plan.set_stock(Decimal::from(500)).unwrap();
        assert!(plan.take_pending_recompute().is_none());
        assert_eq!(plan.status().text, SELECT_PRODUCT_PROMPT);
        assert_eq!(api.count(Endpoint::PurchasePlan), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selecting_product_recomputes_for_that_product() {
        let api = Arc::new(FakeForecastApi::new());
        let plan = open(&api);

        plan.select_product(Some("SEMILLA DE MAIZ".to_string())).unwrap();
        plan.take_pending_recompute().unwrap().await.unwrap();

        let request = &api.purchase_plan_requests()[0];
        assert_eq!(request.stock_actual, Decimal::from(100));
        assert_eq!(request.situacion_combustible, FuelSituation::Critical);
        assert_eq!(request.proyeccion_ventas.len(), 12);
        assert!(request.proyeccion_ventas.iter().all(|r| r.product == "SEMILLA DE MAIZ"));

        let rows = plan.rows();
        assert_eq!(rows.len(), 12);
        let summary = plan.summary();
        assert_eq!(summary.rows, 12);
        assert_eq!(summary.total_demand, Decimal::from(600));
        assert_eq!(plan.status().text, "Plan recalculado con Stock: 100, Combustible: 2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_parameter_changes_are_debounced() {
        let api = Arc::new(FakeForecastApi::new());
        let plan = open(&api);
        plan.select_product(Some("DEFENSIVOS".to_string())).unwrap();
        plan.take_pending_recompute().unwrap().await.unwrap();

        plan.set_stock(Decimal::from(0)).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        plan.set_fuel(FuelSituation::Normal);
        plan.take_pending_recompute().unwrap().await.unwrap();

        let requests = api.purchase_plan_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].stock_actual, Decimal::ZERO);
        assert_eq!(requests[1].situacion_combustible, FuelSituation::Normal);
        assert_eq!(plan.rows()[0].entry.logistics_note, "Pedir 30 días antes");
    }

    #[test]
    fn test_negative_stock_rejected() {
        let api = Arc::new(FakeForecastApi::new());
        let plan = open(&api);
        assert!(plan.set_stock(Decimal::from(-1)).is_err());
        assert_eq!(plan.stock(), Decimal::from(100));
        assert!(plan.select_product(Some("TRIGO".to_string())).is_err());
    }

    #[tokio::test]
    async fn test_clearing_product_clears_rows() {
        let api = Arc::new(FakeForecastApi::new());
        let plan = open(&api);
        plan.select_product(Some("DEFENSIVOS".to_string())).unwrap();
        plan.recompute().await;
        assert_eq!(plan.rows().len(), 12);

        plan.select_product(None).unwrap();
        assert!(plan.rows().is_empty());
        assert_eq!(plan.summary().rows, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_never_overwrites_newer() {
        let api = Arc::new(
            FakeForecastApi::new().with_nth_delay(Endpoint::PurchasePlan, 1, Duration::from_secs(5)),
        );
        // 防抖計時器在測試期間不會觸發
        let plan = open_with(&api, &ClientConfig::default().with_debounce_ms(60_000));
        plan.select_product(Some("SEMILLA DE MAIZ".to_string())).unwrap();

        let slow = tokio::spawn({
            let plan = plan.clone();
            async move { plan.recompute().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        plan.set_stock(Decimal::from(1000)).unwrap();
        let newer = plan.recompute().await;
        assert_eq!(newer, PlanOutcome::Updated { rows: 12 });
        assert_eq!(slow.await.unwrap(), PlanOutcome::Superseded);

        // 庫存 1000 時第一列不需採購
        assert_eq!(plan.rows()[0].entry.initial_stock, Decimal::from(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_product_discards_previous_response() {
        let api = Arc::new(
            FakeForecastApi::new().with_nth_delay(Endpoint::PurchasePlan, 1, Duration::from_millis(500)),
        );
        let plan = open(&api);
        plan.select_product(Some("SEMILLA DE MAIZ".to_string())).unwrap();
        let maize = plan.take_pending_recompute().unwrap();

        // 防抖已觸發，玉米的請求仍在進行
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(plan.is_recalculating());

        plan.select_product(Some("DEFENSIVOS".to_string())).unwrap();
        assert!(!plan.is_recalculating());
        maize.await.unwrap();

        assert_eq!(plan.product().as_deref(), Some("DEFENSIVOS"));
        assert!(plan.shared.state.lock().rows.is_empty());
        assert_eq!(plan.status().text, "Producto seleccionado: DEFENSIVOS. Recalculando plan...");

        plan.take_pending_recompute().unwrap().await.unwrap();
        let rows = plan.rows();
        assert_eq!(rows.len(), 12);
        assert!(rows.iter().all(|row| row.entry.product == "DEFENSIVOS"));
        assert_eq!(api.count(Endpoint::PurchasePlan), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_product_mid_request_resets_recalculating() {
        let api = Arc::new(
            FakeForecastApi::new().with_nth_delay(Endpoint::PurchasePlan, 1, Duration::from_millis(500)),
        );
        let plan = open(&api);
        plan.select_product(Some("SEMILLA DE MAIZ".to_string())).unwrap();
        let pending = plan.take_pending_recompute().unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(plan.is_recalculating());

        plan.select_product(None).unwrap();
        pending.await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(!plan.is_recalculating());
        assert!(plan.shared.state.lock().rows.is_empty());
        assert_eq!(plan.status().text, SELECT_PRODUCT_PROMPT);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_rows() {
        let api = Arc::new(FakeForecastApi::new().with_failure(Endpoint::PurchasePlan, 2, "Servicio no disponible"));
        let plan = open(&api);
        plan.select_product(Some("SEMILLA DE MAIZ".to_string())).unwrap();
        plan.recompute().await;

        let outcome = plan.recompute().await;
        assert_eq!(outcome, PlanOutcome::Failed("Servicio no disponible".to_string()));
        assert_eq!(plan.rows().len(), 12);
        assert_eq!(plan.status().text, "Error al recalcular: Servicio no disponible");
    }

    #[test]
    fn test_rows_carry_severity() {
        let api = Arc::new(FakeForecastApi::new());
        let plan = open(&api);
        {
            let mut state = plan.shared.state.lock();
            state.product = Some("SEMILLA DE MAIZ".to_string());
            state.rows = vec![
                plan_entry("SEMILLA DE MAIZ", 11, 50, -20, "¡ALERTA! Quiebre de stock."),
                plan_entry("SEMILLA DE MAIZ", 12, 50, 5, "ADVERTENCIA: Stock final bajo."),
                plan_entry("SEMILLA DE MAIZ", 1, 50, 40, "OK. Stock suficiente."),
            ];
        }

        let severities: Vec<RowSeverity> = plan.rows().iter().map(|r| r.severity).collect();
        assert_eq!(severities, vec![RowSeverity::Alert, RowSeverity::Warning, RowSeverity::Normal]);
        assert_eq!(plan.summary().flagged_rows, 2);
        assert_eq!(plan.summary().total_final_stock, Decimal::from(25));
    }
}
