//! 互動式主控台
//!
//! 每行一個指令；畫面狀態由 [`Router`] 管理，編輯後的自動執行由模擬畫面的防抖計時器在背景觸發。

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use agro_client::ForecastApi;
use agro_core::{ClientConfig, FuelSituation, MonthField, Scenario, ScenarioGrid, ScenarioMap};
use agro_views::plan::MISSING_SCENARIO_PROMPT;
use agro_views::{
    ChartKind, PlanScreen, PlanView, Route, Router, SessionStore, SetupView, SimulatorView,
};
use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::cli::parse_fuel;
use crate::render;

const HELP: &str = "\
Comandos:
  setup <archivo.csv>          subir datos y entrenar
  go <ruta>                    ir a /, /simulador o /compras
  tab <peor|conservador|mejor> escenario activo
  edit <mes> <campo> <valor>   campo: clima, feria, precio, crecimiento
  run                          ejecutar los 3 escenarios
  auto <on|off>                ejecución automática tras editar
  product [nombre]             filtrar producto (sin nombre: todos)
  chart <line|bar>             tipo de gráfico
  approve <escenario>          aprobar y generar plan de compra
  stock <cantidad>             stock actual del plan
  fuel <1|2|3>                 situación de combustible
  show                         mostrar la vista actual
  help | quit";

/// 主控台指令
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Help,
    Quit,
    Setup(PathBuf),
    Go(String),
    Tab(Scenario),
    Edit {
        index: usize,
        field: MonthField,
        value: Decimal,
    },
    Run,
    Auto(bool),
    Product(Option<String>),
    Chart(ChartKind),
    Approve(Scenario),
    Stock(Decimal),
    Fuel(FuelSituation),
    Show,
}

/// 解析一行輸入；空行回傳 `Ok(None)`
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "help" | "ayuda" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "salir" => ConsoleCommand::Quit,
        "setup" => ConsoleCommand::Setup(PathBuf::from(required(rest, "archivo")?)),
        "go" | "ir" => ConsoleCommand::Go(required(rest, "ruta")?.to_string()),
        "tab" => ConsoleCommand::Tab(parse_scenario(rest)?),
        "edit" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let [index, field, value] = parts.as_slice() else {
                return Err("uso: edit <mes> <campo> <valor>".to_string());
            };
            ConsoleCommand::Edit {
                index: index.parse().map_err(|_| format!("índice inválido: {index}"))?,
                field: field.parse().map_err(|e: agro_core::AgroError| e.to_string())?,
                value: parse_decimal(value)?,
            }
        }
        "run" => ConsoleCommand::Run,
        "auto" => ConsoleCommand::Auto(match rest.to_lowercase().as_str() {
            "on" | "si" | "sí" | "1" => true,
            "off" | "no" | "0" => false,
            other => return Err(format!("valor inválido para auto: {other}")),
        }),
        "product" | "producto" => ConsoleCommand::Product(match rest {
            "" | "*" | "todos" => None,
            name => Some(name.to_string()),
        }),
        "chart" => ConsoleCommand::Chart(rest.parse().map_err(|e: agro_core::AgroError| e.to_string())?),
        "approve" | "aprobar" => ConsoleCommand::Approve(parse_scenario(rest)?),
        "stock" => ConsoleCommand::Stock(parse_decimal(rest)?),
        "fuel" | "combustible" => ConsoleCommand::Fuel(parse_fuel(rest)?),
        "show" | "ver" => ConsoleCommand::Show,
        other => return Err(format!("comando desconocido: {other} (escriba help)")),
    };
    Ok(Some(command))
}

fn required<'a>(rest: &'a str, what: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("falta {what}"))
    } else {
        Ok(rest)
    }
}

fn parse_scenario(value: &str) -> Result<Scenario, String> {
    value.parse().map_err(|e: agro_core::AgroError| e.to_string())
}

fn parse_decimal(value: &str) -> Result<Decimal, String> {
    value.trim().parse().map_err(|_| format!("número inválido: {value}"))
}

/// 主控台狀態
pub struct Console {
    api: Arc<dyn ForecastApi>,
    config: ClientConfig,
    sessions: SessionStore,
    router: Router,
    setup: SetupView,
    simulator: SimulatorView,
    plan: Option<PlanView>,
}

impl Console {
    pub fn new(api: Arc<dyn ForecastApi>, config: ClientConfig, grids: ScenarioMap<ScenarioGrid>) -> Self {
        let sessions = SessionStore::new();
        Self {
            setup: SetupView::new(Arc::clone(&api), config.navigate_delay()),
            simulator: SimulatorView::new(Arc::clone(&api), sessions.clone(), config.clone(), grids),
            api,
            config,
            sessions,
            router: Router::new(),
            plan: None,
        }
    }

    /// 讀取標準輸入直到 quit 或 EOF
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("{HELP}");
        println!("{}", render::status_line(&self.setup.status()));

        loop {
            print!("{}> ", self.router.current());
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            match parse_command(&line) {
                Ok(None) => {}
                Ok(Some(ConsoleCommand::Quit)) => break,
                Ok(Some(command)) => {
                    debug!(?command, "執行主控台指令");
                    if let Err(err) = self.execute(command).await {
                        println!("Error: {err}");
                    }
                }
                Err(message) => println!("{message}"),
            }
        }
        Ok(())
    }

    async fn execute(&mut self, command: ConsoleCommand) -> Result<()> {
        match command {
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => {}
            ConsoleCommand::Setup(path) => self.setup_and_train(path).await,
            ConsoleCommand::Go(path) => {
                let session = self.plan.as_ref().map(|view| view.session().id);
                let route = Route::from_path(&path, session).ok_or_else(|| match path.as_str() {
                    "/compras" => anyhow!(MISSING_SCENARIO_PROMPT),
                    _ => anyhow!("ruta desconocida: {path}"),
                })?;
                self.router.navigate(route);
                self.show();
            }
            ConsoleCommand::Tab(scenario) => {
                self.simulator.set_active_tab(scenario);
                println!("{}", render::grid(&self.simulator.grid(scenario), self.simulator.calendar()));
            }
            ConsoleCommand::Edit { index, field, value } => {
                self.simulator.edit(index, field, value)?;
                if self.simulator.has_pending_run() {
                    println!("Cambios registrados; simulación programada.");
                }
            }
            ConsoleCommand::Run => {
                // 有排程中的自動執行時等它完成，避免重複送出
                match self.simulator.take_pending_run() {
                    Some(handle) => handle.await?,
                    None => {
                        self.simulator.run_all().await;
                    }
                }
                self.show_simulator();
            }
            ConsoleCommand::Auto(enabled) => self.simulator.set_auto_run(enabled),
            ConsoleCommand::Product(product) => match self.router.current() {
                Route::Plan(_) => {
                    let view = self.plan_view()?;
                    view.select_product(product)?;
                    settle_plan(&view).await?;
                    show_plan(&view);
                }
                _ => {
                    self.simulator.select_product(product)?;
                    println!("{}", render::chart(&self.simulator.chart()));
                }
            },
            ConsoleCommand::Chart(kind) => {
                self.simulator.set_chart_kind(kind);
                println!("{}", render::chart(&self.simulator.chart()));
            }
            ConsoleCommand::Approve(scenario) => self.approve(scenario).await,
            ConsoleCommand::Stock(stock) => {
                let view = self.plan_view()?;
                view.set_stock(stock)?;
                settle_plan(&view).await?;
                show_plan(&view);
            }
            ConsoleCommand::Fuel(fuel) => {
                let view = self.plan_view()?;
                view.set_fuel(fuel);
                settle_plan(&view).await?;
                show_plan(&view);
            }
            ConsoleCommand::Show => self.show(),
        }
        Ok(())
    }

    async fn setup_and_train(&mut self, path: PathBuf) {
        if self.router.current() != Route::Setup {
            self.router.navigate(Route::Setup);
        }
        if !self.setup.select_file(path) {
            println!("{}", render::status_line(&self.setup.status()));
            return;
        }
        let navigation = self.setup.submit().await;
        println!("{}", render::status_line(&self.setup.status()));
        if let Some(navigation) = navigation {
            self.router.follow(navigation).await;
            self.show();
        }
    }

    async fn approve(&mut self, scenario: Scenario) {
        let Some(navigation) = self.simulator.approve(scenario).await else {
            println!("{}", render::status_line(&self.simulator.status()));
            return;
        };
        println!("{}", render::status_line(&self.simulator.status()));

        if let Route::Plan(id) = self.router.follow(navigation).await {
            match PlanScreen::open(&self.sessions, id, Arc::clone(&self.api), &self.config) {
                PlanScreen::Ready(view) => {
                    println!("Productos: {}", view.available_products().join(", "));
                    self.plan = Some(view);
                }
                PlanScreen::Missing { prompt } => {
                    self.plan = None;
                    println!("{prompt}");
                }
            }
        }
        self.show();
    }

    fn plan_view(&self) -> Result<PlanView> {
        self.plan.clone().ok_or_else(|| anyhow!(MISSING_SCENARIO_PROMPT))
    }

    fn show(&self) {
        match self.router.current() {
            Route::Setup => println!("{}", render::status_line(&self.setup.status())),
            Route::Simulator => self.show_simulator(),
            Route::Plan(_) => match &self.plan {
                Some(view) => show_plan(view),
                None => println!("{MISSING_SCENARIO_PROMPT}"),
            },
        }
    }

    fn show_simulator(&self) {
        let active = self.simulator.active_tab();
        println!("Escenario activo: {}", active.label());
        println!("{}", render::grid(&self.simulator.grid(active), self.simulator.calendar()));
        println!("{}", render::chart(&self.simulator.chart()));
        if let Some((set, source)) = self.simulator.recommendations() {
            println!("{}", render::recommendations(&set, source));
        }
        println!("{}", render::status_line(&self.simulator.status()));
    }
}

/// 等待排程中的重新計算完成
async fn settle_plan(view: &PlanView) -> Result<()> {
    if let Some(handle) = view.take_pending_recompute() {
        handle.await?;
    }
    Ok(())
}

fn show_plan(view: &PlanView) {
    println!(
        "{}",
        render::plan_parameters(view.session().scenario, view.stock(), view.fuel(), view.is_recalculating())
    );
    let rows = view.rows();
    if !rows.is_empty() {
        println!("{}", render::plan(&view.summary(), &rows));
    }
    println!("{}", render::status_line(&view.status()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", None)]
    #[case("   ", None)]
    #[case("run", Some(ConsoleCommand::Run))]
    #[case("auto off", Some(ConsoleCommand::Auto(false)))]
    #[case("tab mejor", Some(ConsoleCommand::Tab(Scenario::Mejor)))]
    #[case("product", Some(ConsoleCommand::Product(None)))]
    #[case("chart barras", Some(ConsoleCommand::Chart(ChartKind::Bar)))]
    #[case("fuel 3", Some(ConsoleCommand::Fuel(FuelSituation::Severe)))]
    #[case("go /simulador", Some(ConsoleCommand::Go("/simulador".to_string())))]
    fn test_parse_command(#[case] line: &str, #[case] expected: Option<ConsoleCommand>) {
        assert_eq!(parse_command(line).unwrap(), expected);
    }

    #[test]
    fn test_product_keeps_spaces() {
        assert_eq!(
            parse_command("product SEMILLA DE MAIZ").unwrap(),
            Some(ConsoleCommand::Product(Some("SEMILLA DE MAIZ".to_string())))
        );
    }

    #[test]
    fn test_parse_edit() {
        assert_eq!(
            parse_command("edit 3 precio -12.5").unwrap(),
            Some(ConsoleCommand::Edit {
                index: 3,
                field: MonthField::PriceChangePct,
                value: Decimal::new(-125, 1),
            })
        );
        assert!(parse_command("edit 3 precio").is_err());
        assert!(parse_command("edit x clima 1").is_err());
    }

    #[rstest]
    #[case("volar")]
    #[case("auto quizás")]
    #[case("stock mucho")]
    #[case("approve todos")]
    #[case("setup")]
    fn test_rejects_invalid_input(#[case] line: &str) {
        assert!(parse_command(line).is_err());
    }

    #[tokio::test]
    async fn test_console_approve_opens_plan() {
        let api: Arc<dyn ForecastApi> = Arc::new(agro_test_utils::FakeForecastApi::new());
        let config = ClientConfig::default()
            .with_products(vec!["SEMILLA DE MAIZ".to_string()])
            .with_debounce_ms(10);
        let grids = ScenarioMap::from_fn(|_| ScenarioGrid::neutral(&Default::default()));
        let mut console = Console::new(api, config, grids);

        console.execute(ConsoleCommand::Run).await.unwrap();
        console.execute(ConsoleCommand::Approve(Scenario::Peor)).await.unwrap();
        assert!(matches!(console.router.current(), Route::Plan(_)));

        console
            .execute(ConsoleCommand::Product(Some("SEMILLA DE MAIZ".to_string())))
            .await
            .unwrap();
        let view = console.plan_view().unwrap();
        assert_eq!(view.rows().len(), 12);
    }

    #[tokio::test]
    async fn test_plan_commands_need_approval() {
        let api: Arc<dyn ForecastApi> = Arc::new(agro_test_utils::FakeForecastApi::new());
        let grids = ScenarioMap::from_fn(|_| ScenarioGrid::neutral(&Default::default()));
        let mut console = Console::new(api, ClientConfig::default(), grids);

        let err = console.execute(ConsoleCommand::Stock(Decimal::from(10))).await.unwrap_err();
        assert_eq!(err.to_string(), MISSING_SCENARIO_PROMPT);
        assert!(console.execute(ConsoleCommand::Go("/compras".to_string())).await.is_err());
    }
}
