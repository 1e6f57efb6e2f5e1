//! 農業銷售預測與採購規劃用戶端

mod cli;
mod console;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use agro_client::{ForecastApi, HttpForecastApi};
use agro_core::{ClientConfig, PlanningCalendar};
use agro_views::simulator::random_grids;
use agro_views::{PlanScreen, Route, Router, RunOutcome, SessionStore, SetupView, SimulatorView};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{load_config, Cli, Command, RunArgs};
use crate::console::Console;

#[tokio::main]
async fn main() -> Result<()> {
    // 日誌輸出到 stderr，stdout 保留給畫面內容
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let api: Arc<dyn ForecastApi> =
        Arc::new(HttpForecastApi::new(&config).context("無法建立預測服務用戶端")?);
    info!(base_url = %config.normalized_base_url(), products = config.products.len(), "用戶端已就緒");

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let grids = random_grids(&PlanningCalendar::default(), &mut rng);

    match cli.command {
        Command::Setup { file } => {
            let mut router = Router::new();
            setup(&api, &config, &mut router, file).await
        }
        Command::Run(args) => run(api, config, grids, args).await,
        Command::Console => Console::new(api, config, grids).run().await,
    }
}

/// 上傳並訓練，成功後依延遲導覽到模擬畫面
async fn setup(api: &Arc<dyn ForecastApi>, config: &ClientConfig, router: &mut Router, file: PathBuf) -> Result<()> {
    let view = SetupView::new(Arc::clone(api), config.navigate_delay());
    let selected = view.select_file(file);
    println!("{}", render::status_line(&view.status()));
    if !selected {
        bail!("{}", view.status().text);
    }

    let navigation = view.submit().await;
    println!("{}", render::status_line(&view.status()));
    let navigation = navigation.ok_or_else(|| anyhow!("{}", view.status().text))?;
    router.follow(navigation).await;
    Ok(())
}

/// 非互動流程：設定、模擬、核准、計劃
async fn run(
    api: Arc<dyn ForecastApi>,
    config: ClientConfig,
    grids: agro_core::ScenarioMap<agro_core::ScenarioGrid>,
    args: RunArgs,
) -> Result<()> {
    let mut router = Router::new();
    match (&args.file, args.skip_setup) {
        (Some(file), false) => setup(&api, &config, &mut router, file.clone()).await?,
        _ => router.navigate(Route::Simulator),
    }

    let sessions = SessionStore::new();
    let simulator = SimulatorView::new(Arc::clone(&api), sessions.clone(), config.clone(), grids);
    simulator.set_auto_run(false);

    let outcome = simulator.run_all().await;
    println!("{}", render::chart(&simulator.chart()));
    if let Some((set, source)) = simulator.recommendations() {
        println!("{}", render::recommendations(&set, source));
    }
    println!("{}", render::status_line(&simulator.status()));
    if let RunOutcome::Failed { message, .. } = outcome {
        bail!("{message}");
    }

    let navigation = simulator
        .approve(args.scenario)
        .await
        .ok_or_else(|| anyhow!("{}", simulator.status().text))?;
    println!("{}", render::status_line(&simulator.status()));

    let Route::Plan(id) = router.follow(navigation).await else {
        bail!("導覽目標不是計劃畫面");
    };
    let view = match PlanScreen::open(&sessions, id, Arc::clone(&api), &config) {
        PlanScreen::Ready(view) => view,
        PlanScreen::Missing { prompt } => bail!(prompt),
    };

    if let Some(stock) = args.stock {
        view.set_stock(stock)?;
    }
    if let Some(fuel) = args.fuel {
        view.set_fuel(fuel);
    }
    let product = args
        .product
        .or_else(|| view.available_products().into_iter().next())
        .context("核准的情境沒有任何產品")?;
    view.select_product(Some(product))?;
    if let Some(handle) = view.take_pending_recompute() {
        handle.await?;
    }

    println!("{}", render::plan(&view.summary(), &view.rows()));
    let status = view.status();
    println!("{}", render::status_line(&status));
    if status.is_error() {
        bail!("{}", status.text);
    }
    Ok(())
}
