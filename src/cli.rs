//! 命令列參數與配置載入

use std::path::{Path, PathBuf};

use agro_core::{ClientConfig, FuelSituation, Scenario};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

/// 農業銷售預測與採購規劃用戶端
#[derive(Parser, Debug)]
#[command(name = "agro", version, about)]
pub struct Cli {
    /// TOML 配置檔
    #[arg(long, global = true, env = "AGRO_CONFIG")]
    pub config: Option<PathBuf>,

    /// 預測服務位址（覆寫配置檔與 AGRO_API_BASE_URL）
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// 隨機預設值的種子
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 上傳 CSV 並訓練模型
    Setup {
        /// 歷史銷售 CSV
        #[arg(long)]
        file: PathBuf,
    },
    /// 依序執行設定、模擬、核准與採購計劃
    Run(RunArgs),
    /// 互動式主控台
    Console,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// 歷史銷售 CSV（搭配 --skip-setup 時可省略）
    #[arg(long, required_unless_present = "skip_setup")]
    pub file: Option<PathBuf>,

    /// 略過上傳與訓練
    #[arg(long)]
    pub skip_setup: bool,

    /// 要核准的情境
    #[arg(long, default_value = "conservador", value_parser = parse_scenario)]
    pub scenario: Scenario,

    /// 計劃畫面的產品
    #[arg(long)]
    pub product: Option<String>,

    /// 現有庫存
    #[arg(long)]
    pub stock: Option<Decimal>,

    /// 燃料狀況（1=Normal, 2=Crítico, 3=Severo）
    #[arg(long, value_parser = parse_fuel)]
    pub fuel: Option<FuelSituation>,
}

fn parse_scenario(value: &str) -> Result<Scenario, String> {
    value.parse().map_err(|e: agro_core::AgroError| e.to_string())
}

pub fn parse_fuel(value: &str) -> Result<FuelSituation, String> {
    let code: u8 = value
        .trim()
        .parse()
        .map_err(|_| format!("無效的燃料狀況: {value}"))?;
    FuelSituation::try_from(code).map_err(|e| e.to_string())
}

/// 依序套用：預設值、配置檔、環境變數、命令列
pub fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match &cli.config {
        Some(path) => read_config_file(path)?,
        None => ClientConfig::default(),
    };
    let mut config = config.apply_env();
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url.clone());
    }
    config.validate().context("配置無效")?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<ClientConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("無法讀取配置檔: {}", path.display()))?;
    ClientConfig::from_toml_str(&text).with_context(|| format!("配置檔格式錯誤: {}", path.display()))
}
