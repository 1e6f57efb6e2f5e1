//! 設定畫面：上傳 CSV 並訓練模型

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use agro_client::{ApiError, ForecastApi};
use parking_lot::Mutex;
use tracing::{error, info};

use crate::router::{Navigation, Route};
use crate::Status;

/// 連線失敗且伺服器未提供訊息時的提示
pub const CONNECTIVITY_MESSAGE: &str = "Fallo de conexión. ¿Está corriendo el servicio de predicción?";

#[derive(Debug)]
struct SetupState {
    file: Option<PathBuf>,
    in_flight: bool,
    status: Status,
}

/// 設定畫面
#[derive(Clone)]
pub struct SetupView {
    api: Arc<dyn ForecastApi>,
    navigate_delay: Duration,
    state: Arc<Mutex<SetupState>>,
}

impl SetupView {
    pub fn new(api: Arc<dyn ForecastApi>, navigate_delay: Duration) -> Self {
        Self {
            api,
            navigate_delay,
            state: Arc::new(Mutex::new(SetupState {
                file: None,
                in_flight: false,
                status: Status::info("Cargue su archivo de datos (CSV) para iniciar la simulación."),
            })),
        }
    }

    /// 選擇檔案；非 `.csv` 的檔案不會被接受
    pub fn select_file(&self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        let mut state = self.state.lock();

        if !is_csv(&path) {
            state.file = None;
            state.status = Status::error("Error: El archivo debe tener extensión .csv.");
            return false;
        }

        state.status = Status::info(format!("Archivo seleccionado: {}.", display_name(&path)));
        state.file = Some(path);
        true
    }

    pub fn selected_file(&self) -> Option<PathBuf> {
        self.state.lock().file.clone()
    }

    /// 已選擇檔案且沒有進行中的請求
    pub fn can_submit(&self) -> bool {
        let state = self.state.lock();
        state.file.is_some() && !state.in_flight
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    pub fn status(&self) -> Status {
        self.state.lock().status.clone()
    }

    /// 上傳並訓練；成功時回傳延遲導覽到模擬畫面
    pub async fn submit(&self) -> Option<Navigation> {
        let path = {
            let mut state = self.state.lock();
            if state.in_flight {
                return None;
            }
            let Some(path) = state.file.clone() else {
                state.status = Status::error("Error: Selecciona un archivo CSV primero.");
                return None;
            };
            state.in_flight = true;
            state.status = Status::busy("Cargando y entrenando el modelo... Por favor espera.");
            path
        };

        let outcome = self.upload_and_train(&path).await;

        let mut state = self.state.lock();
        state.in_flight = false;
        match outcome {
            Ok(train_status) => {
                info!(file = %path.display(), status = %train_status, "模型訓練完成");
                state.status = Status::success(format!("{train_status}. ¡Modelo listo!"));
                Some(Navigation::delayed(Route::Simulator, self.navigate_delay))
            }
            Err(err) => {
                error!(file = %path.display(), error = %err, "上傳或訓練失敗");
                state.status = Status::error(format!("Error: {}", setup_message(&err)));
                None
            }
        }
    }

    async fn upload_and_train(&self, path: &Path) -> Result<String, ApiError> {
        let contents = tokio::fs::read(path).await?;
        self.api.upload(&display_name(path), contents).await?;
        self.state.lock().status = Status::busy("CSV subido correctamente. Entrenando...");

        let trained = self.api.train().await?;
        Ok(trained.status)
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 伺服器訊息優先；讀檔失敗顯示原因；其餘顯示連線提示
fn setup_message(err: &ApiError) -> String {
    match (err.remote_message(), err) {
        (Some(message), _) => message.to_string(),
        (None, ApiError::Io(_)) => err.to_string(),
        (None, _) => CONNECTIVITY_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatusKind;
    use agro_test_utils::{ApiCall, Endpoint, FakeForecastApi};
    use std::path::PathBuf;

    /// 測試用暫存 CSV（結束時刪除）
    struct TempCsv(PathBuf);

    impl TempCsv {
        fn new(contents: &str) -> Self {
            let path = std::env::temp_dir().join(format!("agro-setup-{}.csv", agro_core::SessionId::new()));
            std::fs::write(&path, contents).unwrap();
            Self(path)
        }
    }

    impl Drop for TempCsv {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn csv_file() -> TempCsv {
        TempCsv::new("MES,PRODUCTO,CANTIDAD\n11,DEFENSIVOS,40\n")
    }

    fn view(api: &Arc<FakeForecastApi>) -> SetupView {
        SetupView::new(api.clone(), Duration::from_millis(1500))
    }

    #[test]
    fn test_submit_requires_csv_file() {
        let api = Arc::new(FakeForecastApi::new());
        let setup = view(&api);
        assert!(!setup.can_submit());

        assert!(!setup.select_file("ventas.xlsx"));
        assert!(!setup.can_submit());
        assert!(setup.status().is_error());

        assert!(setup.select_file("ventas.CSV"));
        assert!(setup.can_submit());
        assert_eq!(setup.status().text, "Archivo seleccionado: ventas.CSV.");
    }

    #[test]
    fn test_rejected_file_replaces_previous_selection() {
        let api = Arc::new(FakeForecastApi::new());
        let setup = view(&api);
        assert!(setup.select_file("ventas.csv"));
        assert!(setup.can_submit());

        assert!(!setup.select_file("ventas.pdf"));
        assert!(setup.selected_file().is_none());
        assert!(!setup.can_submit());
        assert!(setup.status().is_error());
    }

    #[tokio::test]
    async fn test_upload_then_train() {
        let api = Arc::new(FakeForecastApi::new().with_train_status("Modelo entrenado"));
        let setup = view(&api);
        let file = csv_file();
        setup.select_file(&file.0);

        let navigation = setup.submit().await.unwrap();

        assert_eq!(navigation.route, Route::Simulator);
        assert_eq!(navigation.after, Duration::from_millis(1500));
        assert_eq!(setup.status(), Status::success("Modelo entrenado. ¡Modelo listo!"));
        assert_eq!(api.endpoints(), vec![Endpoint::Upload, Endpoint::Train]);
        assert!(matches!(&api.calls()[0], ApiCall::Upload { file_name, .. } if file_name.ends_with(".csv")));
        assert!(setup.can_submit());
    }

    #[tokio::test]
    async fn test_remote_error_is_shown_and_train_is_skipped() {
        let api = Arc::new(FakeForecastApi::new().with_failure(Endpoint::Upload, 1, "Formato de CSV inválido"));
        let setup = view(&api);
        let file = csv_file();
        setup.select_file(&file.0);

        assert!(setup.submit().await.is_none());
        assert_eq!(setup.status().text, "Error: Formato de CSV inválido");
        assert_eq!(setup.status().kind, StatusKind::Error);
        assert_eq!(api.count(Endpoint::Train), 0);

        // 可再次送出
        assert!(setup.can_submit());
        assert!(setup.submit().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_disabled_while_in_flight() {
        let api = Arc::new(FakeForecastApi::new().with_delay(Endpoint::Train, Duration::from_secs(5)));
        let setup = view(&api);
        let file = csv_file();
        setup.select_file(&file.0);

        let running = tokio::spawn({
            let setup = setup.clone();
            async move { setup.submit().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(setup.is_in_flight());
        assert!(!setup.can_submit());
        assert_eq!(setup.status().text, "CSV subido correctamente. Entrenando...");
        assert!(setup.submit().await.is_none());

        assert!(running.await.unwrap().is_some());
        assert!(setup.can_submit());
        assert_eq!(api.count(Endpoint::Upload), 1);
    }

    #[test]
    fn test_setup_message() {
        let transport = ApiError::Transport("connection refused".to_string());
        assert_eq!(setup_message(&transport), CONNECTIVITY_MESSAGE);

        let missing = ApiError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "no existe"));
        assert!(setup_message(&missing).contains("no existe"));
    }
}
