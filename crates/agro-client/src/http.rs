//! 以 HTTP 呼叫預測服務

use std::time::Instant;

use agro_core::{
    ClientConfig, PurchasePlanEntry, PurchasePlanRequest, RecommendationRequest,
    RecommendationSet, SimulationPayload, SimulationResult,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::api::{ForecastApi, TrainStatus, UploadAck};
use crate::error::{ApiError, Result};

/// 端點路徑（相對於 API 位址）
pub mod endpoints {
    pub const UPLOAD: &str = "upload/";
    pub const TRAIN: &str = "train/";
    pub const SIMULATE_PROJECTION: &str = "simulate-projection/";
    pub const RECOMMENDATIONS: &str = "get-recommendations/";
    pub const PURCHASE_PLAN: &str = "purchase-plan/";
}

/// 錯誤回應本體 `{"error": "..."}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// 將非 2xx 回應轉為錯誤，盡量取出伺服器訊息
pub fn parse_remote_error(status: u16, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty());
    ApiError::Remote { status, message }
}

/// HTTP 預測服務用戶端
#[derive(Debug, Clone)]
pub struct HttpForecastApi {
    client: Client,
    base: Url,
}

impl HttpForecastApi {
    /// 依配置建立用戶端
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base = Url::parse(&config.normalized_base_url())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// 組合端點完整位址
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let started = Instant::now();
        let response = self.client.post(url).json(body).send().await?;
        debug!(
            path,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "API 回應"
        );
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        let err = parse_remote_error(status.as_u16(), &bytes);
        warn!(status = status.as_u16(), error = %err, "API 回傳錯誤");
        return Err(err);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl ForecastApi for HttpForecastApi {
    #[instrument(skip(self, contents), fields(bytes = contents.len()))]
    async fn upload(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadAck> {
        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let url = self.endpoint(endpoints::UPLOAD)?;
        let response = self.client.post(url).multipart(form).send().await?;
        decode(response).await
    }

    #[instrument(skip(self))]
    async fn train(&self) -> Result<TrainStatus> {
        self.post_json(endpoints::TRAIN, &serde_json::json!({})).await
    }

    #[instrument(skip(self, payload), fields(rows = payload.len()))]
    async fn simulate_projection(&self, payload: &[SimulationPayload]) -> Result<Vec<SimulationResult>> {
        self.post_json(endpoints::SIMULATE_PROJECTION, payload).await
    }

    #[instrument(skip(self, results))]
    async fn recommendations(&self, results: &RecommendationRequest) -> Result<RecommendationSet> {
        self.post_json(endpoints::RECOMMENDATIONS, results).await
    }

    #[instrument(skip(self, request), fields(rows = request.proyeccion_ventas.len()))]
    async fn purchase_plan(&self, request: &PurchasePlanRequest) -> Result<Vec<PurchasePlanEntry>> {
        self.post_json(endpoints::PURCHASE_PLAN, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_core::FuelSituation;
    use rstest::rstest;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(base: &str) -> ClientConfig {
        ClientConfig::default().with_base_url(base)
    }

    #[rstest]
    #[case(endpoints::UPLOAD, "http://127.0.0.1:8000/api/upload/")]
    #[case(endpoints::TRAIN, "http://127.0.0.1:8000/api/train/")]
    #[case(endpoints::SIMULATE_PROJECTION, "http://127.0.0.1:8000/api/simulate-projection/")]
    #[case(endpoints::RECOMMENDATIONS, "http://127.0.0.1:8000/api/get-recommendations/")]
    #[case(endpoints::PURCHASE_PLAN, "http://127.0.0.1:8000/api/purchase-plan/")]
    fn test_endpoint_urls(#[case] path: &str, #[case] expected: &str) {
        let api = HttpForecastApi::new(&config("http://127.0.0.1:8000/api")).unwrap();
        assert_eq!(api.endpoint(path).unwrap().as_str(), expected);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpForecastApi::new(&config("no es una url")),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[rstest]
    #[case(br#"{"error": "Columna MES faltante"}"#.as_slice(), Some("Columna MES faltante"))]
    #[case(br#"{"error": ""}"#.as_slice(), None)]
    #[case(br#"{"detail": "x"}"#.as_slice(), None)]
    #[case(b"<html>502</html>".as_slice(), None)]
    fn test_parse_remote_error(#[case] body: &[u8], #[case] expected: Option<&str>) {
        let err = parse_remote_error(400, body);
        assert_eq!(err.remote_message(), expected);
        assert!(matches!(err, ApiError::Remote { status: 400, .. }));
    }

    /// 回應一次固定內容的 HTTP 伺服器，回傳收到的請求
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    #[tokio::test]
    async fn test_train_decodes_status() {
        let (base, server) = serve_once("200 OK", r#"{"status": "Modelo entrenado"}"#).await;
        let api = HttpForecastApi::new(&config(&base)).unwrap();

        let status = api.train().await.unwrap();
        assert_eq!(status.status, "Modelo entrenado");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/train/ "));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with("\r\n\r\n{}"));
    }

    #[tokio::test]
    async fn test_remote_error_message_is_surfaced() {
        let (base, server) = serve_once("400 Bad Request", r#"{"error": "No hay datos cargados"}"#).await;
        let api = HttpForecastApi::new(&config(&base)).unwrap();

        let err = api.train().await.unwrap_err();
        assert_eq!(err.user_message(), "No hay datos cargados");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_file_field() {
        let (base, server) = serve_once("200 OK", r#"{"status": "ok"}"#).await;
        let api = HttpForecastApi::new(&config(&base)).unwrap();

        let ack = api
            .upload("ventas.csv", b"MES,PRODUCTO\n11,DEFENSIVOS\n".to_vec())
            .await
            .unwrap();
        assert_eq!(ack.status.as_deref(), Some("ok"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/upload/ "));
        assert!(request.contains("name=\"file\"; filename=\"ventas.csv\""));
        assert!(request.contains("text/csv"));
    }

    #[tokio::test]
    async fn test_purchase_plan_posts_json() {
        let (base, server) = serve_once("200 OK", "[]").await;
        let api = HttpForecastApi::new(&config(&base)).unwrap();

        let stock = ClientConfig::default().default_stock;
        let request = PurchasePlanRequest::new(stock, FuelSituation::Severe);
        let rows = api.purchase_plan(&request).await.unwrap();
        assert!(rows.is_empty());

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/purchase-plan/ "));
        assert!(raw.contains("\"situacion_combustible\":3"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/", listener.local_addr().unwrap());
        drop(listener);

        let api = HttpForecastApi::new(&config(&base)).unwrap();
        let err = api.train().await.unwrap_err();
        assert!(err.is_transport());
    }
}
