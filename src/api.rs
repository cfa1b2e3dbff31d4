// 🌐 HTTP API - record endpoints + spreadsheet proxy (Axum)
//
// Store calls are synchronous, so every handler hops onto the blocking pool.

use crate::aggregate::Dashboard;
use crate::error::StoreError;
use crate::record::{HealthInput, IdGenerator, Record};
use crate::store::{RecordStore, SheetStore};
use crate::validation::{describe, validate_input};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub sheet: Option<Arc<SheetStore>>,
    pub ids: Arc<IdGenerator>,
    pub max_records: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, sheet: Option<SheetStore>, max_records: usize) -> Self {
        AppState {
            store,
            sheet: sheet.map(Arc::new),
            ids: Arc::new(IdGenerator::new()),
            max_records,
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Serialize)]
struct SaveResponse {
    status: &'static str,
    total: Option<usize>,
    record: Record,
}

fn error_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn invalid_body(rejection: JsonRejection) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        json!({ "error": "Corpo da requisição inválido", "details": rejection.body_text() }),
    )
}

async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(StoreError::Io(std::io::Error::other(e))),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// Any route, wrong method
async fn method_not_allowed() -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        json!({ "error": "Método não permitido" }),
    )
}

/// POST /api/saveEntry - Validate, derive metrics, persist
async fn save_entry(
    State(state): State<AppState>,
    payload: Result<Json<HealthInput>, JsonRejection>,
) -> Response {
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => return invalid_body(rejection),
    };

    if let Err(errors) = validate_input(&input) {
        warn!(errors = %describe(&errors), "Rejected entry");
        return error_response(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Dados inválidos", "details": errors }),
        );
    }

    let record = Record::new(state.ids.next_id(), &input);
    let store = Arc::clone(&state.store);
    let to_store = record.clone();

    match run_blocking(move || store.submit(&to_store)).await {
        Ok(total) => {
            info!(id = record.id, imc = record.bmi, risco = %record.risk, "Entry saved");
            (
                StatusCode::OK,
                Json(SaveResponse {
                    status: "ok",
                    total,
                    record,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(backend = state.store.name(), error = %e, "Error saving entry");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Erro ao salvar registro", "details": e.to_string() }),
            )
        }
    }
}

/// GET /api/getEntries - Newest first; an unreadable store is an empty list
async fn get_entries(State(state): State<AppState>) -> Response {
    let store = Arc::clone(&state.store);
    let limit = state.max_records;

    match run_blocking(move || store.fetch_all(limit)).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            warn!(backend = state.store.name(), error = %e, "Error reading entries, answering empty list");
            (StatusCode::OK, Json(Vec::<Record>::new())).into_response()
        }
    }
}

/// GET /api/dashboard - Aggregated views
async fn get_dashboard(State(state): State<AppState>) -> Response {
    let store = Arc::clone(&state.store);
    let limit = state.max_records;

    match run_blocking(move || store.fetch_all(limit)).await {
        Ok(records) => (StatusCode::OK, Json(Dashboard::from_records(&records))).into_response(),
        Err(e) => {
            error!(backend = state.store.name(), error = %e, "Error building dashboard");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Erro ao carregar registros", "details": e.to_string() }),
            )
        }
    }
}

fn sheet_not_configured() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": StoreError::NotConfigured("sheet").to_string() }),
    )
}

/// POST /api/sendToSheet - Forward the raw body to the spreadsheet
async fn send_to_sheet(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return invalid_body(rejection),
    };
    let Some(sheet) = state.sheet.clone() else {
        return sheet_not_configured();
    };

    match run_blocking(move || sheet.forward_raw(&body)).await {
        Ok(answer) => (StatusCode::OK, Json(answer)).into_response(),
        Err(StoreError::Upstream { body, .. }) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Erro ao enviar para Google Sheets", "details": body }),
        ),
        Err(e) => {
            error!(error = %e, "Internal error forwarding to sheet");
            let details = e.details().map(str::to_string).unwrap_or_else(|| e.to_string());
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Erro interno do servidor", "details": details }),
            )
        }
    }
}

/// GET /api/getSheetData - Raw spreadsheet rows
async fn get_sheet_data(State(state): State<AppState>) -> Response {
    let Some(sheet) = state.sheet.clone() else {
        return sheet_not_configured();
    };

    match run_blocking(move || sheet.fetch_raw()).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(StoreError::NotJson { raw }) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Resposta da planilha não é JSON", "raw": raw }),
        ),
        Err(e) => {
            error!(error = %e, "Error in getSheetData");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": e.to_string() }),
            )
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check).fallback(method_not_allowed))
        .route("/saveEntry", post(save_entry).fallback(method_not_allowed))
        .route("/getEntries", get(get_entries).fallback(method_not_allowed))
        .route("/dashboard", get(get_dashboard).fallback(method_not_allowed))
        .route("/sendToSheet", post(send_to_sheet).fallback(method_not_allowed))
        .route("/getSheetData", get(get_sheet_data).fallback(method_not_allowed))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(addr, backend = state.store.name(), "Server listening");

    axum::serve(listener, router(state))
        .await
        .context("Server stopped with an error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_upstream::{dead_url, Upstream};
    use crate::store::{FileStore, MemoryStore};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn memory_app() -> Router {
        router(AppState::new(Arc::new(MemoryStore::new()), None, 5000))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn entry() -> Value {
        json!({
            "sexo": "Masculino", "idade": 70, "peso": 90, "altura": 1.70,
            "diabetes": "Sim", "hipertensao": "Não", "habitos": "Ruim"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(memory_app(), get_req("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_save_then_get_entries() {
        let app = memory_app();

        let (status, body) = send(app.clone(), post_json("/api/saveEntry", entry())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["total"], 1);
        assert_eq!(body["record"]["imc"], 31.14);
        assert_eq!(body["record"]["categoria"], "Obesidade");
        assert_eq!(body["record"]["risco"], "Alto");

        let mut second = entry();
        second["idade"] = json!(20);
        send(app.clone(), post_json("/api/saveEntry", second)).await;

        let (status, body) = send(app, get_req("/api/getEntries")).await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["idade"], 20);
        assert!(entries[0]["id"].as_i64().unwrap() > entries[1]["id"].as_i64().unwrap());
    }

    #[tokio::test]
    async fn test_save_rejects_out_of_range() {
        let mut body = entry();
        body["altura"] = json!(0);
        body["idade"] = json!(200);

        let (status, body) = send(memory_app(), post_json("/api/saveEntry", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_rejects_bad_enum() {
        let mut body = entry();
        body["habitos"] = json!("Excelente");

        let (status, body) = send(memory_app(), post_json("/api/saveEntry", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let (status, body) = send(memory_app(), get_req("/api/saveEntry")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "Método não permitido");

        let (status, _) = send(memory_app(), post_json("/api/getEntries", json!({}))).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unreadable_file_store_gives_empty_list() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ broken").unwrap();
        let app = router(AppState::new(Arc::new(FileStore::new(path)), None, 5000));

        let (status, body) = send(app, get_req("/api/getEntries")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let app = memory_app();
        send(app.clone(), post_json("/api/saveEntry", entry())).await;

        let (status, body) = send(app, get_req("/api/dashboard")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["riskDistribution"][0], json!({ "name": "Alto", "value": 1 }));
        assert_eq!(body["ageImc"]["comDiabetes"][0]["idade"], 70);
    }

    #[tokio::test]
    async fn test_sheet_routes_without_configuration() {
        let (status, body) = send(memory_app(), get_req("/api/getSheetData")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "sheet backend is not configured");

        let (status, _) = send(memory_app(), post_json("/api/sendToSheet", entry())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_send_to_sheet_rejects_malformed_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/sendToSheet")
            .header("content-type", "application/json")
            .body(Body::from("{ not json"))
            .unwrap();

        let (status, body) = send(memory_app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Corpo da requisição inválido");
        assert!(body["details"].is_string());

        let request = Request::builder()
            .method("POST")
            .uri("/api/sendToSheet")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(memory_app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Corpo da requisição inválido");
    }

    // The blocking sheet client must be built and dropped outside the
    // runtime, so these tests drive their own runtime.
    fn with_sheet(url: String, request: Request<Body>) -> (StatusCode, Value) {
        let sheet = Arc::new(SheetStore::new(url).unwrap());
        let state = AppState {
            sheet: Some(Arc::clone(&sheet)),
            ..AppState::new(Arc::new(MemoryStore::new()), None, 5000)
        };

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(send(router(state), request));
        drop(runtime);
        drop(sheet);
        result
    }

    #[test]
    fn test_send_to_sheet_passes_answer_through() {
        let upstream = Upstream::serve(vec![(200, "application/json", r#"{"status":"success"}"#.to_string())]);

        let (status, body) = with_sheet(upstream.url.clone(), post_json("/api/sendToSheet", entry()));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "success" }));

        let requests = upstream.requests();
        let forwarded: Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(forwarded, entry());
    }

    #[test]
    fn test_send_to_sheet_upstream_failure() {
        let upstream = Upstream::serve(vec![(500, "text/plain", "boom".to_string())]);

        let (status, body) = with_sheet(upstream.url.clone(), post_json("/api/sendToSheet", entry()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "Erro ao enviar para Google Sheets", "details": "boom" })
        );
        upstream.requests();
    }

    #[test]
    fn test_send_to_sheet_unreachable_upstream() {
        let (status, body) = with_sheet(dead_url(), post_json("/api/sendToSheet", entry()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Erro interno do servidor");
        assert!(body["details"].is_string());
    }

    #[test]
    fn test_get_sheet_data_passes_rows_through() {
        let upstream = Upstream::serve(vec![(200, "application/json", "[1,2]".to_string())]);

        let (status, body) = with_sheet(upstream.url.clone(), get_req("/api/getSheetData"));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([1, 2]));

        let requests = upstream.requests();
        assert!(requests[0].request_line.contains("action=getData"));
    }

    #[test]
    fn test_get_sheet_data_non_json_answer() {
        let upstream = Upstream::serve(vec![(200, "text/html", "<html>x</html>".to_string())]);

        let (status, body) = with_sheet(upstream.url.clone(), get_req("/api/getSheetData"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "Resposta da planilha não é JSON", "raw": "<html>x</html>" })
        );
        upstream.requests();
    }
}
