use axum::{
    Form, Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use handlebars::Handlebars;
use lazy_static::lazy_static;
use log::{error, info};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::calculator::SubmissionForm;
use crate::chart::{ChartOutcome, ChartSkip};
use crate::config::AppConfig;
use crate::error::{LedgerError, SubmitError};
use crate::export::ledger_to_xlsx;
use crate::ledger::{LedgerRow, LedgerSnapshot};
use crate::service::FootprintService;

const NO_DATA_MESSAGE: &str =
    "No data available yet. Please calculate your carbon footprint first.";
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

lazy_static! {
    static ref TEMPLATES: Handlebars<'static> = {
        let mut registry = Handlebars::new();
        let sources = [
            ("index", include_str!("./templates/index.hbs")),
            ("calculate", include_str!("./templates/calculate.hbs")),
            ("result", include_str!("./templates/result.hbs")),
            ("data", include_str!("./templates/data.hbs")),
            ("graph", include_str!("./templates/graph.hbs")),
        ];
        for (name, source) in sources {
            registry.register_template_string(name, source).unwrap();
        }
        registry
    };
}

pub struct AppState {
    service: FootprintService,
}

impl AppState {
    pub fn new(service: FootprintService) -> Self {
        Self { service }
    }
}

#[derive(Serialize)]
struct RowView {
    name: String,
    year: String,
    electricity: String,
    waste: String,
    travel: String,
    total: String,
}

impl From<&LedgerRow> for RowView {
    fn from(row: &LedgerRow) -> Self {
        let amount =
            |value: Option<f64>| value.map(|v| format!("{:.2}", v)).unwrap_or_default();
        Self {
            name: row.name.clone().unwrap_or_default(),
            year: row.year.map(|y| y.to_string()).unwrap_or_default(),
            electricity: amount(row.electricity_co2),
            waste: amount(row.waste_co2),
            travel: amount(row.travel_co2),
            total: amount(row.total_co2),
        }
    }
}

/// Builds the router over a shared service
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.service.config().static_dir.clone();
    let report_dir = state.service.config().report_dir.clone();

    Router::new()
        .route("/", get(serve_index))
        .route("/calculate", get(serve_calculate_form).post(handle_calculate))
        .route("/data", get(serve_data))
        .route("/data/export.xlsx", get(export_data))
        .route("/api/records", get(get_records))
        .route("/graph", get(serve_graph))
        .nest_service("/static", ServeDir::new(static_dir))
        .nest_service("/reports", ServeDir::new(report_dir))
        .with_state(state)
}

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    let service = FootprintService::new(config)?;
    let app = router(Arc::new(AppState::new(service)));

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn render(name: &str, data: &serde_json::Value) -> Response {
    match TEMPLATES.render(name, data) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Error rendering template '{}': {}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

async fn serve_index() -> Response {
    render("index", &json!({}))
}

async fn serve_calculate_form() -> Response {
    render("calculate", &json!({}))
}

/// Runs ledger, chart and report work on the blocking pool
///
/// Every service call does file I/O under the ledger lock and some of them
/// render images or PDFs, so none of it runs on the async workers.
async fn blocking<T, F>(state: &Arc<AppState>, work: F) -> Result<T, Response>
where
    F: FnOnce(&FootprintService) -> T + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || work(&state.service))
        .await
        .map_err(|e| {
            error!("Background task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        })
}

async fn handle_calculate(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubmissionForm>,
) -> Response {
    let outcome = match blocking(&state, move |service| service.submit(&form)).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(SubmitError::Validation(e))) => {
            let page = render("calculate", &json!({ "error_message": e.to_string() }));
            return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
        }
        Ok(Err(SubmitError::Ledger(e))) => {
            error!("Error saving submission: {}", e);
            let page = render(
                "calculate",
                &json!({ "error_message": format!("Could not save your submission: {}", e) }),
            );
            return (StatusCode::INTERNAL_SERVER_ERROR, page).into_response();
        }
        Err(response) => return response,
    };

    let record = &outcome.record;
    let report_url = outcome.report.as_ref().and_then(|path| {
        path.file_name()
            .and_then(|f| f.to_str())
            .map(|f| format!("/reports/{}", urlencoding::encode(f)))
    });
    let graph_url = outcome.chart.is_rendered().then(|| cache_busted_graph_url(&state));

    render(
        "result",
        &json!({
            "name": record.name,
            "year": record.year,
            "energy": format!("{:.2}", record.electricity_co2),
            "waste": format!("{:.2}", record.waste_co2),
            "travel": format!("{:.2}", record.travel_co2),
            "total": format!("{:.2}", record.total_co2),
            "report_url": report_url,
            "graph_url": graph_url,
            "notices": outcome.notices,
        }),
    )
}

fn cache_busted_graph_url(state: &AppState) -> String {
    format!(
        "/static/{}?v={}",
        urlencoding::encode(&state.service.config().chart_file),
        chrono::Local::now().timestamp_millis()
    )
}

fn read_error_response(e: &LedgerError) -> Response {
    error!("Error reading ledger: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Error reading data: {}", e),
    )
        .into_response()
}

async fn serve_data(State(state): State<Arc<AppState>>) -> Response {
    match blocking(&state, |service| service.load_all()).await {
        Ok(Ok(LedgerSnapshot::NoData)) => (StatusCode::NOT_FOUND, NO_DATA_MESSAGE).into_response(),
        Ok(Ok(LedgerSnapshot::Rows(rows))) => {
            let rows: Vec<RowView> = rows.iter().map(RowView::from).collect();
            render("data", &json!({ "rows": rows }))
        }
        Ok(Err(e)) => read_error_response(&e),
        Err(response) => response,
    }
}

async fn export_data(State(state): State<Arc<AppState>>) -> Response {
    let exported = blocking(&state, |service| {
        service.load_all().map(|snapshot| match snapshot {
            LedgerSnapshot::NoData => None,
            snapshot => Some(ledger_to_xlsx(&snapshot).map_err(|e| e.to_string())),
        })
    })
    .await;

    match exported {
        Ok(Ok(Some(Ok(bytes)))) => (
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"carbon_data.xlsx\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Ok(Ok(Some(Err(message)))) => {
            error!("Error exporting ledger: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Export failed: {}", message),
            )
                .into_response()
        }
        Ok(Ok(None)) => (StatusCode::NOT_FOUND, NO_DATA_MESSAGE).into_response(),
        Ok(Err(e)) => read_error_response(&e),
        Err(response) => response,
    }
}

async fn get_records(State(state): State<Arc<AppState>>) -> Response {
    match blocking(&state, |service| service.load_all()).await {
        Ok(Ok(LedgerSnapshot::Rows(rows))) => {
            Json(json!({ "status": "ok", "records": rows })).into_response()
        }
        Ok(Ok(LedgerSnapshot::NoData)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "error", "message": NO_DATA_MESSAGE })),
        )
            .into_response(),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "error", "message": e.to_string() })),
        )
            .into_response(),
        Err(response) => response,
    }
}

async fn serve_graph(State(state): State<Arc<AppState>>) -> Response {
    let outcome = match blocking(&state, |service| service.render_chart()).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };

    match outcome {
        ChartOutcome::Rendered(_) => {
            render("graph", &json!({ "graph_url": cache_busted_graph_url(&state) }))
        }
        ChartOutcome::Skipped(ChartSkip::NoLedger) => (
            StatusCode::NOT_FOUND,
            "Error: data file not found. Please calculate your carbon footprint first.",
        )
            .into_response(),
        ChartOutcome::Skipped(ChartSkip::Empty) => (
            StatusCode::NOT_FOUND,
            "No data found in the ledger. Could not create chart.",
        )
            .into_response(),
        ChartOutcome::Failed(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unexpected error: {}", message),
        )
            .into_response(),
    }
}
