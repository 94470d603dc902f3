// Retirement Limits - Web Server
// REST API over the limits catalog with Axum

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use retirement_limits::validation::validate_year;
use retirement_limits::{
    init_logger, AccountType, FilingStatus, LimitQuery, LimitType, LimitsConfig, LimitsError,
    LimitsService, Money, PhaseOutAccountType, SqliteCatalog,
};

#[derive(Debug, Parser)]
#[command(name = "limits-server")]
#[command(about = "HTTP API for retirement contribution limits")]
struct Args {
    /// Path to limits.toml
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: Arc<LimitsService<SqliteCatalog>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// 200 with data, 404 when nothing is published
fn found_or_404<T: Serialize>(found: Option<T>, what: String) -> Response {
    match found {
        Some(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(format!("No {} published", what))),
        )
            .into_response(),
    }
}

/// Bad input → 400, anything else → 500
fn error_response(e: LimitsError) -> Response {
    if e.is_invalid_input() {
        (StatusCode::BAD_REQUEST, Json(ApiResponse::<()>::error(e.to_string()))).into_response()
    } else {
        tracing::error!(error = %e, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error("Internal server error")),
        )
            .into_response()
    }
}

fn parse_year(raw: &str) -> Result<i32, LimitsError> {
    let year = raw
        .parse()
        .map_err(|_| LimitsError::invalid_input("year", raw, "expected a four digit year"))?;
    validate_year(year)?;
    Ok(year)
}

fn parse_account_type(raw: &str) -> Result<AccountType, LimitsError> {
    let decoded = urlencoding::decode(raw)
        .unwrap_or_else(|_| raw.into())
        .into_owned();
    AccountType::from_token(&decoded)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/v1/limits/years - Years with published limits
async fn get_years(State(state): State<AppState>) -> Response {
    match state.service.available_years() {
        Ok(years) => (StatusCode::OK, Json(ApiResponse::ok(years))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/limits/:year - All facts for a year
async fn get_year(State(state): State<AppState>, Path(year): Path<String>) -> Response {
    let result = parse_year(&year).and_then(|year| state.service.limits_by_year(year));

    match result {
        Ok(found) => found_or_404(found, format!("limits for {}", year)),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/limits/:year/:account_type - All limit types for one account
async fn get_account_type(
    State(state): State<AppState>,
    Path((year, account_type)): Path<(String, String)>,
) -> Response {
    let result = parse_year(&year).and_then(|year| {
        let account_type = parse_account_type(&account_type)?;
        state
            .service
            .limits_by_year_and_account_type(year, account_type)
    });

    match result {
        Ok(found) => found_or_404(found, format!("{} limits for {}", account_type, year)),
        Err(e) => error_response(e),
    }
}

/// Query string for the resolve endpoint. Everything arrives as text so
/// bad values produce the same JSON 400 as every other input error.
#[derive(Debug, Default, Deserialize)]
struct ResolveParams {
    limit_type: Option<String>,
    age: Option<String>,
    filing_status: Option<String>,
    magi: Option<String>,
    phase_out_type: Option<String>,
}

impl ResolveParams {
    fn into_query(self, year: i32, account_type: AccountType) -> Result<LimitQuery, LimitsError> {
        let mut query = LimitQuery::new(year, account_type);

        if let Some(raw) = self.limit_type {
            query.limit_type = Some(LimitType::from_token(&raw)?);
        }
        if let Some(raw) = self.age {
            let age = raw
                .trim()
                .parse()
                .map_err(|_| LimitsError::invalid_input("age", &raw, "expected a whole number"))?;
            query.age_at_year_end = Some(age);
        }
        if let Some(raw) = self.phase_out_type {
            query.phase_out_type = Some(PhaseOutAccountType::from_token(&raw)?);
        }

        match (self.filing_status, self.magi) {
            (Some(status), Some(magi)) => {
                let status = FilingStatus::from_token(&status)?;
                let magi: Money = magi.parse()?;
                query = query.income(status, magi);
            }
            (Some(status), None) => {
                return Err(LimitsError::invalid_input(
                    "magi",
                    "",
                    format!("required together with filing_status '{}'", status),
                ))
            }
            (None, Some(magi)) => {
                return Err(LimitsError::invalid_input(
                    "filing_status",
                    "",
                    format!("required together with magi '{}'", magi),
                ))
            }
            (None, None) => {}
        }

        Ok(query)
    }
}

/// GET /api/v1/limits/:year/:account_type/resolve - Eligibility + phase-out
async fn resolve_limits(
    State(state): State<AppState>,
    Path((year, account_type)): Path<(String, String)>,
    Query(params): Query<ResolveParams>,
) -> Response {
    let result = parse_year(&year).and_then(|year| {
        let account_type = parse_account_type(&account_type)?;
        let query = params.into_query(year, account_type)?;
        state.service.resolve(&query)
    });

    match result {
        Ok(found) => found_or_404(found, format!("matching {} limits for {}", account_type, year)),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Router
// ============================================================================

fn app(state: AppState) -> Router {
    let limits_routes = Router::new()
        .route("/years", get(get_years))
        .route("/:year", get(get_year))
        .route("/:year/:account_type", get(get_account_type))
        .route("/:year/:account_type/resolve", get(resolve_limits));

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .nest("/v1/limits", limits_routes)
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = LimitsConfig::load(args.config.as_deref()).context("Failed to load config")?;
    init_logger(args.verbose || config.logging.verbose, config.logging.json);

    println!("🌐 Retirement Limits - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let catalog = SqliteCatalog::open(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path))?;
    println!("✓ Database opened: {}", config.database.path);

    let state = AppState {
        service: Arc::new(LimitsService::new(catalog)),
    };

    let addr = config.bind_address()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/v1/limits/years", addr);
    println!("\n   Press Ctrl+C to stop\n");
    tracing::info!(%addr, "limits server started");

    axum::serve(listener, app(state))
        .await
        .context("Server error")?;

    Ok(())
}
