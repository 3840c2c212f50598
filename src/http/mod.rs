//! JSON HTTP API.
//!
//! | Route | Operation |
//! |---|---|
//! | `POST /api/inquiries` | submit inquiry (public) |
//! | `GET /api/inquiries?page&limit&status` | list (admin) |
//! | `GET /api/inquiries/{id}?email` | detail |
//! | `PATCH /api/inquiries/{id}` | set status (admin) |
//! | `GET /api/inquiries/{id}/messages?email` | thread |
//! | `POST /api/inquiries/{id}/messages` | append message |
//! | `GET /api/admin/stats` | dashboard counts (admin) |
//! | `GET /health` | liveness |
//!
//! Errors are returned as `{"error": kind, "message": ..., "field"?: ...}`.

pub mod session;

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

use self::session::{bearer_token, SessionResolver};
use crate::inquiry::access::Caller;
use crate::inquiry::service::{AppendRequest, InquiryService, ServiceError};
use crate::inquiry::{InquiryDraft, InquiryFilter, InquiryStatus, PageRequest};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: InquiryService,
    sessions: Arc<dyn SessionResolver>,
    default_page_size: u32,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("default_page_size", &self.default_page_size)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Bundle the service with a session resolver.
    pub fn new(
        service: InquiryService,
        sessions: Arc<dyn SessionResolver>,
        default_page_size: u32,
    ) -> Self {
        Self {
            service,
            sessions,
            default_page_size,
        }
    }

    fn caller(&self, headers: &HeaderMap) -> Caller {
        self.sessions.resolve(bearer_token(headers))
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/inquiries", get(list_inquiries).post(create_inquiry))
        .route(
            "/api/inquiries/{id}",
            get(get_inquiry).patch(update_status),
        )
        .route(
            "/api/inquiries/{id}/messages",
            get(list_messages).post(append_message),
        )
        .route("/api/admin/stats", get(stats))
        .with_state(Arc::new(state))
}

/// Serve `router` on `listener` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "http server listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl ServiceError {
    /// HTTP status for this error kind.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Validation { field, message } => ErrorBody {
                error: "validation",
                message: message.clone(),
                field: Some(*field),
            },
            Self::NotFound => ErrorBody {
                error: "not_found",
                message: "not found".to_owned(),
                field: None,
            },
            Self::Unauthorized => ErrorBody {
                error: "unauthorized",
                message: "unauthorized".to_owned(),
                field: None,
            },
            Self::Conflict(message) => ErrorBody {
                error: "conflict",
                message: message.clone(),
                field: None,
            },
            Self::Store(_) | Self::Catalog(_) => {
                error!(error = %self, "request failed");
                ErrorBody {
                    error: "internal",
                    message: "internal server error".to_owned(),
                    field: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

fn bad_body(rejection: &JsonRejection) -> ServiceError {
    ServiceError::validation("body", rejection.body_text())
}

fn bad_query(rejection: &QueryRejection) -> ServiceError {
    ServiceError::validation("query", rejection.body_text())
}

fn parse_positive(field: &'static str, raw: Option<&str>, default: u32) -> Result<u32, ServiceError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ServiceError::validation(field, format!("{field} must be a positive integer"))),
    }
}

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CreateBody {
    name: String,
    email: String,
    product_id: String,
    quantity: i64,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    page: Option<String>,
    limit: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmailQuery {
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusBody {
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageBody {
    content: String,
    sender: String,
    email: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> &'static str {
    "ok"
}

async fn create_inquiry(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(body) = body.map_err(|r| bad_body(&r))?;
    let quantity = u32::try_from(body.quantity).map_err(|_| {
        ServiceError::validation(
            "quantity",
            format!("quantity must be between 1 and {}", u32::MAX),
        )
    })?;
    let draft = InquiryDraft {
        name: body.name,
        email: body.email,
        product_id: body.product_id,
        quantity,
        message: body.message,
    };
    let detail = state.service.create(draft).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn list_inquiries(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let caller = state.caller(&headers);
    let Query(query) = query.map_err(|r| bad_query(&r))?;
    let page = parse_positive("page", query.page.as_deref(), 1)?;
    let limit = parse_positive("limit", query.limit.as_deref(), state.default_page_size)?;
    let page = PageRequest::new(page, limit)?;
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(InquiryStatus::parse(raw).map_err(|_| {
            ServiceError::validation(
                "status",
                "status must be one of pending, processing, completed, cancelled",
            )
        })?),
    };

    let page = state
        .service
        .list(caller, InquiryFilter { status }, page)
        .await?;
    Ok(Json(page))
}

async fn get_inquiry(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let caller = state.caller(&headers);
    let Query(query) = query.map_err(|r| bad_query(&r))?;
    let detail = state
        .service
        .get(caller, &id, query.email.as_deref())
        .await?;
    Ok(Json(detail))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let caller = state.caller(&headers);
    let Json(body) = body.map_err(|r| bad_body(&r))?;
    let detail = state
        .service
        .update_status(caller, &id, body.status.trim())
        .await?;
    Ok(Json(detail))
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let caller = state.caller(&headers);
    let Query(query) = query.map_err(|r| bad_query(&r))?;
    let messages = state
        .service
        .messages(caller, &id, query.email.as_deref())
        .await?;
    Ok(Json(messages))
}

async fn append_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<MessageBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let caller = state.caller(&headers);
    let Json(body) = body.map_err(|r| bad_body(&r))?;
    let message = state
        .service
        .append_message(
            caller,
            &id,
            AppendRequest {
                content: &body.content,
                sender: &body.sender,
                email: body.email.as_deref(),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let caller = state.caller(&headers);
    Ok(Json(state.service.stats(caller).await?))
}
