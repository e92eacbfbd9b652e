use axum::{
    extract::{FromRequest, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Extension, Json, Router,
};

use super::types::{
    CreateInvoice, CreatedInvoice, ListQuery, StatusChange, StatusChangeResponse, SuccessResponse,
    UpdateInvoice,
};
use crate::context::CallerContext;
use crate::error::AppError;
use crate::models::{InvoiceChanges, InvoiceResponse};
use crate::AppState;

/// JSON body extractor whose rejections become [`AppError::Validation`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Invoice routes, relative to the `/api/invoices` prefix.
///
/// Handlers expect a [`CallerContext`] in the request extensions, so the
/// router must be wrapped in the auth and context middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route(
            "/:id",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/:id/status", patch(change_status))
        .route("/:id/pdf", get(export_pdf))
}

/// List the caller's invoices.
///
/// GET /api/invoices?status=overdue
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    let invoices = state
        .invoices
        .list(&caller.team, query.status.as_deref())
        .await?;

    Ok(Json(invoices.into_iter().map(InvoiceResponse::from).collect()))
}

/// Create an invoice.
///
/// POST /api/invoices
pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    AppJson(req): AppJson<CreateInvoice>,
) -> Result<(StatusCode, Json<CreatedInvoice>), AppError> {
    let created = state.invoices.create(&caller.team, req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/invoices/:id
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state.invoices.get(&caller.team, id).await?;
    Ok(Json(invoice.into()))
}

/// PUT /api/invoices/:id
pub async fn update_invoice(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<i64>,
    AppJson(req): AppJson<UpdateInvoice>,
) -> Result<Json<SuccessResponse>, AppError> {
    let changes = InvoiceChanges::try_from(req)?;
    state.invoices.update(&caller.team, id, changes).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/invoices/:id
pub async fn delete_invoice(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.invoices.delete(&caller.team, id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// PATCH /api/invoices/:id/status
pub async fn change_status(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<i64>,
    AppJson(req): AppJson<StatusChange>,
) -> Result<Json<StatusChangeResponse>, AppError> {
    let status = state
        .invoices
        .change_status(&caller.team, id, &req.status)
        .await?;

    Ok(Json(StatusChangeResponse {
        success: true,
        status: status.to_string(),
    }))
}

/// Download the invoice as a PDF attachment.
///
/// GET /api/invoices/:id/pdf
pub async fn export_pdf(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let document = state.invoices.export_pdf(&caller.team, id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", document.filename),
            ),
        ],
        document.bytes,
    )
        .into_response())
}
