use axum::{extract::State, response::IntoResponse, Json};
use tracing::instrument;

use crate::dtos::audit::AuditLogParams;
use crate::models::{PageRequest, RequestContext};
use crate::services::{guard, GatewayError};
use crate::utils::validation::ValidatedQuery;
use crate::AppState;

/// Global audit log, newest first.
#[instrument(skip(state, ctx, params))]
pub async fn list_audit_log(
    State(state): State<AppState>,
    ctx: RequestContext,
    params: ValidatedQuery<AuditLogParams>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::READ_AUDIT_LOG)?;
    let params = params.into_inner()?;
    let filter = params.to_filter()?;
    let page = PageRequest::new(params.page, params.size);
    Ok(Json(state.routes.audit_log(&ctx, filter, page).await?))
}
