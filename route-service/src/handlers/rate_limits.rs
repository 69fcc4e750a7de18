use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::dtos::rate_limits::PolicyRequest;
use crate::dtos::PageParams;
use crate::models::RequestContext;
use crate::services::{guard, GatewayError};
use crate::utils::validation::{ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::AppState;

#[instrument(skip(state, ctx, params))]
pub async fn list_policies(
    State(state): State<AppState>,
    ctx: RequestContext,
    params: ValidatedQuery<PageParams>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::READ_RATE_LIMITS)?;
    let params = params.into_inner()?;
    Ok(Json(state.rate_limits.list(&ctx, params.into()).await?))
}

#[instrument(skip(state, ctx, id))]
pub async fn get_policy(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::READ_RATE_LIMITS)?;
    Ok(Json(state.rate_limits.get(&ctx, id.into_inner()?).await?))
}

#[instrument(skip(state, ctx, body))]
pub async fn create_policy(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: ValidatedJson<PolicyRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::MANAGE_RATE_LIMITS)?;
    let req = body.into_inner()?;
    let policy = state.rate_limits.create(&ctx, req.into()).await?;
    Ok((StatusCode::CREATED, Json(policy)))
}

#[instrument(skip(state, ctx, id, body))]
pub async fn update_policy(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
    body: ValidatedJson<PolicyRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::MANAGE_RATE_LIMITS)?;
    let id = id.into_inner()?;
    let req = body.into_inner()?;
    Ok(Json(state.rate_limits.update(&ctx, id, req.into()).await?))
}

#[instrument(skip(state, ctx, id))]
pub async fn delete_policy(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::MANAGE_RATE_LIMITS)?;
    state.rate_limits.delete(&ctx, id.into_inner()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
