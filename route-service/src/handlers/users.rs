use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::dtos::users::{ChangeRoleRequest, CreateUserRequest};
use crate::dtos::PageParams;
use crate::models::RequestContext;
use crate::services::{guard, GatewayError};
use crate::utils::validation::{ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::AppState;

#[instrument(skip(state, ctx, params))]
pub async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
    params: ValidatedQuery<PageParams>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::MANAGE_USERS)?;
    let params = params.into_inner()?;
    Ok(Json(state.users.list(&ctx, params.into()).await?))
}

#[instrument(skip(state, ctx, body))]
pub async fn create_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::MANAGE_USERS)?;
    let req = body.into_inner()?;
    let user = state.users.create(&ctx, req.into()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, ctx, id, body))]
pub async fn change_role(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
    body: ValidatedJson<ChangeRoleRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::MANAGE_USERS)?;
    let id = id.into_inner()?;
    let req = body.into_inner()?;
    Ok(Json(state.users.change_role(&ctx, id, req.role).await?))
}

#[instrument(skip(state, ctx, id))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::MANAGE_USERS)?;
    state.users.deactivate(&ctx, id.into_inner()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
