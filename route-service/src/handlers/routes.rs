use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::dtos::routes::{
    CreateRouteRequest, HistoryParams, ListRoutesParams, RejectRouteRequest, UpdateRouteRequest,
};
use crate::dtos::PageParams;
use crate::models::{PageRequest, RequestContext};
use crate::services::{guard, GatewayError};
use crate::utils::validation::{ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::AppState;

#[instrument(skip(state, ctx, body))]
pub async fn create_route(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: ValidatedJson<CreateRouteRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::CREATE_ROUTE)?;
    let req = body.into_inner()?;
    let route = state.routes.create_route(&ctx, req.into()).await?;
    Ok((StatusCode::CREATED, Json(route)))
}

#[instrument(skip(state, ctx, params))]
pub async fn list_routes(
    State(state): State<AppState>,
    ctx: RequestContext,
    params: ValidatedQuery<ListRoutesParams>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::VIEW_ROUTES)?;
    let params = params.into_inner()?;
    let query = params.to_query()?;
    let page = PageRequest::new(params.page, params.size);
    Ok(Json(state.routes.list_routes(&ctx, query, page).await?))
}

#[instrument(skip(state, ctx, params))]
pub async fn list_pending_routes(
    State(state): State<AppState>,
    ctx: RequestContext,
    params: ValidatedQuery<PageParams>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::REVIEW_ROUTE)?;
    let params = params.into_inner()?;
    Ok(Json(
        state
            .routes
            .list_pending_routes(&ctx, params.into())
            .await?,
    ))
}

#[instrument(skip(state, ctx, id))]
pub async fn get_route(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::VIEW_ROUTES)?;
    let id = id.into_inner()?;
    Ok(Json(state.routes.get_route(&ctx, id).await?))
}

#[instrument(skip(state, ctx, id, body))]
pub async fn update_route(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
    body: ValidatedJson<UpdateRouteRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::UPDATE_ROUTE)?;
    let id = id.into_inner()?;
    let req = body.into_inner()?;
    Ok(Json(state.routes.update_route(&ctx, id, req.into()).await?))
}

#[instrument(skip(state, ctx, id))]
pub async fn delete_route(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::DELETE_ROUTE)?;
    state.routes.delete_route(&ctx, id.into_inner()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, ctx, id))]
pub async fn submit_route(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::SUBMIT_ROUTE)?;
    Ok(Json(state.routes.submit_route(&ctx, id.into_inner()?).await?))
}

#[instrument(skip(state, ctx, id))]
pub async fn approve_route(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::REVIEW_ROUTE)?;
    Ok(Json(state.routes.approve_route(&ctx, id.into_inner()?).await?))
}

/// A missing or unparseable body is treated as a missing reason.
#[instrument(skip(state, ctx, id, body))]
pub async fn reject_route(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
    body: Option<Json<RejectRouteRequest>>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::REVIEW_ROUTE)?;
    let id = id.into_inner()?;
    let reason = body.and_then(|Json(req)| req.reason);
    Ok(Json(state.routes.reject_route(&ctx, id, reason).await?))
}

#[instrument(skip(state, ctx, id))]
pub async fn clone_route(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::CLONE_ROUTE)?;
    let route = state.routes.clone_route(&ctx, id.into_inner()?).await?;
    Ok((StatusCode::CREATED, Json(route)))
}

#[instrument(skip(state, ctx, id, params))]
pub async fn route_history(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: ValidatedPath<Uuid>,
    params: ValidatedQuery<HistoryParams>,
) -> Result<impl IntoResponse, GatewayError> {
    guard::authorize(&ctx, &guard::VIEW_ROUTES)?;
    let id = id.into_inner()?;
    let params = params.into_inner()?;
    let page = PageRequest::new(params.page, params.size);
    Ok(Json(
        state
            .routes
            .route_history(&ctx, id, params.from, params.to, page)
            .await?,
    ))
}
