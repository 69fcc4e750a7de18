use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::instrument;

use crate::dtos::users::{LoginRequest, LoginResponse};
use crate::models::RequestContext;
use crate::services::GatewayError;
use crate::utils::password::Password;
use crate::utils::validation::ValidatedJson;
use crate::AppState;

/// Verify credentials and set the session cookie.
#[instrument(skip(state, jar, body))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let req = body.into_inner()?;
    let session = state
        .users
        .login(&req.username, &Password::new(req.password))
        .await?;

    let cookie = Cookie::build((state.config.cookie.name.clone(), session.token))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie.secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(session.expires_in))
        .build();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            expires_in: session.expires_in,
            user: session.user,
        }),
    ))
}

/// Clear the session cookie. Tokens are stateless, so this always succeeds.
#[instrument(skip(state, jar))]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let cookie = Cookie::build((state.config.cookie.name.clone(), ""))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie.secure)
        .same_site(SameSite::Strict)
        .build();

    (jar.remove(cookie), StatusCode::NO_CONTENT)
}

#[instrument(skip(state, ctx))]
pub async fn me(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(state.users.me(&ctx)?))
}
