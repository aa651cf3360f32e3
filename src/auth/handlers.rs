use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        error::AuthError,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, AuthError>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AuthError> {
    let auth = state.auth.register(payload).await?;
    let jar = jar.add(session_cookie(&auth.token));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            message: "User registered successfully".into(),
            success: true,
            user: PublicUser::from(auth.user),
            token: auth.token,
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AuthError>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AuthError> {
    let auth = state.auth.login(payload).await?;
    let jar = jar.add(session_cookie(&auth.token));
    Ok((
        StatusCode::OK,
        jar,
        Json(AuthResponse {
            message: "User logged in successfully".into(),
            success: true,
            user: PublicUser::from(auth.user),
            token: auth.token,
        }),
    ))
}

/// The token also travels as a cookie so browser clients get a session
/// without touching the response body.
fn session_cookie(token: &str) -> Cookie<'static> {
    let mut cookie = Cookie::new("token", token.to_owned());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_scoped_and_http_only() {
        let cookie = session_cookie("abc123");
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }
}
