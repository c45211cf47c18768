use axum::{
    extract::{FromRequestParts, FromRef},
    http::{request::Parts, StatusCode},
};
use crate::api::extractors::auth::{decode_claims, ACCESS_TOKEN_COOKIE};
use crate::domain::models::auth::Identity;
use crate::state::AppState;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{debug, Span};

/// Identity when a valid access token is present; guests get `None`.
pub struct MaybeAuthUser(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        let Some(cookies) = parts.extensions.get::<Cookies>() else {
            return Ok(MaybeAuthUser(None));
        };
        let Some(access_token) = cookies.get(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()) else {
            return Ok(MaybeAuthUser(None));
        };

        match decode_claims(&app_state.config, &access_token) {
            Ok(claims) => {
                Span::current().record("user_id", &claims.sub);
                Ok(MaybeAuthUser(Some(Identity { user_id: claims.sub, role: claims.role })))
            }
            Err(status) => {
                // Expired or forged tokens continue as guest.
                debug!(%status, "MaybeAuth: token rejected, continuing as guest");
                Ok(MaybeAuthUser(None))
            }
        }
    }
}
