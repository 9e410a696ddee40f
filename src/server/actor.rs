//! Resolve the acting user from the authentication layer's header.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::ApiError;
use super::AppState;
use crate::error::AppError;
use crate::models::Actor;

/// Header set by the authentication proxy in front of the server.
pub const USER_HEADER: &str = "x-evidence-user";

/// The actor behind a request. No header means a visitor.
pub struct CurrentActor(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_HEADER) else {
            return Ok(Self(Actor::Visitor));
        };
        let username = value
            .to_str()
            .map_err(|_| AppError::Validation("Malformed user header".to_string()))?
            .trim();
        if username.is_empty() {
            return Ok(Self(Actor::Visitor));
        }
        match state.users.get_by_username(username).await? {
            Some(user) => Ok(Self(Actor::from_user(&user))),
            None => Err(AppError::Authorization(format!("Unknown user {:?}", username)).into()),
        }
    }
}

pub fn require_admin(actor: &Actor) -> Result<(), ApiError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization("Administrators only".to_string()).into())
    }
}
