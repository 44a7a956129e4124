pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use diesel::prelude::*;

use crate::{
    domain::UserRole,
    error::AppError,
    models::Analista,
    schema::analistas,
    state::AppState,
};

/// The acting analyst, resolved from the bearer token. Rejects with 401 when
/// the token is missing, invalid, expired, or names an unknown subject.
pub struct CurrentAnalista(pub Analista);

#[async_trait]
impl FromRequestParts<AppState> for CurrentAnalista {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        let mut conn = state.db()?;
        let analista = analistas::table
            .filter(analistas::email.eq(&claims.sub))
            .first::<Analista>(&mut conn)
            .optional()?
            .ok_or_else(AppError::unauthorized)?;

        Ok(CurrentAnalista(analista))
    }
}

pub fn require_role(actor: &Analista, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}
