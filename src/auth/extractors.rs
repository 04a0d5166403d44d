use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use super::token::Claims;
use crate::error::AppError;

/// The identity behind the current request.
///
/// Only available on routes wrapped by `AuthMiddleware`, which puts the
/// validated [`Claims`] into the request extensions. Missing claims, or a
/// subject that is not a user id, are reported as `AppError::Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub claims: Claims,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<Claims>().and_then(|claims| {
            claims.user_id().map(|id| AuthenticatedUser {
                id,
                claims: claims.clone(),
            })
        });

        match user {
            Some(user) => ready(Ok(user)),
            None => {
                log::warn!("no usable claims on {}; is AuthMiddleware active?", req.path());
                ready(Err(AppError::Unauthorized.into()))
            }
        }
    }
}
