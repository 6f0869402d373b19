//! Per-request cart identity.
//!
//! Authentication happens upstream; a gateway that has verified the caller
//! forwards their id in `X-User-Id`. Requests without the header act on the
//! guest cart named by the session id in the path.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::cart::CartOwner;
use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestUser(Option<Uuid>);

impl RequestUser {
    fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let Some(raw) = headers.get(USER_ID_HEADER) else {
            return Ok(Self(None));
        };
        raw.to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(|id| Self(Some(id)))
            .ok_or_else(|| AppError::BadRequest(format!("{USER_ID_HEADER} must be a UUID")))
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.0
    }

    /// The authenticated user's cart if there is one, otherwise the guest cart.
    pub fn cart_owner(&self, session_id: String) -> CartOwner {
        match self.0 {
            Some(user_id) => CartOwner::User(user_id),
            None => CartOwner::Guest(session_id),
        }
    }

    pub fn require(&self) -> Result<Uuid, AppError> {
        self.0.ok_or(AppError::Unauthorized)
    }
}

impl FromRequest for RequestUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::from_headers(req.headers()))
    }
}
