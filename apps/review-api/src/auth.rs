//! Requesting user, as asserted by the authenticating proxy in front of the API

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use review_export::Viewer;

use crate::error::ApiError;

pub const EMAIL_HEADER: &str = "x-forwarded-email";
pub const USER_HEADER: &str = "x-forwarded-user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub email: String,
    pub display_name: String,
}

impl CurrentUser {
    pub fn viewer(&self) -> Viewer {
        Viewer {
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let email = header(EMAIL_HEADER).ok_or(ApiError::Unauthenticated)?;
        let display_name = header(USER_HEADER).unwrap_or_else(|| email.clone());

        Ok(CurrentUser {
            email,
            display_name,
        })
    }
}
