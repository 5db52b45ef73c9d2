//! Extractors that reject with [`AppError`]; body extractors also run field
//! validation.

use axum::{
    extract::{
        path::ErrorKind, rejection::PathRejection, FromRequest, FromRequestParts, Path,
        RawPathParams, Request,
    },
    http::request::Parts,
    Form, Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::AppError;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub error: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, error: impl Into<String>) -> Self {
        Self {
            field,
            error: error.into(),
        }
    }
}

/// Field-level checks run after deserialization.
pub trait Validate {
    fn violations(&self) -> Vec<FieldViolation>;

    fn validate(&self) -> Result<(), AppError> {
        let violations = self.violations();
        if violations.is_empty() {
            return Ok(());
        }
        let details = violations
            .iter()
            .map(|v| json!({ "field": v.field, "error": v.error }))
            .collect();
        Err(AppError::validation(details, "request validation failed"))
    }
}

/// JSON body that has passed [`Validate`].
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// URL-encoded form body that has passed [`Validate`].
#[derive(Debug, Clone)]
pub struct ValidForm<T>(pub T);

impl<T, S> FromRequest<S> for ValidForm<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Typed path parameters. A single unparsable parameter is reported under
/// its route name.
#[derive(Debug, Clone)]
pub struct ValidPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let rejection = match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => return Ok(Self(value)),
            Err(rejection) => rejection,
        };

        if let PathRejection::FailedToDeserializePathParams(err) = &rejection {
            if let ErrorKind::ParseError { .. } = err.kind() {
                if let Ok(params) = RawPathParams::from_request_parts(parts, state).await {
                    let mut keys = params.iter().map(|(key, _)| key);
                    if let (Some(key), None) = (keys.next(), keys.next()) {
                        return Err(AppError::invalid_field(key, err.body_text()));
                    }
                }
            }
        }
        Err(rejection.into())
    }
}
