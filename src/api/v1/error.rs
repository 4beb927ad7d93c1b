use crate::api::v1::handler::ApiResponse;
use crate::application_port::{AuthError, CaptchaError, LedgerError};
use serde::Serialize;
use std::convert::Infallible;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum ApiErrorCode {
    InvalidInput,
    InvalidCaptcha,
    InvalidCredentials,
    EmailTaken,
    NotAuthenticated,
    NotFound,
    InvalidToken,
    TokenUsed,
    TokenExpired,
    MethodNotAllowed,
    InternalError,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Logs the detail, hands the caller a generic message.
    pub fn internal<E: std::fmt::Display>(error: E) -> Self {
        warn!("internal error: {}", error);
        ApiError::new(ApiErrorCode::InternalError, "internal error")
    }

    pub fn status(&self) -> StatusCode {
        match self.code {
            ApiErrorCode::InvalidInput
            | ApiErrorCode::InvalidCaptcha
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::TokenUsed
            | ApiErrorCode::TokenExpired => StatusCode::BAD_REQUEST,
            ApiErrorCode::InvalidCredentials | ApiErrorCode::NotAuthenticated => {
                StatusCode::UNAUTHORIZED
            }
            ApiErrorCode::EmailTaken => StatusCode::CONFLICT,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiError {}

impl From<CaptchaError> for ApiError {
    fn from(error: CaptchaError) -> Self {
        match error {
            CaptchaError::Incorrect => {
                ApiError::new(ApiErrorCode::InvalidCaptcha, "incorrect captcha code")
            }
            CaptchaError::NotFoundOrExpired => {
                ApiError::new(ApiErrorCode::InvalidCaptcha, "captcha not found or expired")
            }
            CaptchaError::Store(e) => ApiError::internal(e),
            CaptchaError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::NotFound | LedgerError::UserNotFound => ApiError::new(
                ApiErrorCode::InvalidToken,
                "invalid reset link, request a new one",
            ),
            LedgerError::AlreadyUsed => ApiError::new(
                ApiErrorCode::TokenUsed,
                "reset link already used, request a new one",
            ),
            LedgerError::Expired => ApiError::new(
                ApiErrorCode::TokenExpired,
                "reset link expired, request a new one",
            ),
            LedgerError::Store(e) => ApiError::internal(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Validation(message) => ApiError::new(ApiErrorCode::InvalidInput, message),
            AuthError::InvalidCredentials => ApiError::new(
                ApiErrorCode::InvalidCredentials,
                "invalid email or password",
            ),
            AuthError::WrongPassword => ApiError::new(
                ApiErrorCode::InvalidCredentials,
                "current password is incorrect",
            ),
            AuthError::EmailTaken => {
                ApiError::new(ApiErrorCode::EmailTaken, "email already registered")
            }
            AuthError::NotAuthenticated => {
                ApiError::new(ApiErrorCode::NotAuthenticated, "not signed in")
            }
            AuthError::UserNotFound => ApiError::new(ApiErrorCode::NotFound, "user not found"),
            AuthError::Reset(e) => ApiError::from(e),
            AuthError::Store(e) => ApiError::internal(e),
            AuthError::InternalError(e) => ApiError::internal(e),
        }
    }
}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let api_error = if let Some(err) = err.find::<ApiError>() {
        err.clone()
    } else if let Some(err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        ApiError::new(ApiErrorCode::InvalidInput, err.to_string())
    } else if err.is_not_found() {
        ApiError::new(ApiErrorCode::NotFound, "no such endpoint")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiError::new(ApiErrorCode::MethodNotAllowed, "method not allowed")
    } else {
        ApiError::internal(format!("unhandled rejection: {err:?}"))
    };

    let status = api_error.status();
    let json = warp::reply::json(&ApiResponse::<()>::err(api_error));
    Ok(warp::reply::with_status(json, status))
}
