use super::error::*;
use crate::application_port::{
    AuthService, CaptchaError, CaptchaService, ChangePasswordInput, LoginInput, RegisterInput,
    ResetPasswordInput,
};
use crate::domain_model::{SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

pub const SESSION_COOKIE: &str = "sid";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: ApiError) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}

fn session_of(cookie: Option<String>) -> Option<SessionId> {
    cookie.filter(|sid| !sid.is_empty()).map(SessionId)
}

/// Captcha-gated endpoints need a session to hold the challenge slot; no
/// cookie means there is nothing to verify against.
fn require_session(cookie: Option<String>) -> Result<SessionId, warp::Rejection> {
    session_of(cookie)
        .ok_or_else(|| reject::custom(ApiError::from(CaptchaError::NotFoundOrExpired)))
}

fn set_session_cookie<T: warp::Reply>(reply: T, session: &SessionId) -> impl warp::Reply + use<T> {
    warp::reply::with_header(
        reply,
        "set-cookie",
        format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly; SameSite=Lax"),
    )
}

#[derive(Debug, Serialize)]
struct CaptchaResponse {
    image_base64: String,
    expire_at: DateTime<Utc>,
}

pub async fn issue_captcha(
    cookie: Option<String>,
    captcha_service: Arc<dyn CaptchaService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = session_of(cookie).unwrap_or_else(SessionId::generate);

    let issued = captcha_service
        .issue(&session)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    let response = ApiResponse::ok(CaptchaResponse {
        image_base64: issued.image_base64,
        expire_at: issued.expire_at,
    });
    Ok(set_session_cookie(warp::reply::json(&response), &session))
}

#[derive(Debug, Deserialize)]
pub struct VerifyCaptchaRequest {
    pub captcha: String,
}

pub async fn verify_captcha(
    cookie: Option<String>,
    body: VerifyCaptchaRequest,
    captcha_service: Arc<dyn CaptchaService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = require_session(cookie)?;

    captcha_service
        .verify(&session, &body.captcha)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(MessageResponse::new(
        "captcha accepted",
    ))))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: Option<String>,
    pub name: String,
    pub title: String,
    pub captcha: String,
}

pub async fn register(
    cookie: Option<String>,
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
    captcha_service: Arc<dyn CaptchaService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = require_session(cookie)?;
    captcha_service
        .verify(&session, &body.captcha)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    let input = RegisterInput {
        email: body.email,
        password: body.password,
        confirm_password: body.confirm_password,
        name: body.name,
        title: body.title,
    };
    let user = auth_service
        .register(input)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(user)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = auth_service
        .login(LoginInput {
            email: body.email,
            password: body.password,
        })
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    let json = warp::reply::json(&ApiResponse::ok(result.user));
    Ok(set_session_cookie(json, &result.session))
}

pub async fn logout(
    cookie: Option<String>,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if let Some(session) = session_of(cookie) {
        auth_service
            .logout(&session)
            .await
            .map_err(ApiError::from)
            .map_err(reject::custom)?;
    }

    Ok(warp::reply::json(&ApiResponse::ok(MessageResponse::new(
        "signed out",
    ))))
}

pub async fn user_info(
    cookie: Option<String>,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = session_of(cookie)
        .ok_or_else(|| reject::custom(ApiError::new(ApiErrorCode::NotAuthenticated, "not signed in")))?;

    let user = auth_service
        .user_info(&session)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(user)))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

pub async fn change_password(
    user_id: UserId,
    body: ChangePasswordRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .change_password(
            user_id,
            ChangePasswordInput {
                current_password: body.current_password,
                new_password: body.new_password,
                confirm_new_password: body.confirm_new_password,
            },
        )
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(MessageResponse::new(
        "password changed",
    ))))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub captcha: String,
}

pub async fn forgot_password(
    cookie: Option<String>,
    body: ForgotPasswordRequest,
    auth_service: Arc<dyn AuthService>,
    captcha_service: Arc<dyn CaptchaService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = require_session(cookie)?;
    captcha_service
        .verify(&session, &body.captcha)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    auth_service
        .forgot_password(&body.email)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    // same body whether or not the address is registered
    Ok(warp::reply::json(&ApiResponse::ok(MessageResponse::new(
        "if the email is registered, a reset link has been sent",
    ))))
}

#[derive(Debug, Deserialize)]
pub struct ValidateResetTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
struct ValidateResetTokenResponse {
    email: String,
}

pub async fn validate_reset_token(
    body: ValidateResetTokenRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let email = auth_service
        .validate_reset_token(&body.token)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(
        ValidateResetTokenResponse { email },
    )))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

pub async fn reset_password(
    body: ResetPasswordRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .reset_password(ResetPasswordInput {
            token: body.token,
            new_password: body.new_password,
            confirm_new_password: body.confirm_new_password,
        })
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(MessageResponse::new(
        "password reset, sign in with your new password",
    ))))
}
