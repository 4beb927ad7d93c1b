use super::error::*;
use super::handler;
use crate::application_port::AuthService;
use crate::domain_model::{SessionId, UserId};
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let captcha = warp::get()
        .and(warp::path("captcha"))
        .and(warp::path::end())
        .and(warp::cookie::optional::<String>(handler::SESSION_COOKIE))
        .and(with(server.captcha_service.clone()))
        .and_then(handler::issue_captcha);

    let verify_captcha = warp::post()
        .and(warp::path("verify-captcha"))
        .and(warp::path::end())
        .and(warp::cookie::optional::<String>(handler::SESSION_COOKIE))
        .and(warp::body::json())
        .and(with(server.captcha_service.clone()))
        .and_then(handler::verify_captcha);

    let register = warp::post()
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::cookie::optional::<String>(handler::SESSION_COOKIE))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and(with(server.captcha_service.clone()))
        .and_then(handler::register);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(warp::cookie::optional::<String>(handler::SESSION_COOKIE))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let user_info = warp::get()
        .and(warp::path("user-info"))
        .and(warp::path::end())
        .and(warp::cookie::optional::<String>(handler::SESSION_COOKIE))
        .and(with(server.auth_service.clone()))
        .and_then(handler::user_info);

    let change_password = warp::post()
        .and(warp::path("change-password"))
        .and(warp::path::end())
        .and(with_session(server.auth_service.clone()))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::change_password);

    let forgot_password = warp::post()
        .and(warp::path("forgot-password"))
        .and(warp::path::end())
        .and(warp::cookie::optional::<String>(handler::SESSION_COOKIE))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and(with(server.captcha_service.clone()))
        .and_then(handler::forgot_password);

    let validate_reset_token = warp::post()
        .and(warp::path("validate-reset-token"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::validate_reset_token);

    let reset_password = warp::post()
        .and(warp::path("reset-password"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::reset_password);

    captcha
        .or(verify_captcha)
        .or(register)
        .or(login)
        .or(logout)
        .or(user_info)
        .or(change_password)
        .or(forgot_password)
        .or(validate_reset_token)
        .or(reset_password)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_session(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::cookie::optional::<String>(handler::SESSION_COOKIE).and_then(
        move |cookie: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                let session = cookie.filter(|sid| !sid.is_empty()).map(SessionId).ok_or_else(
                    || {
                        reject::custom(ApiError::new(
                            ApiErrorCode::NotAuthenticated,
                            "not signed in",
                        ))
                    },
                )?;
                let user_id = auth_service
                    .authenticate(&session)
                    .await
                    .map_err(ApiError::from)
                    .map_err(reject::custom)?;
                Ok::<UserId, warp::Rejection>(user_id)
            }
        },
    )
}
