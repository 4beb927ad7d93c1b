//! End-to-end flows through the HTTP router, on the memory backends with the
//! fixed-answer captcha. The real captcha and the transactional ledger have
//! their own unit coverage next to their impls.

use plenary::api;
use plenary::application_impl::{
    Argon2PasswordHasher, AuthConfig, FakeCaptchaService, RealAuthService, RealTokenLedger,
};
use plenary::application_port::{
    AuthService, CaptchaService, CredentialHasher, TokenLedger,
};
use plenary::domain_port::{ResetTokenRepo, SessionStore, TxManager, UserRepo};
use plenary::infra_mem::{
    MemResetTokenRepo, MemSessionStore, MemTxManager, MemUserRepo, RecordingMailer,
};
use plenary::server::Server;
use serde_json::{Value, json};
use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;

const CAPTCHA_OK: &str = "1234";
const SID: &str = "test-session";

struct TestApp {
    server: Arc<Server>,
    mailer: Arc<RecordingMailer>,
}

fn test_app() -> TestApp {
    let user_repo: Arc<dyn UserRepo> = Arc::new(MemUserRepo::new());
    let reset_repo: Arc<dyn ResetTokenRepo> = Arc::new(MemResetTokenRepo::new());
    let tx_manager: Arc<dyn TxManager> = Arc::new(MemTxManager::new());
    let session_store: Arc<dyn SessionStore> = Arc::new(MemSessionStore::new());
    let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
    let mailer = Arc::new(RecordingMailer::new());

    let ledger: Arc<dyn TokenLedger> = Arc::new(RealTokenLedger::new(
        user_repo.clone(),
        reset_repo,
        tx_manager,
        30,
    ));
    let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
        user_repo,
        hasher,
        session_store,
        ledger,
        mailer.clone(),
        AuthConfig {
            reset_base_url: "https://conf.example/reset-password/index.html".into(),
            session_ttl_secs: 3600,
        },
    ));
    let captcha_service: Arc<dyn CaptchaService> = Arc::new(FakeCaptchaService::new());

    TestApp {
        server: Arc::new(Server::with_services(auth_service, captcha_service)),
        mailer,
    }
}

fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone {
    api::v1::routes(server).recover(api::v1::recover_error)
}

fn body_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("response body is json")
}

fn register_body(email: &str) -> Value {
    json!({
        "email": email,
        "password": "abc123",
        "name": "Ada Lovelace",
        "title": "Prof.",
        "captcha": CAPTCHA_OK,
    })
}

async fn register(app: &TestApp, email: &str) {
    let resp = warp::test::request()
        .method("POST")
        .path("/register")
        .header("cookie", format!("sid={SID}"))
        .json(&register_body(email))
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::OK, "{:?}", resp.body());
}

async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value, Option<String>) {
    let resp = warp::test::request()
        .method("POST")
        .path("/login")
        .json(&json!({ "email": email, "password": password }))
        .reply(&routes(app.server.clone()))
        .await;

    let sid = resp
        .headers()
        .get("set-cookie")
        .and_then(|h| h.to_str().ok())
        .and_then(|c| c.split(';').next())
        .and_then(|kv| kv.strip_prefix("sid="))
        .map(str::to_owned);

    (resp.status(), body_json(resp.body()), sid)
}

#[tokio::test]
async fn register_then_login_round_trip() {
    let app = test_app();
    register(&app, "a@x.com").await;

    let (status, body, sid) = login(&app, "a@x.com", "abc123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["email"], json!("a@x.com"));
    let sid = sid.expect("login sets a session cookie");

    let resp = warp::test::request()
        .method("GET")
        .path("/user-info")
        .header("cookie", format!("sid={sid}"))
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp.body())["data"]["email"], json!("a@x.com"));
}

#[tokio::test]
async fn bad_logins_are_indistinguishable() {
    let app = test_app();
    register(&app, "a@x.com").await;

    let (wrong_status, wrong_body, wrong_sid) = login(&app, "a@x.com", "wrong-pass").await;
    let (ghost_status, ghost_body, ghost_sid) = login(&app, "ghost@x.com", "abc123").await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(ghost_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, ghost_body);
    assert!(wrong_sid.is_none());
    assert!(ghost_sid.is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = test_app();
    register(&app, "a@x.com").await;

    let resp = warp::test::request()
        .method("POST")
        .path("/register")
        .header("cookie", format!("sid={SID}"))
        .json(&register_body("a@x.com"))
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp.body())["error"]["code"], json!("EmailTaken"));
}

#[tokio::test]
async fn register_is_captcha_gated() {
    let app = test_app();

    let mut body = register_body("a@x.com");
    body["captcha"] = json!("9999");
    let resp = warp::test::request()
        .method("POST")
        .path("/register")
        .header("cookie", format!("sid={SID}"))
        .json(&body)
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp.body())["error"]["code"],
        json!("InvalidCaptcha")
    );

    // no session cookie at all: nothing to verify against
    let resp = warp::test::request()
        .method("POST")
        .path("/register")
        .json(&register_body("a@x.com"))
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_validates_input() {
    let app = test_app();

    let mut short = register_body("a@x.com");
    short["password"] = json!("abc");
    let resp = warp::test::request()
        .method("POST")
        .path("/register")
        .header("cookie", format!("sid={SID}"))
        .json(&short)
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let bad_email = register_body("not-an-email");
    let resp = warp::test::request()
        .method("POST")
        .path("/register")
        .header("cookie", format!("sid={SID}"))
        .json(&bad_email)
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forgot_password_answers_identically_for_known_and_unknown_emails() {
    let app = test_app();
    register(&app, "a@x.com").await;

    let mut bodies = Vec::new();
    for email in ["a@x.com", "ghost@x.com"] {
        let resp = warp::test::request()
            .method("POST")
            .path("/forgot-password")
            .header("cookie", format!("sid={SID}"))
            .json(&json!({ "email": email, "captcha": CAPTCHA_OK }))
            .reply(&routes(app.server.clone()))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        bodies.push(resp.body().clone());
    }
    assert_eq!(bodies[0], bodies[1]);

    // only the real account got mail
    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@x.com");
}

#[tokio::test]
async fn reset_password_flow_end_to_end() {
    let app = test_app();
    register(&app, "a@x.com").await;

    let resp = warp::test::request()
        .method("POST")
        .path("/forgot-password")
        .header("cookie", format!("sid={SID}"))
        .json(&json!({ "email": "a@x.com", "captcha": CAPTCHA_OK }))
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let mail = app.mailer.sent().pop().expect("reset mail recorded");
    let token = mail
        .reset_url
        .split("?token=")
        .nth(1)
        .expect("token in reset url")
        .to_owned();

    let resp = warp::test::request()
        .method("POST")
        .path("/validate-reset-token")
        .json(&json!({ "token": token }))
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp.body())["data"]["email"], json!("a@x.com"));

    let resp = warp::test::request()
        .method("POST")
        .path("/reset-password")
        .json(&json!({
            "token": token,
            "new_password": "fresh-pass",
            "confirm_new_password": "fresh-pass",
        }))
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::OK, "{:?}", resp.body());

    let (status, _, _) = login(&app, "a@x.com", "fresh-pass").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = login(&app, "a@x.com", "abc123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // single use: a second exchange with the same token fails
    let resp = warp::test::request()
        .method("POST")
        .path("/reset-password")
        .json(&json!({
            "token": token,
            "new_password": "another-pass",
            "confirm_new_password": "another-pass",
        }))
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp.body())["error"]["code"], json!("TokenUsed"));
}

#[tokio::test]
async fn malformed_reset_tokens_are_rejected() {
    let app = test_app();

    for bad in ["", "deadbeef", "zz"] {
        let resp = warp::test::request()
            .method("POST")
            .path("/validate-reset-token")
            .json(&json!({ "token": bad }))
            .reply(&routes(app.server.clone()))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp.body())["error"]["code"],
            json!("InvalidToken")
        );
    }
}

#[tokio::test]
async fn change_password_requires_the_session_and_the_current_password() {
    let app = test_app();
    register(&app, "a@x.com").await;
    let (_, _, sid) = login(&app, "a@x.com", "abc123").await;
    let sid = sid.expect("session cookie");

    let change = json!({
        "current_password": "abc123",
        "new_password": "xyz789",
        "confirm_new_password": "xyz789",
    });

    // no session
    let resp = warp::test::request()
        .method("POST")
        .path("/change-password")
        .json(&change)
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // wrong current password
    let resp = warp::test::request()
        .method("POST")
        .path("/change-password")
        .header("cookie", format!("sid={sid}"))
        .json(&json!({
            "current_password": "nope",
            "new_password": "xyz789",
            "confirm_new_password": "xyz789",
        }))
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = warp::test::request()
        .method("POST")
        .path("/change-password")
        .header("cookie", format!("sid={sid}"))
        .json(&change)
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _, _) = login(&app, "a@x.com", "xyz789").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = login(&app, "a@x.com", "abc123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_is_idempotent_and_kills_the_session() {
    let app = test_app();
    register(&app, "a@x.com").await;
    let (_, _, sid) = login(&app, "a@x.com", "abc123").await;
    let sid = sid.expect("session cookie");

    for _ in 0..2 {
        let resp = warp::test::request()
            .method("POST")
            .path("/logout")
            .header("cookie", format!("sid={sid}"))
            .reply(&routes(app.server.clone()))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp.body())["success"], json!(true));
    }

    // logout without any cookie is fine too
    let resp = warp::test::request()
        .method("POST")
        .path("/logout")
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = warp::test::request()
        .method("GET")
        .path("/user-info")
        .header("cookie", format!("sid={sid}"))
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn captcha_endpoint_issues_a_challenge_and_a_session() {
    let app = test_app();

    let resp = warp::test::request()
        .method("GET")
        .path("/captcha")
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|h| h.to_str().ok())
        .expect("captcha sets a session cookie");
    assert!(cookie.starts_with("sid="));

    let body = body_json(resp.body());
    assert_eq!(body["success"], json!(true));
    assert!(body["data"]["image_base64"].as_str().is_some_and(|s| !s.is_empty()));

    let resp = warp::test::request()
        .method("POST")
        .path("/verify-captcha")
        .header("cookie", format!("sid={SID}"))
        .json(&json!({ "captcha": CAPTCHA_OK }))
        .reply(&routes(app.server.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}
