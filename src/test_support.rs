// src/test_support.rs
//! Shared fixtures for handler tests.

use crate::auth::{self, SESSION_COOKIE};
use crate::context::AppContext;
use crate::db::Store;
use crate::identity::{IdentityError, IdentityVerifier, VerifiedIdentity};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, test, web};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

pub const CLIENT_ID: &str = "tracker-test.apps.googleusercontent.com";

/// Accepts `good:<user id>` and nothing else.
pub struct StaticVerifier;

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        let sub = credential
            .strip_prefix("good:")
            .ok_or(IdentityError::MissingSubject)?;
        Ok(VerifiedIdentity {
            sub: sub.to_string(),
            email: Some(format!("{sub}@example.com")),
            name: Some(sub.to_uppercase()),
            picture: None,
        })
    }
}

pub struct TestContext {
    // Keeps the store directory alive for the test's duration.
    _dir: TempDir,
    pub data: web::Data<AppContext>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::build(true).await
    }

    pub async fn without_google() -> Self {
        Self::build(false).await
    }

    async fn build(with_google: bool) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let store = Store::open(dir.path().join("db.json"))
            .await
            .expect("store opens");
        let (client_id, verifier): (Option<String>, Option<Arc<dyn IdentityVerifier>>) =
            if with_google {
                (Some(CLIENT_ID.to_string()), Some(Arc::new(StaticVerifier)))
            } else {
                (None, None)
            };
        Self {
            _dir: dir,
            data: web::Data::new(AppContext::new(store, client_id, verifier)),
        }
    }
}

pub fn app(
    data: web::Data<AppContext>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(data)
        .wrap(auth::session_middleware(Key::generate(), false))
        .configure(crate::routes)
}

pub fn login_request(user_id: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/auth/google/callback")
        .set_json(json!({ "credential": format!("good:{user_id}") }))
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .expect("response sets the session cookie")
        .into_owned()
}
