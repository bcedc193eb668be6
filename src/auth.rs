// src/auth.rs
use crate::context::AppContext;
use crate::errors::ApiError;
use crate::models::{CredentialRequest, SessionUser};
use actix_session::config::PersistentSession;
use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionExt, SessionMiddleware};
use actix_web::cookie::{Key, time::Duration};
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, HttpResponse, get, post, web};
use serde_json::json;
use std::future::{Ready, ready};

pub const SESSION_COOKIE: &str = "tracker.sid";
const SESSION_USER_KEY: &str = "user";
const SESSION_TTL_DAYS: i64 = 7;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(client_config);
    cfg.service(google_callback);
    cfg.service(auth_status);
    cfg.service(logout);
}

/// Cookie-backed sessions signed and encrypted with `key`.
pub fn session_middleware(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE.to_string())
        .cookie_secure(secure)
        .cookie_http_only(true)
        .session_lifecycle(
            PersistentSession::default().session_ttl(Duration::days(SESSION_TTL_DAYS)),
        )
        .build()
}

// Signed-in user from the session, or 401.
pub fn current_user(session: &Session) -> Result<SessionUser, ApiError> {
    session
        .get::<SessionUser>(SESSION_USER_KEY)?
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized: Please log in.".to_string()))
}

/// Resolves before the body is read, so a signed-out request is 401 whatever it carries.
impl FromRequest for SessionUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(current_user(&req.get_session()))
    }
}

#[get("/api/config")]
pub async fn client_config(ctx: web::Data<AppContext>) -> Result<HttpResponse, ApiError> {
    match &ctx.google_client_id {
        Some(client_id) => Ok(HttpResponse::Ok().json(json!({ "googleClientId": client_id }))),
        None => {
            tracing::error!("Cannot provide Google client id to the frontend: not configured");
            Err(ApiError::Configuration(
                "Server configuration error.".to_string(),
            ))
        }
    }
}

#[post("/api/auth/google/callback")]
pub async fn google_callback(
    ctx: web::Data<AppContext>,
    session: Session,
    body: web::Json<CredentialRequest>,
) -> Result<HttpResponse, ApiError> {
    let verifier = ctx
        .verifier
        .as_ref()
        .ok_or_else(|| ApiError::Configuration("Google Auth not configured.".to_string()))?;
    let credential = body
        .into_inner()
        .credential
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing credential token.".to_string()))?;

    let identity = verifier.verify(&credential).await.map_err(|e| {
        tracing::warn!("Token verification failed: {}", e);
        ApiError::Unauthorized("Authentication failed.".to_string())
    })?;

    ctx.store.ensure_user(&identity.sub).await?;

    let user = SessionUser {
        id: identity.sub,
        email: identity.email,
        name: identity.name,
        picture: identity.picture,
    };
    session.renew();
    session.insert(SESSION_USER_KEY, &user)?;
    tracing::info!(
        "User logged in: {} ({})",
        user.name.as_deref().unwrap_or("unnamed"),
        user.id
    );

    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

#[get("/api/auth/status")]
pub async fn auth_status(session: Session) -> Result<HttpResponse, ApiError> {
    let user = session.get::<SessionUser>(SESSION_USER_KEY)?;
    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

#[post("/api/auth/logout")]
pub async fn logout(session: Session) -> Result<HttpResponse, ApiError> {
    match session.get::<SessionUser>(SESSION_USER_KEY)? {
        Some(user) => {
            session.purge();
            tracing::info!("{} logged out", user.name.as_deref().unwrap_or(&user.id));
            Ok(HttpResponse::Ok().json(json!({ "message": "Logged out successfully." })))
        }
        None => {
            session.purge();
            Ok(HttpResponse::Ok().json(json!({ "message": "No active session." })))
        }
    }
}
