// src/subscriptions.rs
use crate::context::AppContext;
use crate::errors::ApiError;
use crate::merge::{self, Rejection};
use crate::models::{SessionUser, SubscriptionInput};
use crate::timeline;
use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::Utc;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_subscriptions);
    cfg.service(subscription_timeline);
    cfg.service(create_subscription);
    cfg.service(update_subscription);
    cfg.service(delete_subscription);
}

fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid ID.".to_string()))
}

fn log_rejection(action: &str, user_id: &str, rejection: &Rejection) {
    match rejection {
        Rejection::Invalid { .. } => {
            tracing::info!("Rejected {} for user {}: {}", action, user_id, rejection)
        }
        Rejection::Calculation(_) => tracing::error!(
            "Due date calculation failed during {} for user {}: {}",
            action,
            user_id,
            rejection
        ),
    }
}

#[get("/api/subscriptions")]
pub async fn list_subscriptions(
    user: SessionUser,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, ApiError> {
    let subscriptions = ctx.store.list(&user.id).await;
    Ok(HttpResponse::Ok().json(subscriptions))
}

#[get("/api/subscriptions/timeline")]
pub async fn subscription_timeline(
    user: SessionUser,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, ApiError> {
    let today = Utc::now().date_naive();
    let rows = timeline::build(ctx.store.list(&user.id).await, today);
    Ok(HttpResponse::Ok().json(rows))
}

#[post("/api/subscriptions")]
pub async fn create_subscription(
    user: SessionUser,
    ctx: web::Data<AppContext>,
    body: web::Json<SubscriptionInput>,
) -> Result<HttpResponse, ApiError> {
    let input = body.into_inner();

    let created = ctx
        .store
        .insert_with(&user.id, |id| {
            merge::build_subscription(id, &input)
                .inspect_err(|rejection| log_rejection("create", &user.id, rejection))
        })
        .await?;

    tracing::info!("Added subscription {} for user {}", created.id, user.id);
    Ok(HttpResponse::Created().json(created))
}

#[put("/api/subscriptions/{id}")]
pub async fn update_subscription(
    user: SessionUser,
    ctx: web::Data<AppContext>,
    path: web::Path<String>,
    body: web::Json<SubscriptionInput>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let input = body.into_inner();

    let updated = ctx
        .store
        .update_with(&user.id, id, |original| {
            merge::apply_update(original, &input)
                .inspect_err(|rejection| log_rejection("update", &user.id, rejection))
        })
        .await?;

    tracing::info!("Updated subscription {} for user {}", id, user.id);
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/api/subscriptions/{id}")]
pub async fn delete_subscription(
    user: SessionUser,
    ctx: web::Data<AppContext>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;

    ctx.store.delete(&user.id, id).await?;

    tracing::info!("Deleted subscription {} for user {}", id, user.id);
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, TestContext};
    use actix_web::cookie::Cookie;
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    fn create(cookie: &Cookie<'static>, body: Value) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/subscriptions")
            .cookie(cookie.clone())
            .set_json(body)
    }

    fn music() -> Value {
        json!({
            "name": "Music",
            "lastPaidMonth": "2025-01",
            "recurrenceMonths": "1",
            "recurrenceDayOfMonth": 30
        })
    }

    #[actix_web::test]
    async fn requires_sign_in() {
        let ctx = TestContext::new().await;
        let app = test::init_service(test_support::app(ctx.data.clone())).await;

        for req in [
            test::TestRequest::get().uri("/api/subscriptions"),
            test::TestRequest::get().uri("/api/subscriptions/timeline"),
            test::TestRequest::post().uri("/api/subscriptions").set_json(music()),
            test::TestRequest::put()
                .uri("/api/subscriptions/1")
                .set_json(json!({ "name": "Renamed" })),
            test::TestRequest::delete().uri("/api/subscriptions/1"),
            test::TestRequest::post()
                .uri("/api/subscriptions")
                .insert_header(("content-type", "application/json"))
                .set_payload("{ nope"),
            test::TestRequest::put()
                .uri("/api/subscriptions/abc")
                .insert_header(("content-type", "application/json"))
                .set_payload("{ nope"),
        ] {
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[actix_web::test]
    async fn create_list_update_delete() {
        let ctx = TestContext::new().await;
        let app = test::init_service(test_support::app(ctx.data.clone())).await;
        let resp = test::call_service(&app, test_support::login_request("ada").to_request()).await;
        let cookie = test_support::session_cookie(&resp);

        let resp = test::call_service(&app, create(&cookie, music()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["id"], 1);
        assert_eq!(created["recurrenceMonths"], 1);
        assert_eq!(created["nextDueDate"], "2025-02-28");

        let req = test::TestRequest::get()
            .uri("/api/subscriptions")
            .cookie(cookie.clone())
            .to_request();
        let listed: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let req = test::TestRequest::put()
            .uri("/api/subscriptions/1")
            .cookie(cookie.clone())
            .set_json(json!({ "lastPaidMonth": "2024-01" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated: Value = test::read_body_json(resp).await;
        assert_eq!(updated["nextDueDate"], "2024-02-29");
        assert_eq!(updated["name"], "Music");

        let req = test::TestRequest::delete()
            .uri("/api/subscriptions/1")
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::delete()
            .uri("/api/subscriptions/1")
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(&app, create(&cookie, music()).to_request()).await;
        let recreated: Value = test::read_body_json(resp).await;
        assert_eq!(recreated["id"], 2);
    }

    #[actix_web::test]
    async fn invalid_create_is_a_client_error() {
        let ctx = TestContext::new().await;
        let app = test::init_service(test_support::app(ctx.data.clone())).await;
        let resp = test::call_service(&app, test_support::login_request("ada").to_request()).await;
        let cookie = test_support::session_cookie(&resp);

        for body in [
            json!({ "name": "X", "lastPaidMonth": "2025-13", "recurrenceMonths": 1, "recurrenceDayOfMonth": 1 }),
            json!({ "name": "X", "lastPaidMonth": "25-01", "recurrenceMonths": 1, "recurrenceDayOfMonth": 1 }),
            json!({ "name": " ", "lastPaidMonth": "2025-01", "recurrenceMonths": 1, "recurrenceDayOfMonth": 1 }),
            json!({ "name": "X", "lastPaidMonth": "2025-01", "recurrenceMonths": 1 }),
        ] {
            let resp = test::call_service(&app, create(&cookie, body.clone()).to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
            let err: Value = test::read_body_json(resp).await;
            assert!(err["error"].is_string());
        }
        assert!(ctx.data.store.list("ada").await.is_empty());

        let overflow = json!({
            "name": "X",
            "lastPaidMonth": "9999-12",
            "recurrenceMonths": u32::MAX,
            "recurrenceDayOfMonth": 1
        });
        let resp = test::call_service(&app, create(&cookie, overflow).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(ctx.data.store.list("ada").await.is_empty());
    }

    #[actix_web::test]
    async fn partially_invalid_update_changes_nothing() {
        let ctx = TestContext::new().await;
        let app = test::init_service(test_support::app(ctx.data.clone())).await;
        let resp = test::call_service(&app, test_support::login_request("ada").to_request()).await;
        let cookie = test_support::session_cookie(&resp);
        test::call_service(&app, create(&cookie, music()).to_request()).await;
        let before = std::fs::read(ctx.data.store.path()).unwrap();

        let req = test::TestRequest::put()
            .uri("/api/subscriptions/1")
            .cookie(cookie.clone())
            .set_json(json!({ "name": "Renamed", "lastPaidMonth": "1899-01" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read(ctx.data.store.path()).unwrap(), before);

        for (uri, status) in [
            ("/api/subscriptions/abc", StatusCode::BAD_REQUEST),
            ("/api/subscriptions/99", StatusCode::NOT_FOUND),
        ] {
            let req = test::TestRequest::put()
                .uri(uri)
                .cookie(cookie.clone())
                .set_json(json!({ "name": "Renamed" }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), status);
        }
    }

    #[actix_web::test]
    async fn update_that_overflows_the_calendar_changes_nothing() {
        let ctx = TestContext::new().await;
        let app = test::init_service(test_support::app(ctx.data.clone())).await;
        let resp = test::call_service(&app, test_support::login_request("ada").to_request()).await;
        let cookie = test_support::session_cookie(&resp);
        let resp = test::call_service(&app, create(&cookie, json!({
            "name": "Far", "lastPaidMonth": "9999-01", "recurrenceMonths": 1, "recurrenceDayOfMonth": 1
        })).to_request()).await;
        let created: Value = test::read_body_json(resp).await;
        let before = std::fs::read(ctx.data.store.path()).unwrap();

        for months in [json!(4_000_000_000u64), json!(4_294_967_296u64)] {
            let req = test::TestRequest::put()
                .uri("/api/subscriptions/1")
                .cookie(cookie.clone())
                .set_json(json!({ "name": "B", "recurrenceMonths": months }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{months}");
            let err: Value = test::read_body_json(resp).await;
            assert!(err["error"].is_string());
        }

        assert_eq!(std::fs::read(ctx.data.store.path()).unwrap(), before);
        let listed = ctx.data.store.list("ada").await;
        assert_eq!(serde_json::to_value(&listed).unwrap(), json!([created]));
    }

    #[actix_web::test]
    async fn users_do_not_see_each_other() {
        let ctx = TestContext::new().await;
        let app = test::init_service(test_support::app(ctx.data.clone())).await;
        let resp = test::call_service(&app, test_support::login_request("ada").to_request()).await;
        let ada = test_support::session_cookie(&resp);
        let resp = test::call_service(&app, test_support::login_request("bob").to_request()).await;
        let bob = test_support::session_cookie(&resp);

        test::call_service(&app, create(&ada, music()).to_request()).await;

        let req = test::TestRequest::get()
            .uri("/api/subscriptions")
            .cookie(bob.clone())
            .to_request();
        let listed: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(listed, json!([]));

        let req = test::TestRequest::delete()
            .uri("/api/subscriptions/1")
            .cookie(bob)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn timeline_is_sorted_and_annotated() {
        let ctx = TestContext::new().await;
        let app = test::init_service(test_support::app(ctx.data.clone())).await;
        let resp = test::call_service(&app, test_support::login_request("ada").to_request()).await;
        let cookie = test_support::session_cookie(&resp);

        test::call_service(&app, create(&cookie, json!({
            "name": "Far future", "lastPaidMonth": "9000-01", "recurrenceMonths": 1, "recurrenceDayOfMonth": 5
        })).to_request()).await;
        test::call_service(&app, create(&cookie, music()).to_request()).await;

        let req = test::TestRequest::get()
            .uri("/api/subscriptions/timeline")
            .cookie(cookie)
            .to_request();
        let rows: Value = test::read_body_json(test::call_service(&app, req).await).await;
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);

        // Music fell due on 2025-02-28.
        assert_eq!(rows[0]["name"], "Music");
        assert_eq!(rows[0]["nextDueDate"], "2025-02-28");
        assert_eq!(rows[0]["timeline"]["status"], "due");
        assert_eq!(rows[0]["timeline"]["daysRemaining"], 0);
        assert_eq!(rows[0]["timeline"]["progress"], 1.0);

        assert_eq!(rows[1]["name"], "Far future");
        assert_eq!(rows[1]["nextDueDate"], "9000-02-05");
        assert_eq!(rows[1]["timeline"]["status"], "upcoming");
        assert_eq!(rows[1]["timeline"]["progress"], 0.0);
        assert!(rows[1]["timeline"]["daysRemaining"].as_i64().unwrap() > 365 * 6000);
    }

    #[actix_web::test]
    async fn malformed_json_is_a_json_error() {
        let ctx = TestContext::new().await;
        let app = test::init_service(test_support::app(ctx.data.clone())).await;
        let resp = test::call_service(&app, test_support::login_request("ada").to_request()).await;
        let cookie = test_support::session_cookie(&resp);

        let req = test::TestRequest::post()
            .uri("/api/subscriptions")
            .cookie(cookie)
            .insert_header(("content-type", "application/json"))
            .set_payload("{ nope")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: Value = test::read_body_json(resp).await;
        assert!(err["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }
}
