// src/lib.rs
use actix_web::{HttpResponse, web};

pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod due_date;
pub mod errors;
pub mod identity;
pub mod merge;
pub mod models;
pub mod subscriptions;
pub mod timeline;

#[cfg(test)]
mod test_support;

use crate::errors::ApiError;

/// API routes shared by the server and the handler tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("Invalid JSON body: {err}")).into()
    }));
    cfg.route("/favicon.ico", web::get().to(HttpResponse::NoContent));
    cfg.configure(auth::init_routes);
    cfg.configure(subscriptions::init_routes);
}
