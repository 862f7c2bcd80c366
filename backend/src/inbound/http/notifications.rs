//! Notification feed endpoints.
//!
//! The feed is read-mostly: list, mark one read, mark all read. Records are
//! never deleted through the API; eviction and TTL pruning happen inside
//! the store.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde_json::json;

use crate::domain::NotificationId;
use crate::inbound::http::error::ApiResult;
use crate::inbound::http::identity::authenticated_user;
use crate::inbound::http::state::HttpState;

/// The caller's feed, newest first.
#[get("/api/v1/notifications")]
pub async fn list_notifications(
    state: web::Data<HttpState>,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    let user = authenticated_user(&req)?;
    let feed = state.notifications.list(user).await?;
    Ok(HttpResponse::Ok().json(feed))
}

/// Mark one record read. 204 on success, 404 when the record is not in the
/// caller's feed.
#[post("/api/v1/notifications/{id}/read")]
pub async fn mark_notification_read(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<NotificationId>,
) -> ApiResult<HttpResponse> {
    let user = authenticated_user(&req)?;
    let id = path.into_inner();
    if state.notification_commands.mark_read(user, id).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(crate::domain::Error::not_found("notification not found"))
    }
}

/// Mark the caller's whole feed read; responds with the update count.
#[post("/api/v1/notifications/read-all")]
pub async fn mark_all_notifications_read(
    state: web::Data<HttpState>,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    let user = authenticated_user(&req)?;
    let updated = state.notification_commands.mark_all_read(user).await?;
    Ok(HttpResponse::Ok().json(json!({ "updated": updated })))
}
