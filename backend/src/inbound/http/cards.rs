//! Card and list mutation endpoints.
//!
//! Thin translations from request DTOs onto the card command port; every
//! permission decision and ordering rule lives behind the port.

use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::Deserialize;

use crate::domain::{BoardId, CardId, ListId, UserId};
use crate::inbound::http::error::ApiResult;
use crate::inbound::http::identity::authenticated_user;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCardRequest {
    pub list_id: ListId,
    pub order_index: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignCardRequest {
    pub assignee_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveListRequest {
    pub order_index: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderEntry {
    pub card_id: CardId,
    pub order_index: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderCardsRequest {
    pub cards: Vec<ReorderEntry>,
}

/// Move a card; responds with the applied move.
#[post("/api/v1/cards/{id}/move")]
pub async fn move_card(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<CardId>,
    body: web::Json<MoveCardRequest>,
) -> ApiResult<HttpResponse> {
    let actor = authenticated_user(&req)?;
    let body = body.into_inner();
    let mv = state
        .cards
        .move_card(actor, path.into_inner(), body.list_id, body.order_index)
        .await?;
    Ok(HttpResponse::Ok().json(mv))
}

/// Set or clear a card's assignee.
#[post("/api/v1/cards/{id}/assignee")]
pub async fn assign_card(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<CardId>,
    body: web::Json<AssignCardRequest>,
) -> ApiResult<HttpResponse> {
    let actor = authenticated_user(&req)?;
    state
        .cards
        .assign_card(actor, path.into_inner(), body.into_inner().assignee_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Move a list to a new position on its board.
#[post("/api/v1/boards/{board_id}/lists/{list_id}/move")]
pub async fn move_list(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<(BoardId, ListId)>,
    body: web::Json<MoveListRequest>,
) -> ApiResult<HttpResponse> {
    let actor = authenticated_user(&req)?;
    let (board_id, list_id) = path.into_inner();
    state
        .cards
        .move_list(actor, board_id, list_id, body.into_inner().order_index)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Overwrite a list's card ordering with an explicit permutation.
#[post("/api/v1/lists/{id}/reorder")]
pub async fn reorder_cards(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<ListId>,
    body: web::Json<ReorderCardsRequest>,
) -> ApiResult<HttpResponse> {
    let actor = authenticated_user(&req)?;
    let pairs = body
        .into_inner()
        .cards
        .into_iter()
        .map(|entry| (entry.card_id, entry.order_index))
        .collect();
    state
        .cards
        .reorder_cards(actor, path.into_inner(), pairs)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CardMove;
    use crate::domain::ports::{MockCardCommand, MockNotificationCommand, MockNotificationQuery};
    use crate::inbound::http::identity::USER_ID_HEADER;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::json;
    use std::sync::Arc;

    fn state(cards: MockCardCommand) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(
            Arc::new(MockNotificationQuery::new()),
            Arc::new(MockNotificationCommand::new()),
            Arc::new(cards),
        ))
    }

    #[actix_rt::test]
    async fn move_echoes_the_applied_move() {
        let card_id = CardId::random();
        let target = ListId::random();
        let source = ListId::random();
        let mut cards = MockCardCommand::new();
        let expected = CardMove {
            card_id,
            from_list: source,
            from_index: 3,
            to_list: target,
            to_index: 0,
        };
        let returned = expected.clone();
        cards
            .expect_move_card()
            .withf(move |_, c, l, i| *c == card_id && *l == target && *i == 0)
            .returning(move |_, _, _, _| Ok(returned.clone()));

        let app =
            test::init_service(App::new().app_data(state(cards)).service(move_card)).await;
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/cards/{card_id}/move"))
            .insert_header((USER_ID_HEADER, UserId::random().to_string()))
            .set_json(json!({"listId": target, "orderIndex": 0}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["fromIndex"], json!(3));
        assert_eq!(body["toList"], json!(target.to_string()));
    }

    #[actix_rt::test]
    async fn forbidden_moves_map_to_403() {
        let mut cards = MockCardCommand::new();
        cards
            .expect_move_card()
            .returning(|_, _, _, _| Err(crate::domain::Error::forbidden("no access")));

        let app =
            test::init_service(App::new().app_data(state(cards)).service(move_card)).await;
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/cards/{}/move", CardId::random()))
            .insert_header((USER_ID_HEADER, UserId::random().to_string()))
            .set_json(json!({"listId": ListId::random(), "orderIndex": 1}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_rt::test]
    async fn assignment_accepts_null_to_clear() {
        let mut cards = MockCardCommand::new();
        cards
            .expect_assign_card()
            .withf(|_, _, assignee| assignee.is_none())
            .returning(|_, _, _| Ok(()));

        let app =
            test::init_service(App::new().app_data(state(cards)).service(assign_card)).await;
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/cards/{}/assignee", CardId::random()))
            .insert_header((USER_ID_HEADER, UserId::random().to_string()))
            .set_json(json!({"assigneeId": null}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_rt::test]
    async fn reorder_forwards_the_permutation() {
        let list_id = ListId::random();
        let first = CardId::random();
        let second = CardId::random();
        let mut cards = MockCardCommand::new();
        cards
            .expect_reorder_cards()
            .withf(move |_, l, pairs| *l == list_id && pairs.len() == 2 && pairs[0].0 == first)
            .returning(|_, _, _| Ok(()));

        let app =
            test::init_service(App::new().app_data(state(cards)).service(reorder_cards)).await;
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/lists/{list_id}/reorder"))
            .insert_header((USER_ID_HEADER, UserId::random().to_string()))
            .set_json(json!({"cards": [
                {"cardId": first, "orderIndex": 1},
                {"cardId": second, "orderIndex": 0},
            ]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
