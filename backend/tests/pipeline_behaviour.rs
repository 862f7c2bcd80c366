//! End-to-end behaviour of the mutation pipeline on in-memory adapters:
//! a permission-checked card move reorders both lists, and the resulting
//! event reaches the audit log, the assignee's notification feed and the
//! board's realtime topic.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mockable::{Clock, DefaultClock};

use backend::domain::ports::{
    CardRepository, FixtureAuditLog, FixtureBoardDirectory, FixtureCardRepository,
    FixtureDedupMarkerStore, FixtureNotificationFeed, FixtureRealtimePublisher,
    NotificationQuery, RealtimePublisher, board_topic,
};
use backend::domain::{
    AccessResolver, AuditTrailWriter, Board, BoardId, BoardList, BoardVisibility, Card,
    CardCommandService, CardId, EventBus, EventHandler, ListId, NotificationService,
    NotificationWriter, OrderManager, PresenceService, Role, TeamId, UserId,
};
use backend::inbound::ws::RealtimeBroadcaster;

struct Pipeline {
    cards: CardCommandService<FixtureBoardDirectory, FixtureCardRepository>,
    repo: Arc<FixtureCardRepository>,
    audit: Arc<FixtureAuditLog>,
    notifications: Arc<NotificationService<FixtureNotificationFeed, FixtureDedupMarkerStore>>,
    publisher: Arc<FixtureRealtimePublisher>,
    board_id: BoardId,
    editor: UserId,
}

fn pipeline() -> Pipeline {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let directory = Arc::new(FixtureBoardDirectory::new());
    let board = Board {
        id: BoardId::random(),
        team_id: TeamId::random(),
        title: "launch plan".into(),
        visibility: BoardVisibility::Team,
        deleted_at: None,
    };
    let board_id = board.id;
    let editor = UserId::random();
    directory.put_board(board);
    directory.put_board_role(board_id, editor, Role::Member);

    let repo = Arc::new(FixtureCardRepository::new());
    let audit = Arc::new(FixtureAuditLog::new());
    let notifications = Arc::new(NotificationService::new(
        Arc::new(FixtureNotificationFeed::new()),
        Arc::new(FixtureDedupMarkerStore::new(Arc::clone(&clock))),
        Arc::clone(&clock),
    ));
    let publisher = Arc::new(FixtureRealtimePublisher::new());

    let handlers: Vec<Arc<dyn EventHandler>> = vec![
        Arc::new(AuditTrailWriter::new(Arc::clone(&audit))),
        Arc::new(NotificationWriter::new(
            Arc::clone(&notifications),
            Arc::clone(&clock),
        )),
        Arc::new(RealtimeBroadcaster::new(
            Arc::clone(&publisher) as Arc<dyn RealtimePublisher>
        )),
    ];
    let bus = EventBus::with_defaults(handlers);

    let cards = CardCommandService::new(
        AccessResolver::new(directory),
        OrderManager::new(Arc::clone(&repo)),
        Arc::clone(&repo),
        bus,
        clock,
    );

    Pipeline {
        cards,
        repo,
        audit,
        notifications,
        publisher,
        board_id,
        editor,
    }
}

fn seed_list(pipeline: &Pipeline, title: &str, position: i32, cards: i32) -> (ListId, Vec<CardId>) {
    let list_id = ListId::random();
    pipeline.repo.put_list(BoardList {
        id: list_id,
        board_id: pipeline.board_id,
        title: title.into(),
        order_index: position,
    });
    let ids = (0..cards)
        .map(|index| {
            let card = Card {
                id: CardId::random(),
                list_id,
                title: format!("{title} {index}"),
                order_index: index,
                assignee_id: None,
                due_at: None,
            };
            let id = card.id;
            pipeline.repo.put_card(card);
            id
        })
        .collect();
    (list_id, ids)
}

async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn a_card_move_flows_through_every_consumer() {
    let pipeline = pipeline();
    let (source, source_ids) = seed_list(&pipeline, "todo", 0, 4);
    let (target, target_ids) = seed_list(&pipeline, "doing", 1, 3);

    // The moved card carries an assignee so the move produces a personal
    // notification as well as the board broadcast.
    let assignee = UserId::random();
    let moved = source_ids[3];
    let mut card = pipeline
        .repo
        .find_card(moved)
        .await
        .expect("find card")
        .expect("card exists");
    card.assignee_id = Some(assignee);
    card.due_at = Some(Utc::now() + chrono::Duration::days(2));
    pipeline.repo.put_card(card);

    let mv = pipeline
        .cards
        .move_card(pipeline.editor, moved, target, 0)
        .await
        .expect("move card");
    assert_eq!(mv.from_index, 3);
    assert_eq!(mv.to_index, 0);

    // Both lists hold dense, distinct indexes afterwards.
    let source_cards = pipeline.repo.list_cards(source).await.expect("source");
    let target_cards = pipeline.repo.list_cards(target).await.expect("target");
    assert_eq!(source_cards.len(), 3);
    assert_eq!(target_cards.len(), 4);
    assert_eq!(target_cards[0].id, moved);
    let indexes: Vec<i32> = target_cards.iter().map(|card| card.order_index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3]);
    let shifted: Vec<CardId> = target_cards[1..].iter().map(|card| card.id).collect();
    assert_eq!(shifted, target_ids);

    // Audit trail records the flattened event.
    assert!(
        eventually(|| !pipeline.audit.entries().is_empty()).await,
        "audit entry should arrive"
    );
    let entries = pipeline.audit.entries();
    assert_eq!(entries[0].action, "card.moved");
    assert_eq!(entries[0].actor_id, pipeline.editor);
    assert_eq!(entries[0].board_id, Some(pipeline.board_id));
    assert_eq!(entries[0].card_id, Some(moved));

    // The assignee, who did not cause the move, receives one record.
    assert!(
        eventually(|| {
            futures::executor::block_on(pipeline.notifications.list(assignee))
                .map(|feed| feed.len() == 1)
                .unwrap_or(false)
        })
        .await,
        "notification should arrive"
    );
    let feed = pipeline
        .notifications
        .list(assignee)
        .await
        .expect("list feed");
    assert_eq!(feed[0].kind, "card.moved");
    assert_eq!(feed[0].sender_id, pipeline.editor);
    assert!(!feed[0].is_read);

    // The board topic carries the serialised event.
    assert!(
        eventually(|| !pipeline.publisher.sent().is_empty()).await,
        "broadcast should arrive"
    );
    let sent = pipeline.publisher.sent();
    assert!(
        sent.iter()
            .any(|(topic, _)| topic == &board_topic(pipeline.board_id)),
        "board topic must be among broadcasts"
    );
    let (_, payload) = sent
        .iter()
        .find(|(topic, _)| topic == &board_topic(pipeline.board_id))
        .expect("board broadcast");
    assert_eq!(payload["type"], serde_json::json!("CARD_MOVED"));
    assert_eq!(payload["cardId"], serde_json::json!(moved.to_string()));
}

#[tokio::test]
async fn actors_do_not_hear_about_their_own_moves() {
    let pipeline = pipeline();
    let (_, source_ids) = seed_list(&pipeline, "todo", 0, 2);
    let (target, _) = seed_list(&pipeline, "doing", 1, 1);

    // The editor moves a card assigned to themselves.
    let moved = source_ids[0];
    let mut card = pipeline
        .repo
        .find_card(moved)
        .await
        .expect("find card")
        .expect("card exists");
    card.assignee_id = Some(pipeline.editor);
    pipeline.repo.put_card(card);

    pipeline
        .cards
        .move_card(pipeline.editor, moved, target, 0)
        .await
        .expect("move card");

    // The audit row still lands, proving the pipeline ran.
    assert!(eventually(|| !pipeline.audit.entries().is_empty()).await);
    let feed = pipeline
        .notifications
        .list(pipeline.editor)
        .await
        .expect("list feed");
    assert!(feed.is_empty(), "actors never notify themselves");
}

#[tokio::test]
async fn outsiders_cannot_start_the_pipeline() {
    let pipeline = pipeline();
    let (_, source_ids) = seed_list(&pipeline, "todo", 0, 1);
    let (target, _) = seed_list(&pipeline, "doing", 1, 1);

    let outsider = UserId::random();
    let error = pipeline
        .cards
        .move_card(outsider, source_ids[0], target, 0)
        .await
        .expect_err("outsider must be rejected");
    assert_eq!(error.code(), backend::domain::ErrorCode::Forbidden);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(pipeline.audit.entries().is_empty());
    assert!(pipeline.publisher.sent().is_empty());
}

#[tokio::test]
async fn presence_snapshots_reach_the_presence_topic() {
    use backend::domain::ports::{FixturePresenceRegistry, PresenceCommand, board_presence_topic};

    let publisher = Arc::new(FixtureRealtimePublisher::new());
    let presence = PresenceService::new(
        Arc::new(FixturePresenceRegistry::new()),
        Arc::clone(&publisher) as Arc<dyn RealtimePublisher>,
    );
    let board_id = BoardId::random();
    let viewer = UserId::random();

    presence.enter(board_id, viewer).await.expect("enter");
    presence.leave(board_id, viewer).await.expect("leave");

    let sent = publisher.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(topic, _)| topic == &board_presence_topic(board_id)));
    assert_eq!(sent[0].1["members"].as_array().map(Vec::len), Some(1));
    assert_eq!(sent[1].1["members"].as_array().map(Vec::len), Some(0));
}
