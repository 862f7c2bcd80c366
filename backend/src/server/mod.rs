//! Server construction and pipeline wiring.
//!
//! Adapters are selected here and nowhere else: with `REDIS_URL` set the
//! feed, dedup marker and presence registry run against Redis, otherwise
//! everything runs on in-memory fixtures so local development and tests
//! need no infrastructure. Board, card and schedule data always use the
//! fixture adapters; relational persistence is wired in by the deployment
//! that owns those tables.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use mockable::{Clock, DefaultClock};
use tracing::warn;

use crate::domain::event_bus::EventHandler;
use crate::domain::ports::{
    DedupMarkerStore, FixtureAuditLog, FixtureBoardDirectory, FixtureCardRepository,
    FixtureCardScheduleQuery, FixtureDedupMarkerStore, FixtureNotificationFeed,
    FixturePresenceRegistry, NotificationFeed, PresenceRegistry, RealtimePublisher,
};
use crate::domain::{
    AccessResolver, AuditTrailWriter, CardCommandService, DeadlineScanner, EventBus,
    NotificationService, NotificationWriter, OrderManager, PresenceService,
};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::{HttpState, cards, notifications};
use crate::inbound::ws::{self, BroadcastHub, RealtimeBroadcaster, WsState};
use crate::outbound::redis::{
    self, RedisDedupMarkerStore, RedisNotificationFeed, RedisPresenceRegistry,
};

fn build_pipeline<F, M, P>(
    feed: Arc<F>,
    markers: Arc<M>,
    registry: Arc<P>,
    hub: &Arc<BroadcastHub>,
    clock: &Arc<dyn Clock>,
    scan_interval: Duration,
) -> (HttpState, WsState)
where
    F: NotificationFeed + 'static,
    M: DedupMarkerStore + 'static,
    P: PresenceRegistry + 'static,
{
    let notifications = Arc::new(NotificationService::new(
        feed,
        Arc::clone(&markers),
        Arc::clone(clock),
    ));

    let handlers: Vec<Arc<dyn EventHandler>> = vec![
        Arc::new(AuditTrailWriter::new(Arc::new(FixtureAuditLog::new()))),
        Arc::new(NotificationWriter::new(
            Arc::clone(&notifications),
            Arc::clone(clock),
        )),
        Arc::new(RealtimeBroadcaster::new(
            Arc::clone(hub) as Arc<dyn RealtimePublisher>
        )),
    ];
    let bus = EventBus::with_defaults(handlers);

    let directory = Arc::new(FixtureBoardDirectory::new());
    let repo = Arc::new(FixtureCardRepository::new());
    let card_commands = Arc::new(CardCommandService::new(
        AccessResolver::new(directory),
        OrderManager::new(Arc::clone(&repo)),
        repo,
        bus.clone(),
        Arc::clone(clock),
    ));

    let schedule = Arc::new(FixtureCardScheduleQuery::new());
    let scanner = Arc::new(DeadlineScanner::new(
        schedule,
        markers,
        bus,
        Arc::clone(clock),
    ));
    let _scan_loop = scanner.spawn(scan_interval);

    let presence = Arc::new(PresenceService::new(
        registry,
        Arc::clone(hub) as Arc<dyn RealtimePublisher>,
    ));

    (
        HttpState::new(
            Arc::clone(&notifications) as Arc<dyn crate::domain::ports::NotificationQuery>,
            notifications,
            card_commands,
        ),
        WsState::new(Arc::clone(hub), presence),
    )
}

/// Build the HTTP server with the full pipeline attached. Must be called
/// from within an actix runtime because the bus dispatcher and the deadline
/// scan loop are spawned here.
pub async fn create_server(
    config: ServerConfig,
    health_state: web::Data<HealthState>,
) -> std::io::Result<Server> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let hub = Arc::new(BroadcastHub::new());

    let (http_state, ws_state) = match &config.redis_url {
        Some(url) => {
            let pool = redis::connect(url)
                .await
                .map_err(|e| std::io::Error::other(format!("redis connection failed: {e}")))?;
            build_pipeline(
                Arc::new(RedisNotificationFeed::new(pool.clone())),
                Arc::new(RedisDedupMarkerStore::new(pool.clone())),
                Arc::new(RedisPresenceRegistry::new(pool)),
                &hub,
                &clock,
                config.scan_interval,
            )
        }
        None => {
            warn!("REDIS_URL not set; running on in-memory fixtures");
            build_pipeline(
                Arc::new(FixtureNotificationFeed::new()),
                Arc::new(FixtureDedupMarkerStore::new(Arc::clone(&clock))),
                Arc::new(FixturePresenceRegistry::new()),
                &hub,
                &clock,
                config.scan_interval,
            )
        }
    };

    let http_state = web::Data::new(http_state);
    let ws_state = web::Data::new(ws_state);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(health_state.clone())
            .app_data(http_state.clone())
            .app_data(ws_state.clone())
            .service(live)
            .service(ready)
            .service(notifications::list_notifications)
            .service(notifications::mark_notification_read)
            .service(notifications::mark_all_notifications_read)
            .service(cards::move_card)
            .service(cards::assign_card)
            .service(cards::move_list)
            .service(cards::reorder_cards)
            .service(ws::ws_entry)
    })
    .bind(config.bind_addr)?
    .run();
    Ok(server)
}
