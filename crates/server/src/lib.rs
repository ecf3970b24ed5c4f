//! Unified okey backend server.
//!
//! One actix-web application hosting the room lifecycle routes, the
//! per-room WebSocket bridge, and the leaderboard query API.
//!
//! ## Submodules
//!
//! - [`lobby`] — Room handles, connection routing, WebSocket bridge
//! - [`handlers`] — HTTP route handlers
pub mod handlers;
pub mod lobby;

pub use lobby::Lobby;
pub use lobby::RoomHandle;

use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use actix_web::middleware::Logger;
use actix_web::web;
use okey_database::Store;
use okey_leaderboard::Leaderboard;
use okey_leaderboard::MemorySortedSet;
use std::sync::Arc;
use std::time::Duration;

/// How often the leaderboard reconciler re-syncs from the store.
const RECONCILE_INTERVAL: Duration = Duration::from_secs(300);

async fn health(store: web::Data<Arc<dyn Store>>) -> impl Responder {
    match store
        .user(okey_core::ID::from(uuid::Uuid::nil()))
        .await
        .inspect_err(|e| log::error!("health check failed: {}", e))
    {
        Ok(_) => HttpResponse::Ok().body("ok"),
        Err(_) => HttpResponse::ServiceUnavailable().body("store unavailable"),
    }
}

#[rustfmt::skip]
pub async fn run() -> Result<(), std::io::Error> {
    let store: Arc<dyn Store> = Arc::new(okey_database::db().await);
    let projection = Arc::new(MemorySortedSet::new());
    let leaderboard = Arc::new(Leaderboard::new(projection, store.clone()));
    if let Err(e) = leaderboard.sync_from_store().await {
        log::warn!("initial leaderboard sync failed: {}", e);
    }
    let _reconciler = leaderboard.clone().spawn_reconciler(RECONCILE_INTERVAL);
    let lobby = web::Data::new(Arc::new(Lobby::new(store.clone(), leaderboard.clone())));
    let leaderboard = web::Data::new(leaderboard);
    let store = web::Data::new(store);
    log::info!("starting okey server");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(lobby.clone())
            .app_data(leaderboard.clone())
            .app_data(store.clone())
            .route("/health", web::get().to(health))
            .service(
                web::scope("/room")
                    .route("/create", web::post().to(handlers::create))
                    .route("/enter/{room_id}", web::get().to(handlers::enter))
                    .route("/leave/{room_id}", web::post().to(handlers::leave)),
            )
            .service(
                web::scope("/leaderboard")
                    .route("/top/{n}", web::get().to(handlers::top))
                    .route("/rank/{user_id}", web::get().to(handlers::rank)),
            )
    })
    .workers(6)
    .bind(std::env::var("BIND_ADDR").expect("BIND_ADDR must be set"))?
    .run()
    .await
}
