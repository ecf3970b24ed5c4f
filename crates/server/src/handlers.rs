use crate::Lobby;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use okey_core::Chips;
use okey_core::ID;
use okey_gameroom::Command;
use okey_gameroom::PlayerId;
use okey_gameroom::RoomId;
use okey_leaderboard::Leaderboard;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(serde::Deserialize)]
pub struct CreateRoomBody {
    pub name: String,
    pub stake: Chips,
}

pub async fn create(lobby: web::Data<Arc<Lobby>>, body: web::Json<CreateRoomBody>) -> impl Responder {
    if body.stake < 0 {
        return HttpResponse::BadRequest().body("stake must be non-negative");
    }
    let id = lobby.get_ref().clone().create_room(&body.name, body.stake).await;
    HttpResponse::Ok().json(serde_json::json!({ "room_id": id.to_string() }))
}

pub async fn leave(
    lobby: web::Data<Arc<Lobby>>,
    path: web::Path<uuid::Uuid>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let room = RoomId::from(path.into_inner());
    let Some(player) = query
        .get("playerId")
        .and_then(|s| s.parse::<uuid::Uuid>().ok())
        .map(PlayerId::from)
    else {
        return HttpResponse::BadRequest().body("playerId query parameter required");
    };
    match lobby.room(room).await {
        Some(handle) => match handle.commands.send(Command::Leave { player }).await {
            Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "status": "left" })),
            Err(_) => HttpResponse::NotFound().body("room is closing"),
        },
        None => HttpResponse::NotFound().body("room not found"),
    }
}

pub async fn enter(
    lobby: web::Data<Arc<Lobby>>,
    path: web::Path<uuid::Uuid>,
    query: web::Query<HashMap<String, String>>,
    body: web::Payload,
    req: HttpRequest,
) -> impl Responder {
    let room = RoomId::from(path.into_inner());
    let Some(player) = query
        .get("playerId")
        .and_then(|s| s.parse::<uuid::Uuid>().ok())
        .map(PlayerId::from)
    else {
        return HttpResponse::BadRequest()
            .body("playerId query parameter required")
            .map_into_right_body();
    };
    let name = query
        .get("name")
        .cloned()
        .unwrap_or_else(|| "anonymous".to_string());
    log::info!("player {} entering room {}", player, room);
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            match lobby.get_ref().clone().bridge(player, name, room, session, stream).await {
                Ok(()) => response.map_into_left_body(),
                Err(e) => HttpResponse::NotFound()
                    .body(e.to_string())
                    .map_into_right_body(),
            }
        }
        Err(e) => HttpResponse::InternalServerError()
            .body(e.to_string())
            .map_into_right_body(),
    }
}

pub async fn top(
    leaderboard: web::Data<Arc<Leaderboard>>,
    path: web::Path<usize>,
) -> impl Responder {
    let n = path.into_inner().min(100);
    match leaderboard.top(n).await {
        Ok(entries) => HttpResponse::Ok().json(entries),
        Err(e) => HttpResponse::ServiceUnavailable().body(e.to_string()),
    }
}

pub async fn rank(
    leaderboard: web::Data<Arc<Leaderboard>>,
    path: web::Path<uuid::Uuid>,
) -> impl Responder {
    let user = ID::from(path.into_inner());
    match leaderboard.rank_of(user).await {
        Ok(rank) => HttpResponse::Ok().json(serde_json::json!({ "rank": rank })),
        Err(e) => HttpResponse::ServiceUnavailable().body(e.to_string()),
    }
}
