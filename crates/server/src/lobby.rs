use futures::StreamExt;
use okey_database::Store;
use okey_gameroom::Command;
use okey_gameroom::ConnId;
use okey_gameroom::ConnectionRegistry;
use okey_gameroom::GameError;
use okey_gameroom::Outbound;
use okey_gameroom::PlayerId;
use okey_gameroom::Protocol;
use okey_gameroom::Room;
use okey_gameroom::RoomId;
use okey_gameroom::ServerMessage;
use okey_gameroom::Target;
use okey_gameroom::ClientIntent;
use okey_leaderboard::Leaderboard;
use okey_core::Chips;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;

/// Handle to a live room's command channel.
#[derive(Clone)]
pub struct RoomHandle {
    pub commands: tokio::sync::mpsc::Sender<Command>,
}

/// Manages active rooms, connections, and message routing.
///
/// The lobby owns the transport side of the room contract: it fans
/// targeted room output to sessions, maintains room groups, and feeds
/// decoded client intents into the right room's command channel.
pub struct Lobby {
    store: Arc<dyn Store>,
    leaderboard: Arc<Leaderboard>,
    registry: ConnectionRegistry,
    rooms: RwLock<HashMap<RoomId, RoomHandle>>,
    groups: RwLock<HashMap<RoomId, HashSet<ConnId>>>,
    conns: RwLock<HashMap<ConnId, UnboundedSender<String>>>,
}

impl Lobby {
    pub fn new(store: Arc<dyn Store>, leaderboard: Arc<Leaderboard>) -> Self {
        Self {
            store,
            leaderboard,
            registry: ConnectionRegistry::new(),
            rooms: RwLock::new(HashMap::new()),
            groups: RwLock::new(HashMap::new()),
            conns: RwLock::new(HashMap::new()),
        }
    }

    /// Opens a new room and wires its outbound, settlement, and lifecycle
    /// channels into the lobby.
    pub async fn create_room(self: Arc<Self>, name: &str, stake: Chips) -> RoomId {
        let channels = Room::spawn(name, stake, self.store.clone());
        let id = channels.id;
        self.rooms.write().await.insert(
            id,
            RoomHandle {
                commands: channels.commands.clone(),
            },
        );
        let router = self.clone();
        tokio::spawn(router.route_outbound(id, channels.outbound));
        let board = self.leaderboard.clone();
        let mut settled_rx = channels.settled;
        tokio::spawn(async move {
            while let Some(settled) = settled_rx.recv().await {
                board.publish(&settled.users).await;
            }
        });
        let closer = self.clone();
        let done = channels.done;
        tokio::spawn(async move {
            let _ = done.await;
            closer.close(id).await;
            log::info!("[lobby] room {} cleaned up", id);
        });
        log::info!("[lobby] created room {}", id);
        id
    }

    /// Removes a finished room and its group.
    pub async fn close(&self, id: RoomId) {
        self.rooms.write().await.remove(&id);
        self.groups.write().await.remove(&id);
    }

    pub async fn room(&self, id: RoomId) -> Option<RoomHandle> {
        self.rooms.read().await.get(&id).cloned()
    }

    /// Spawns the WebSocket bridge for one connection.
    ///
    /// Joins (or reconnects) the player into the room, then pumps room
    /// output to the socket and socket frames into intents until either
    /// side closes.
    pub async fn bridge(
        self: Arc<Self>,
        player: PlayerId,
        name: String,
        room: RoomId,
        mut session: actix_ws::Session,
        mut stream: actix_ws::MessageStream,
    ) -> anyhow::Result<()> {
        let conn = ConnId::default();
        let (tx, mut rx) = unbounded_channel::<String>();
        self.conns.write().await.insert(conn, tx);
        self.attach(player, &name, room, conn).await?;
        log::debug!("[bridge {}] connected as {}", conn, player);
        let lobby = self;
        actix_web::rt::spawn(async move {
            'sesh: loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Some(json) => if session.text(json).await.is_err() { break 'sesh },
                        None => break 'sesh,
                    },
                    msg = stream.next() => match msg {
                        Some(Ok(actix_ws::Message::Text(text))) => {
                            lobby.clone().handle_intent(player, &name, conn, &text).await;
                        }
                        Some(Ok(actix_ws::Message::Close(_))) => break 'sesh,
                        Some(Err(_)) => break 'sesh,
                        None => break 'sesh,
                        _ => continue 'sesh,
                    },
                }
            }
            lobby.detach(player, conn).await;
            log::debug!("[bridge {}] disconnected", conn);
        });
        Ok(())
    }

    /// Seats or re-seats a player: a registry mapping into the same room
    /// means this socket is a reconnect, not a fresh join.
    async fn attach(
        &self,
        player: PlayerId,
        name: &str,
        room: RoomId,
        conn: ConnId,
    ) -> anyhow::Result<()> {
        let handle = self
            .room(room)
            .await
            .ok_or_else(|| anyhow::anyhow!("room not found"))?;
        let returning = self.registry.lookup(player).is_some_and(|m| m.room == room);
        self.groups.write().await.entry(room).or_default().insert(conn);
        self.registry.save(player, room, conn);
        let command = if returning {
            Command::Reconnect { player, conn }
        } else {
            Command::Join {
                player,
                name: name.to_string(),
                conn,
            }
        };
        handle.commands.send(command).await?;
        Ok(())
    }

    /// Tears one connection down and tells the room its player dropped.
    async fn detach(&self, player: PlayerId, conn: ConnId) {
        self.conns.write().await.remove(&conn);
        if let Some(mapping) = self.registry.lookup(player) {
            if mapping.conn == conn {
                self.groups
                    .write()
                    .await
                    .get_mut(&mapping.room)
                    .map(|g| g.remove(&conn));
                if let Some(handle) = self.room(mapping.room).await {
                    let _ = handle.commands.send(Command::Disconnect { player }).await;
                }
            }
        }
    }

    /// Decodes one inbound frame and routes it.
    pub async fn handle_intent(self: Arc<Self>, player: PlayerId, name: &str, conn: ConnId, text: &str) {
        let intent = match Protocol::decode(text) {
            Ok(intent) => intent,
            Err(e) => {
                self.reject(conn, &GameError::InvalidAction(e.to_string())).await;
                return;
            }
        };
        match &intent {
            ClientIntent::CreateRoom { name: room_name, stake } => {
                let room = self.clone().create_room(room_name, *stake).await;
                if let Err(e) = self.attach(player, name, room, conn).await {
                    log::warn!("[lobby] create-then-join failed: {}", e);
                    self.reject(conn, &GameError::RoomNotFound).await;
                }
            }
            ClientIntent::JoinRoom { room_id } => {
                let room = RoomId::from(*room_id);
                if self.attach(player, name, room, conn).await.is_err() {
                    self.reject(conn, &GameError::RoomNotFound).await;
                }
            }
            intent => {
                let Some(room) = intent.room_id().map(RoomId::from) else {
                    return;
                };
                let Some(handle) = self.room(room).await else {
                    self.reject(conn, &GameError::RoomNotFound).await;
                    return;
                };
                match Protocol::command(intent, player) {
                    Ok(Some(command)) => {
                        let _ = handle.commands.send(command).await;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        self.reject(conn, &GameError::InvalidAction(e.to_string())).await;
                    }
                }
            }
        }
    }

    /// Routes one room's outbound stream to sessions until the room dies.
    async fn route_outbound(self: Arc<Self>, room: RoomId, mut rx: UnboundedReceiver<Outbound>) {
        while let Some(out) = rx.recv().await {
            let json = out.message.to_json();
            match out.target {
                Target::Connection(conn) => self.send_raw(conn, json).await,
                Target::Group => {
                    let members = self
                        .groups
                        .read()
                        .await
                        .get(&room)
                        .cloned()
                        .unwrap_or_default();
                    for conn in members {
                        self.send_raw(conn, json.clone()).await;
                    }
                }
            }
        }
    }

    async fn send_raw(&self, conn: ConnId, json: String) {
        if let Some(tx) = self.conns.read().await.get(&conn) {
            let _ = tx.send(json);
        }
    }

    async fn reject(&self, conn: ConnId, error: &GameError) {
        self.send_raw(conn, ServerMessage::error(error).to_json()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use okey_database::MemoryStore;
    use okey_leaderboard::MemorySortedSet;

    fn lobby() -> Arc<Lobby> {
        let store = Arc::new(MemoryStore::new());
        let projection = Arc::new(MemorySortedSet::new());
        let board = Arc::new(Leaderboard::new(projection, store.clone()));
        Arc::new(Lobby::new(store, board))
    }

    #[tokio::test]
    async fn create_and_close_rooms() {
        let lobby = lobby();
        let id = lobby.clone().create_room("masa", 100).await;
        assert!(lobby.room(id).await.is_some());
        lobby.close(id).await;
        assert!(lobby.room(id).await.is_none());
    }

    #[tokio::test]
    async fn attach_rejects_unknown_room() {
        let lobby = lobby();
        let result = lobby
            .attach(PlayerId::default(), "x", RoomId::default(), ConnId::default())
            .await;
        assert!(result.is_err());
    }
}
