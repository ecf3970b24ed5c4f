use crate::ConnId;
use crate::PlayerId;
use crate::RoomId;
use chrono::DateTime;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

/// Where a player lives: their room, their last connection, and when that
/// connection was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub room: RoomId,
    pub conn: ConnId,
    pub connected_at: DateTime<Utc>,
}

/// Player ↔ room ↔ connection mapping.
///
/// Plain atomic puts and deletes; reads never block writers for long. The
/// reconnect window itself is the room's to enforce from its stored
/// disconnect timestamp, so a stale mapping here is harmless observability
/// data, not authority.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<HashMap<PlayerId, Mapping>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn save(&self, player: PlayerId, room: RoomId, conn: ConnId) {
        let mapping = Mapping {
            room,
            conn,
            connected_at: Utc::now(),
        };
        self.inner
            .write()
            .expect("registry lock poisoned")
            .insert(player, mapping);
    }
    pub fn lookup(&self, player: PlayerId) -> Option<Mapping> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .get(&player)
            .copied()
    }
    pub fn remove(&self, player: PlayerId) -> Option<Mapping> {
        self.inner
            .write()
            .expect("registry lock poisoned")
            .remove(&player)
    }
    /// Players currently mapped into a room.
    pub fn members(&self, room: RoomId) -> Vec<(PlayerId, Mapping)> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .iter()
            .filter(|(_, m)| m.room == room)
            .map(|(p, m)| (*p, *m))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_lookup_remove() {
        let registry = ConnectionRegistry::new();
        let player = PlayerId::default();
        let room = RoomId::default();
        let conn = ConnId::default();
        assert!(registry.lookup(player).is_none());
        registry.save(player, room, conn);
        let mapping = registry.lookup(player).expect("saved");
        assert_eq!(mapping.room, room);
        assert_eq!(mapping.conn, conn);
        assert_eq!(registry.members(room).len(), 1);
        registry.remove(player);
        assert!(registry.lookup(player).is_none());
    }

    #[test]
    fn newer_connection_replaces_older() {
        let registry = ConnectionRegistry::new();
        let player = PlayerId::default();
        let room = RoomId::default();
        registry.save(player, room, ConnId::default());
        let newer = ConnId::default();
        registry.save(player, room, newer);
        assert_eq!(registry.lookup(player).expect("saved").conn, newer);
    }
}
