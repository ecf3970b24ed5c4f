use crate::ConnId;
use crate::PlayerId;
use okey_bots::Difficulty;
use okey_core::Seat;
use okey_core::TurnNumber;
use okey_tiles::TileId;

/// Everything that can enter a room's single-writer loop.
///
/// User intents, transport lifecycle, timer events, and delayed bot
/// actions all arrive on the same bounded channel, which is what gives a
/// room its total ordering.
#[derive(Debug, Clone)]
pub enum Command {
    Join {
        player: PlayerId,
        name: String,
        conn: ConnId,
    },
    Leave {
        player: PlayerId,
    },
    Start {
        player: PlayerId,
        difficulty: Difficulty,
    },
    AddBots {
        player: PlayerId,
        count: usize,
        difficulty: Difficulty,
    },
    SetClientSeed {
        player: PlayerId,
        seed: String,
    },
    Draw {
        player: PlayerId,
        from_discard: bool,
    },
    Discard {
        player: PlayerId,
        tile: TileId,
    },
    DeclareWin {
        player: PlayerId,
        tile: TileId,
    },
    Disconnect {
        player: PlayerId,
    },
    Reconnect {
        player: PlayerId,
        conn: ConnId,
    },
    /// Emitted by the room's own timer task.
    Timer(TimerEvent),
    /// A bot's decision falling due after its think time.
    BotAct {
        seat: Seat,
        turn: TurnNumber,
    },
    /// Begin drain-and-shutdown.
    Stop,
}

/// Timer messages, stamped with the turn they belong to so stale events
/// from a superseded timer are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick {
        turn: TurnNumber,
        remaining: u64,
    },
    Timeout {
        turn: TurnNumber,
    },
}
