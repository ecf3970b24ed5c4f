use crate::Command;
use crate::ConnId;
use crate::GameError;
use crate::GamePhase;
use crate::GameView;
use crate::OpponentView;
use crate::Outbound;
use crate::PlayerId;
use crate::SeatedPlayer;
use crate::ServerMessage;
use crate::Table;
use crate::Target;
use crate::TimerEvent;
use crate::TurnPhase;
use crate::message::now_millis;
use crate::timer;
use crate::timer::TimerHandle;
use okey_bots::Bot;
use okey_bots::Decision;
use okey_bots::Difficulty;
use okey_bots::DrawSource;
use okey_core::Chips;
use okey_core::DRAIN_DEADLINE_MILLIS;
use okey_core::FULL_SET;
use okey_core::ID;
use okey_core::RECONNECT_EXTENSION_SECONDS;
use okey_core::RECONNECT_WINDOW_SECONDS;
use okey_core::Seat;
use okey_core::TURN_SECONDS;
use okey_core::TurnNumber;
use okey_core::Unique;
use okey_database::GameHistory;
use okey_database::GameStatus;
use okey_database::PlayerResult;
use okey_database::Store;
use okey_fairness::Commitment;
use okey_fairness::FairRng;
use okey_fairness::next_nonce;
use okey_fairness::serialize_tiles;
use okey_fairness::server_seed;
use okey_rules::WinKind;
use okey_rules::wins_with_discard;
use okey_settlement::GameOutcome;
use okey_settlement::Participant;
use okey_settlement::SettleError;
use okey_settlement::Settled;
use okey_settlement::cancel_with_refund;
use okey_settlement::collect_stakes;
use okey_settlement::settle_with_retry;
use okey_tiles::Tile;
use okey_tiles::TileId;
use okey_tiles::full_set;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::Receiver;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Channel endpoints handed to whoever hosts the room.
pub struct RoomChannels {
    pub id: ID<Room>,
    pub commands: Sender<Command>,
    pub outbound: UnboundedReceiver<Outbound>,
    pub settled: UnboundedReceiver<Settled>,
    pub done: oneshot::Receiver<()>,
}

/// Authoritative state for one table.
///
/// All mutation happens on the room's own task, fed by one bounded command
/// channel; ordering within the room is total and no lock is ever taken.
/// Commands are validated in full before the first mutation, so a rejected
/// command leaves the room bit-identical.
pub struct Room {
    id: ID<Self>,
    name: String,
    stake: Chips,
    phase: GamePhase,
    turn_phase: TurnPhase,
    table: Table,
    host: Option<PlayerId>,
    deck: Vec<Tile>,
    discard: Vec<Tile>,
    indicator: Option<Tile>,
    commitment: Option<Commitment>,
    client_seed: Option<String>,
    dealer: Seat,
    turn: Seat,
    turn_number: TurnNumber,
    turn_duration: Duration,
    timer: Option<TimerHandle>,
    last_timeout: Option<PlayerId>,
    history: Option<GameHistory>,
    store: Arc<dyn Store>,
    commands: Sender<Command>,
    outbound: UnboundedSender<Outbound>,
    settled: UnboundedSender<Settled>,
    bots_spawned: usize,
}

impl Room {
    /// Creates a room and spawns its single-writer loop.
    pub fn spawn(name: &str, stake: Chips, store: Arc<dyn Store>) -> RoomChannels {
        let (commands_tx, commands_rx) = mpsc::channel(64);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let room = Self {
            id: ID::default(),
            name: name.to_string(),
            stake,
            phase: GamePhase::Waiting,
            turn_phase: TurnPhase::WaitingForDraw,
            table: Table::new(),
            host: None,
            deck: Vec::new(),
            discard: Vec::new(),
            indicator: None,
            commitment: None,
            client_seed: None,
            dealer: Seat::South,
            turn: Seat::South,
            turn_number: 0,
            turn_duration: Duration::from_secs(TURN_SECONDS),
            timer: None,
            last_timeout: None,
            history: None,
            store,
            commands: commands_tx.clone(),
            outbound: outbound_tx,
            settled: settled_tx,
            bots_spawned: 0,
        };
        let id = room.id;
        tokio::spawn(room.run(commands_rx, done_tx));
        RoomChannels {
            id,
            commands: commands_tx,
            outbound: outbound_rx,
            settled: settled_rx,
            done: done_rx,
        }
    }

    async fn run(mut self, mut rx: Receiver<Command>, done: oneshot::Sender<()>) {
        log::info!("[room {}] open: {} (stake {})", self.id, self.name, self.stake);
        while let Some(command) = rx.recv().await {
            if matches!(command, Command::Stop) {
                self.drain(&mut rx).await;
                break;
            }
            self.handle(command).await;
            if self.phase.terminal() {
                break;
            }
        }
        if !self.phase.terminal() && self.phase.started() {
            self.cancel_game("room loop ending").await;
        }
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        log::info!("[room {}] closed ({})", self.id, self.phase);
        let _ = done.send(());
    }

    /// Drains already-queued commands for up to the drain deadline;
    /// anything arriving later is rejected by the closed channel.
    async fn drain(&mut self, rx: &mut Receiver<Command>) {
        let deadline = Instant::now() + Duration::from_millis(DRAIN_DEADLINE_MILLIS);
        log::debug!("[room {}] draining", self.id);
        while Instant::now() < deadline {
            match rx.try_recv() {
                Ok(Command::Stop) => continue,
                Ok(command) => {
                    self.handle(command).await;
                    if self.phase.terminal() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        log::trace!("[room {}] command: {:?}", self.id, command);
        match command {
            Command::Join { player, name, conn } => {
                if let Err(e) = self.join(player, &name, conn) {
                    self.unicast_conn(conn, ServerMessage::error(&e));
                }
            }
            Command::Leave { player } => {
                if let Err(e) = self.leave(player).await {
                    self.fail(player, e);
                }
            }
            Command::Start { player, difficulty } => {
                if let Err(e) = self.start(player, difficulty).await {
                    self.fail(player, e);
                }
            }
            Command::AddBots {
                player,
                count,
                difficulty,
            } => {
                if let Err(e) = self.add_bots(player, count, difficulty) {
                    self.fail(player, e);
                }
            }
            Command::SetClientSeed { player, seed } => {
                if let Err(e) = self.set_client_seed(player, seed) {
                    self.fail(player, e);
                }
            }
            Command::Draw {
                player,
                from_discard,
            } => {
                if let Err(e) = self.draw(player, from_discard) {
                    self.fail(player, e);
                }
            }
            Command::Discard { player, tile } => {
                if let Err(e) = self.discard(player, tile).await {
                    self.fail(player, e);
                }
            }
            Command::DeclareWin { player, tile } => {
                if let Err(e) = self.declare_win(player, tile).await {
                    self.fail(player, e);
                }
            }
            Command::Disconnect { player } => self.disconnect(player),
            Command::Reconnect { player, conn } => {
                if let Err(e) = self.reconnect(player, conn) {
                    self.unicast_conn(conn, ServerMessage::error(&e));
                }
            }
            Command::Timer(event) => self.on_timer(event).await,
            Command::BotAct { seat, turn } => self.on_bot_act(seat, turn).await,
            Command::Stop => {}
        }
        if self.phase == GamePhase::Playing {
            if let Err(e) = self.check_invariants() {
                log::error!("[room {}] {}", self.id, e);
                self.broadcast(ServerMessage::error(&e));
                self.cancel_game("fatal invariant").await;
            }
        }
    }
}

// ============================================================================
// ROSTER
// ============================================================================
impl Room {
    fn join(&mut self, player: PlayerId, name: &str, conn: ConnId) -> Result<(), GameError> {
        if self.phase.started() {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.table.get(player).is_some() {
            return Err(GameError::InvalidAction("already seated".into()));
        }
        let Some(seat) = self.table.first_free() else {
            return Err(GameError::RoomFull);
        };
        self.table.sit(SeatedPlayer::human(player, name, seat, conn));
        self.host.get_or_insert(player);
        log::info!("[room {}] {} sat at {}", self.id, name, seat);
        self.unicast_conn(
            conn,
            ServerMessage::RoomJoined {
                id: self.id.to_string(),
                name: self.name.clone(),
                stake: self.stake,
                current_player_count: self.table.occupied(),
                max_players: okey_core::TABLE_SEATS,
                is_game_started: self.phase.started(),
            },
        );
        self.broadcast(ServerMessage::OnPlayerJoined {
            player_id: player,
            player_name: name.to_string(),
            position: seat as u8,
            total_players: self.table.occupied(),
        });
        if self.table.is_full() {
            self.transition(GamePhase::Ready);
        }
        Ok(())
    }

    async fn leave(&mut self, player: PlayerId) -> Result<(), GameError> {
        if self.table.get(player).is_none() {
            return Err(GameError::NotFound("player".into()));
        }
        if self.phase.started() && !self.phase.terminal() {
            log::info!("[room {}] {} left mid-game, cancelling", self.id, player);
            self.cancel_game("player left").await;
            return Ok(());
        }
        let removed = self.table.remove(player).expect("presence checked above");
        if self.host == Some(player) {
            self.host = self.table.humans().next().map(SeatedPlayer::id);
        }
        if let Some(conn) = removed.conn() {
            self.unicast_conn(
                conn,
                ServerMessage::OnRoomLeft {
                    room_id: self.id.to_string(),
                },
            );
        }
        self.broadcast(ServerMessage::OnPlayerLeft {
            player_id: player,
            timestamp: now_millis(),
        });
        if self.phase == GamePhase::Ready {
            self.transition(GamePhase::Waiting);
        }
        Ok(())
    }

    fn add_bots(
        &mut self,
        player: PlayerId,
        count: usize,
        difficulty: Difficulty,
    ) -> Result<(), GameError> {
        if self.phase.started() {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.host != Some(player) {
            return Err(GameError::InvalidAction("only the host seats bots".into()));
        }
        for _ in 0..count {
            let Some(seat) = self.table.first_free() else {
                break;
            };
            self.seat_bot(seat, difficulty);
        }
        if self.table.is_full() {
            self.transition(GamePhase::Ready);
        }
        Ok(())
    }

    fn seat_bot(&mut self, seat: Seat, difficulty: Difficulty) {
        self.bots_spawned += 1;
        let bot = SeatedPlayer::bot(seat, difficulty, self.bots_spawned);
        log::info!(
            "[room {}] {} ({}) sat at {}",
            self.id,
            bot.display_name(),
            difficulty,
            seat
        );
        self.broadcast(ServerMessage::OnPlayerJoined {
            player_id: bot.id(),
            player_name: bot.display_name().to_string(),
            position: seat as u8,
            total_players: self.table.occupied() + 1,
        });
        self.table.sit(bot);
    }

    fn set_client_seed(&mut self, player: PlayerId, seed: String) -> Result<(), GameError> {
        if self.phase.started() {
            return Err(GameError::InvalidPhase(
                "client seed is fixed once shuffling begins".into(),
            ));
        }
        if self.table.get(player).is_none() {
            return Err(GameError::NotFound("player".into()));
        }
        log::debug!("[room {}] client seed set by {}", self.id, player);
        self.client_seed = Some(seed);
        Ok(())
    }
}

// ============================================================================
// GAME START
// ============================================================================
impl Room {
    async fn start(&mut self, player: PlayerId, difficulty: Difficulty) -> Result<(), GameError> {
        if self.phase.started() {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.host != Some(player) {
            return Err(GameError::InvalidAction("only the host starts".into()));
        }
        while !self.table.is_full() {
            let seat = self.table.first_free().expect("not full");
            self.seat_bot(seat, difficulty);
        }
        if self.phase == GamePhase::Waiting {
            self.transition(GamePhase::Ready);
        }
        // run the whole shuffle protocol before any side effect is visible
        let seed = server_seed();
        let nonce = next_nonce();
        let mut rng = FairRng::new(&seed, self.client_seed.as_deref(), nonce);
        let mut tiles = full_set();
        okey_rules::shuffle(&mut tiles, &mut rng);
        let initial_state = serialize_tiles(&tiles);
        let indicator = okey_rules::choose_indicator(&mut tiles, &mut rng);
        let commitment = Commitment::new(seed, initial_state, nonce, self.client_seed.clone());
        let history = GameHistory::started(
            self.id.inner(),
            self.stake,
            commitment.hash(),
            self.client_seed.clone(),
        );
        if let Err(e) = self.store.create_history(&history).await {
            log::warn!("[room {}] could not record game start: {}", self.id, e);
            return Err(GameError::PersistenceUnavailable);
        }
        let humans = self
            .table
            .humans()
            .filter_map(SeatedPlayer::user_id)
            .collect::<Vec<_>>();
        match collect_stakes(&*self.store, history.id(), self.stake, &humans).await {
            Ok(()) => {}
            Err(SettleError::InsufficientBalance(user)) => {
                self.history = Some(history);
                self.cancel_game("insufficient stake").await;
                return Err(GameError::InsufficientBalance {
                    player: user.cast(),
                });
            }
            Err(e) => {
                log::warn!("[room {}] stake collection failed: {}", self.id, e);
                self.history = Some(history);
                self.cancel_game("stake collection failed").await;
                return Err(GameError::PersistenceUnavailable);
            }
        }
        // stakes are in; commit the shuffle to the table
        self.transition(GamePhase::Shuffling);
        self.history = Some(history);
        self.commitment = Some(commitment);
        self.indicator = Some(indicator);
        self.transition(GamePhase::Dealing);
        let (hands, deck) = okey_rules::deal(tiles, self.dealer);
        self.deck = deck;
        self.discard.clear();
        for seat in Seat::all() {
            let hand = hands[seat.index()].clone();
            if let Some(seated) = self.table.at_mut(seat) {
                *seated.hand_mut() = hand;
                if let Some(bot) = seated.bot_mut() {
                    bot.memory_mut().observe(&indicator);
                }
            }
        }
        for seat in Seat::all() {
            if let Some(seated) = self.table.at_mut(seat) {
                let hand = seated.hand().to_vec();
                if let Some(bot) = seated.bot_mut() {
                    bot.memory_mut().observe_hand(&hand);
                }
            }
        }
        self.turn = self.dealer;
        self.turn_number = 1;
        self.turn_phase = TurnPhase::WaitingForDiscard;
        self.transition(GamePhase::Playing);
        let hash = self
            .commitment
            .as_ref()
            .map(|c| c.hash().to_string())
            .unwrap_or_default();
        for seated in self.table.players() {
            let (Some(conn), false) = (seated.conn(), seated.is_bot()) else {
                continue;
            };
            let view = self.view_for(seated.seat());
            self.unicast_conn(
                conn,
                ServerMessage::OnGameStarted {
                    room_id: self.id.to_string(),
                    initial_state: view,
                    server_seed_hash: hash.clone(),
                },
            );
        }
        log::info!(
            "[room {}] game started, dealer {}, commitment {}",
            self.id,
            self.dealer,
            hash
        );
        self.begin_turn();
        Ok(())
    }
}

// ============================================================================
// TURN ACTIONS
// ============================================================================
impl Room {
    fn turn_guard(&mut self, player: PlayerId) -> Result<Seat, GameError> {
        if self.phase != GamePhase::Playing {
            return Err(GameError::InvalidPhase(format!("phase is {}", self.phase)));
        }
        let seat = self
            .table
            .seat_of(player)
            .ok_or_else(|| GameError::NotFound("player".into()))?;
        if seat != self.turn {
            if self.last_timeout == Some(player) {
                self.last_timeout = None;
                return Err(GameError::TimeExpired);
            }
            return Err(GameError::NotYourTurn {
                current: self.table.at(self.turn).map(SeatedPlayer::id),
            });
        }
        self.last_timeout = None;
        Ok(seat)
    }

    fn draw(&mut self, player: PlayerId, from_discard: bool) -> Result<(), GameError> {
        let seat = self.turn_guard(player)?;
        if self.turn_phase != TurnPhase::WaitingForDraw {
            return Err(GameError::InvalidAction("draw is not pending".into()));
        }
        if from_discard && self.discard.is_empty() {
            return Err(GameError::InvalidAction("discard pile is empty".into()));
        }
        if !from_discard && self.deck.is_empty() {
            return Err(GameError::InvalidAction("deck is exhausted".into()));
        }
        self.apply_draw(seat, from_discard)
    }

    fn apply_draw(&mut self, seat: Seat, from_discard: bool) -> Result<(), GameError> {
        let tile = if from_discard {
            let tile = self
                .discard
                .pop()
                .ok_or_else(|| GameError::InvalidAction("discard pile is empty".into()))?;
            self.observe_pickup(seat, &tile);
            tile
        } else {
            self.deck
                .pop()
                .ok_or_else(|| GameError::InvalidAction("deck is exhausted".into()))?
        };
        let seated = self.table.at_mut(seat).expect("turn seat is occupied");
        let player = seated.id();
        let conn = seated.conn();
        seated.hand_mut().push(tile);
        seated.set_has_drawn(true);
        if let Some(bot) = seated.bot_mut() {
            bot.memory_mut().observe(&tile);
        }
        self.turn_phase = TurnPhase::WaitingForDiscard;
        if let Some(conn) = conn {
            self.unicast_conn(
                conn,
                ServerMessage::OnTileDrawn {
                    tile,
                    from_discard,
                    timestamp: now_millis(),
                },
            );
        }
        self.unicast_others(
            seat,
            ServerMessage::OnOpponentDrewTile {
                player_id: player,
                from_discard,
                timestamp: now_millis(),
            },
        );
        self.broadcast(ServerMessage::OnDeckUpdated {
            remaining_tile_count: self.deck.len(),
            discard_pile_count: self.discard.len(),
        });
        Ok(())
    }

    async fn discard(&mut self, player: PlayerId, tile: TileId) -> Result<(), GameError> {
        let seat = self.turn_guard(player)?;
        if self.turn_phase != TurnPhase::WaitingForDiscard {
            return Err(GameError::InvalidAction("draw before discarding".into()));
        }
        if !self.table.at(seat).expect("turn seat is occupied").holds(tile) {
            return Err(GameError::NotFound("tile in hand".into()));
        }
        self.apply_discard(seat, tile).await
    }

    async fn apply_discard(&mut self, seat: Seat, tile: TileId) -> Result<(), GameError> {
        let seated = self.table.at_mut(seat).expect("turn seat is occupied");
        let player = seated.id();
        let thrown = seated
            .take(tile)
            .ok_or_else(|| GameError::NotFound("tile in hand".into()))?;
        seated.set_has_drawn(false);
        self.discard.push(thrown);
        self.observe_discard(&thrown);
        let next = seat.next();
        self.broadcast(ServerMessage::OnTileDiscarded {
            player_id: player,
            tile_id: thrown.id(),
            tile: thrown,
            next_turn_player_id: self.table.at(next).map(SeatedPlayer::id),
            next_turn_position: next as u8,
            timestamp: now_millis(),
        });
        self.broadcast(ServerMessage::OnDeckUpdated {
            remaining_tile_count: self.deck.len(),
            discard_pile_count: self.discard.len(),
        });
        self.turn_phase = TurnPhase::TurnCompleted;
        if self.deck.is_empty() {
            self.finish_deck_empty().await;
            return Ok(());
        }
        self.turn = next;
        self.turn_number += 1;
        self.turn_phase = TurnPhase::WaitingForDraw;
        self.begin_turn();
        Ok(())
    }

    async fn declare_win(&mut self, player: PlayerId, tile: TileId) -> Result<(), GameError> {
        let seat = self.turn_guard(player)?;
        if self.turn_phase != TurnPhase::WaitingForDiscard {
            return Err(GameError::InvalidAction("draw before declaring".into()));
        }
        let seated = self.table.at(seat).expect("turn seat is occupied");
        if !seated.holds(tile) {
            return Err(GameError::NotFound("tile in hand".into()));
        }
        let Some(kind) = wins_with_discard(seated.hand(), tile) else {
            return Err(GameError::InvalidAction(
                "that discard does not complete the hand".into(),
            ));
        };
        self.finish_win(seat, kind, tile).await;
        Ok(())
    }

    /// Starts the clock for the current turn and, for bot seats, schedules
    /// the bot's move after its think time.
    fn begin_turn(&mut self) {
        if let Some(old) = self.timer.take() {
            old.stop();
        }
        let seated = self.table.at(self.turn).expect("turn seat is occupied");
        let player = seated.id();
        let name = seated.display_name().to_string();
        self.timer = Some(timer::start(
            self.turn_number,
            self.turn_duration,
            self.commands.clone(),
        ));
        self.broadcast(ServerMessage::OnTurnChanged {
            player_id: player,
            player_name: name,
            position: self.turn as u8,
            time_left: self.turn_duration.as_secs(),
            turn_number: self.turn_number,
            turn_phase: self.turn_phase.to_string(),
        });
        if self.table.at(self.turn).is_some_and(SeatedPlayer::is_bot) {
            self.schedule_bot(self.turn);
        }
    }

    fn schedule_bot(&mut self, seat: Seat) {
        let Some(think) = self
            .table
            .at_mut(seat)
            .and_then(SeatedPlayer::bot_mut)
            .map(Bot::think_time)
        else {
            return;
        };
        let commands = self.commands.clone();
        let turn = self.turn_number;
        tokio::spawn(async move {
            tokio::time::sleep(think).await;
            let _ = commands.send(Command::BotAct { seat, turn }).await;
        });
    }

    async fn on_bot_act(&mut self, seat: Seat, turn: TurnNumber) {
        if self.phase != GamePhase::Playing || self.turn != seat || self.turn_number != turn {
            return;
        }
        let Some(seated) = self.table.at(seat) else {
            return;
        };
        if !seated.is_bot() {
            return;
        }
        if self.turn_phase == TurnPhase::WaitingForDraw {
            let source = seated
                .bot_ref()
                .expect("bot seat")
                .decide_draw(seated.hand(), self.discard.last());
            if let Err(e) = self.apply_draw(seat, source == DrawSource::Discard) {
                log::error!("[room {}] bot draw failed: {}", self.id, e);
                return;
            }
        }
        let seated = self.table.at(seat).expect("bot seat");
        match seated.bot_ref().expect("bot seat").decide_discard(seated.hand()) {
            Decision::Discard(tile) => {
                if let Err(e) = self.apply_discard(seat, tile.id()).await {
                    log::error!("[room {}] bot discard failed: {}", self.id, e);
                }
            }
            Decision::DeclareWin(win) => {
                self.finish_win(seat, win.kind, win.discard.id()).await;
            }
        }
    }
}

// ============================================================================
// TIMER & AUTO-PLAY
// ============================================================================
impl Room {
    async fn on_timer(&mut self, event: TimerEvent) {
        if self.phase != GamePhase::Playing {
            return;
        }
        let current = self.timer.as_ref().map(TimerHandle::turn);
        match event {
            TimerEvent::Tick { turn, remaining } => {
                if current != Some(turn) {
                    return;
                }
                let Some(seated) = self.table.at(self.turn) else {
                    return;
                };
                self.broadcast(ServerMessage::OnTurnTimerTick {
                    player_id: seated.id(),
                    time_left: remaining,
                    is_critical: remaining <= okey_core::TURN_CRITICAL_SECONDS,
                });
            }
            TimerEvent::Timeout { turn } => {
                if current != Some(turn) || self.turn_number != turn {
                    return;
                }
                self.auto_play().await;
            }
        }
    }

    /// Substitutes an Easy bot for the player whose clock ran out.
    async fn auto_play(&mut self) {
        let seated = self.table.at(self.turn).expect("turn seat is occupied");
        let player = seated.id();
        let is_bot = seated.is_bot();
        log::info!("[room {}] turn {} timed out for {}", self.id, self.turn_number, player);
        if !is_bot {
            self.last_timeout = Some(player);
            self.broadcast(ServerMessage::OnPlayerTimeout {
                player_id: player,
                turn_number: self.turn_number,
            });
            self.broadcast(ServerMessage::OnAutoPlayTriggered {
                player_id: player,
                reason: "Timeout".to_string(),
            });
        }
        let stand_in = Bot::easy();
        if self.turn_phase == TurnPhase::WaitingForDraw {
            let seated = self.table.at(self.turn).expect("turn seat is occupied");
            let source = stand_in.decide_draw(seated.hand(), self.discard.last());
            if let Err(e) = self.apply_draw(self.turn, source == DrawSource::Discard) {
                log::error!("[room {}] auto-play draw failed: {}", self.id, e);
                return;
            }
        }
        let seated = self.table.at(self.turn).expect("turn seat is occupied");
        match stand_in.decide_discard(seated.hand()) {
            Decision::Discard(tile) => {
                if let Err(e) = self.apply_discard(self.turn, tile.id()).await {
                    log::error!("[room {}] auto-play discard failed: {}", self.id, e);
                }
            }
            Decision::DeclareWin(win) => {
                self.finish_win(self.turn, win.kind, win.discard.id()).await;
            }
        }
    }
}

// ============================================================================
// CONNECTION LIFECYCLE
// ============================================================================
impl Room {
    fn disconnect(&mut self, player: PlayerId) {
        let Some(seated) = self.table.get_mut(player) else {
            return;
        };
        if seated.is_bot() || !seated.connected() {
            return;
        }
        seated.mark_disconnected();
        log::info!("[room {}] {} disconnected", self.id, player);
        self.broadcast(ServerMessage::OnPlayerDisconnected {
            player_id: player,
            reconnection_timeout_seconds: RECONNECT_WINDOW_SECONDS,
            timestamp: now_millis(),
        });
    }

    fn reconnect(&mut self, player: PlayerId, conn: ConnId) -> Result<(), GameError> {
        let Some(seated) = self.table.get(player) else {
            return Err(GameError::NotFound("player".into()));
        };
        if seated.connected() {
            return Err(GameError::InvalidAction("already connected".into()));
        }
        let expired = seated
            .disconnected_at()
            .is_none_or(|at| at.elapsed() > Duration::from_secs(RECONNECT_WINDOW_SECONDS));
        if expired {
            return Err(GameError::ReconnectExpired);
        }
        let seat = seated.seat();
        self.table
            .get_mut(player)
            .expect("presence checked above")
            .mark_reconnected(conn);
        log::info!("[room {}] {} reconnected", self.id, player);
        if self.phase == GamePhase::Playing && self.turn == seat {
            if let Some(timer) = self.timer.as_ref() {
                timer.extend(Duration::from_secs(RECONNECT_EXTENSION_SECONDS));
            }
        }
        self.broadcast(ServerMessage::OnPlayerReconnected {
            player_id: player,
            timestamp: now_millis(),
        });
        self.unicast_conn(
            conn,
            ServerMessage::OnReconnected {
                room_id: self.id.to_string(),
                game_state: self.view_for(seat),
                message: "welcome back".to_string(),
            },
        );
        Ok(())
    }
}

// ============================================================================
// GAME END
// ============================================================================
impl Room {
    async fn finish_win(&mut self, seat: Seat, kind: WinKind, tile: TileId) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        // the winning discard goes face-up like any other
        if let Some(thrown) = self
            .table
            .at_mut(seat)
            .and_then(|seated| seated.take(tile))
        {
            self.discard.push(thrown);
        }
        let winner = self.table.at(seat).expect("winner is seated");
        let winner_id = winner.id();
        log::info!(
            "[room {}] {} wins ({}) discarding tile {}",
            self.id,
            winner_id,
            kind,
            tile
        );
        self.transition(GamePhase::Finished);
        let outcome = GameOutcome {
            winner: seat,
            kind,
            participants: self.participants(),
        };
        let reveal = match self.commitment.as_mut() {
            Some(commitment) => commitment.reveal(),
            None => return,
        };
        let history = self.history.clone().expect("playing game has a history");
        match settle_with_retry(&*self.store, &history, &outcome, &reveal.server_seed).await {
            Ok(settled) => {
                self.broadcast(ServerMessage::OnGameEnded {
                    winner_id: Some(winner_id),
                    win_type: Some(kind.to_string()),
                    win_score: Some(settled.score),
                    timestamp: now_millis(),
                });
                self.broadcast(ServerMessage::OnShuffleRevealed {
                    game_history_id: history.id().to_string(),
                    reveal,
                });
                if settled.applied {
                    let _ = self.settled.send(settled);
                }
            }
            Err(e) => {
                log::error!("[room {}] settlement failed: {}", self.id, e);
                self.phase = GamePhase::Cancelled;
                let results = self.null_results();
                let _ = cancel_with_refund(
                    &*self.store,
                    &history,
                    GameStatus::Cancelled,
                    results,
                    &reveal.server_seed,
                )
                .await
                .inspect_err(|e| {
                    log::error!("[room {}] refund also failed: {}", self.id, e)
                });
                self.broadcast(ServerMessage::OnGamePhaseChanged {
                    old_phase: GamePhase::Finished.to_string(),
                    new_phase: GamePhase::Cancelled.to_string(),
                });
                self.broadcast(ServerMessage::OnShuffleRevealed {
                    game_history_id: history.id().to_string(),
                    reveal,
                });
            }
        }
    }

    /// Deck exhaustion: nobody wins, stakes go back.
    async fn finish_deck_empty(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        log::info!("[room {}] deck exhausted, washing the game", self.id);
        self.transition(GamePhase::Finished);
        let Some(reveal) = self.commitment.as_mut().map(Commitment::reveal) else {
            return;
        };
        let history = self.history.clone().expect("playing game has a history");
        let results = self.null_results();
        if let Err(e) = cancel_with_refund(
            &*self.store,
            &history,
            GameStatus::Completed,
            results,
            &reveal.server_seed,
        )
        .await
        {
            log::error!("[room {}] deck-empty refund failed: {}", self.id, e);
        }
        self.broadcast(ServerMessage::OnGameEnded {
            winner_id: None,
            win_type: None,
            win_score: None,
            timestamp: now_millis(),
        });
        self.broadcast(ServerMessage::OnShuffleRevealed {
            game_history_id: history.id().to_string(),
            reveal,
        });
    }

    /// Cancels from any phase: refund what was collected, reveal if there
    /// was a commitment, then go terminal.
    async fn cancel_game(&mut self, reason: &str) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        log::warn!("[room {}] cancelling: {}", self.id, reason);
        let old = self.phase;
        self.phase = GamePhase::Cancelled;
        if old != GamePhase::Cancelled {
            self.broadcast(ServerMessage::OnGamePhaseChanged {
                old_phase: old.to_string(),
                new_phase: GamePhase::Cancelled.to_string(),
            });
        }
        let Some(history) = self.history.clone() else {
            return;
        };
        let reveal = self.commitment.as_mut().map(Commitment::reveal);
        let seed = reveal
            .as_ref()
            .map(|r| r.server_seed.clone())
            .unwrap_or_default();
        let results = self.null_results();
        if let Err(e) =
            cancel_with_refund(&*self.store, &history, GameStatus::Cancelled, results, &seed).await
        {
            log::error!("[room {}] cancel refund failed: {}", self.id, e);
        }
        if let Some(reveal) = reveal {
            self.broadcast(ServerMessage::OnShuffleRevealed {
                game_history_id: history.id().to_string(),
                reveal,
            });
        }
    }

    fn participants(&self) -> Vec<Participant> {
        self.table
            .players()
            .map(|p| Participant {
                user: p.user_id(),
                seat: p.seat(),
                display_name: p.display_name().to_string(),
                wilds_left: p.wilds_left(),
            })
            .collect()
    }

    fn null_results(&self) -> Vec<PlayerResult> {
        self.table
            .players()
            .map(|p| PlayerResult {
                user_id: p.user_id(),
                seat: p.seat(),
                display_name: p.display_name().to_string(),
                is_bot: p.is_bot(),
                won: false,
                chips_delta: 0,
                elo_change: 0,
            })
            .collect()
    }
}

// ============================================================================
// PROJECTION & FAN-OUT
// ============================================================================
impl Room {
    /// The world as seen from one seat. Opponents' tile identities never
    /// appear here, whatever the phase.
    fn view_for(&self, seat: Seat) -> GameView {
        let own = self
            .table
            .at(seat)
            .map(|p| p.hand().to_vec())
            .unwrap_or_default();
        let opponents = self
            .table
            .players()
            .filter(|p| p.seat() != seat)
            .map(|p| OpponentView {
                player_id: p.id(),
                display_name: p.display_name().to_string(),
                position: p.seat() as u8,
                tile_count: p.hand().len(),
            })
            .collect();
        GameView {
            room_id: self.id.to_string(),
            phase: self.phase.to_string(),
            turn_phase: self.turn_phase.to_string(),
            hand: own,
            opponents,
            indicator: self.indicator,
            current_turn_player_id: self.table.at(self.turn).map(SeatedPlayer::id),
            current_turn_position: self.turn as u8,
            deck_count: self.deck.len(),
            discard_top: self.discard.last().copied(),
            commitment_hash: self.commitment.as_ref().map(|c| c.hash().to_string()),
            timestamp: now_millis(),
        }
    }

    fn transition(&mut self, to: GamePhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        log::debug!("[room {}] phase {} -> {}", self.id, from, to);
        self.phase = to;
        self.broadcast(ServerMessage::OnGamePhaseChanged {
            old_phase: from.to_string(),
            new_phase: to.to_string(),
        });
    }

    fn broadcast(&self, message: ServerMessage) {
        let _ = self.outbound.send(Outbound {
            target: Target::Group,
            message,
        });
    }

    fn unicast_conn(&self, conn: ConnId, message: ServerMessage) {
        let _ = self.outbound.send(Outbound {
            target: Target::Connection(conn),
            message,
        });
    }

    /// Sends to every connected human except the actor.
    fn unicast_others(&self, except: Seat, message: ServerMessage) {
        for seated in self.table.players().filter(|p| p.seat() != except) {
            if let Some(conn) = seated.conn().filter(|_| !seated.is_bot()) {
                self.unicast_conn(conn, message.clone());
            }
        }
    }

    /// Routes a user-level rejection back to whoever sent the command.
    fn fail(&self, player: PlayerId, error: GameError) {
        log::debug!("[room {}] rejected {}: {}", self.id, player, error);
        if let Some(conn) = self.table.get(player).and_then(SeatedPlayer::conn) {
            self.unicast_conn(conn, ServerMessage::error(&error));
        }
    }

    fn observe_discard(&mut self, tile: &Tile) {
        for seated in self.table.players_mut() {
            if let Some(bot) = seated.bot_mut() {
                bot.memory_mut().observe(tile);
            }
        }
    }

    fn observe_pickup(&mut self, by: Seat, tile: &Tile) {
        for seated in self.table.players_mut() {
            if let Some(bot) = seated.bot_mut() {
                bot.memory_mut().observe_pickup(by, tile);
            }
        }
    }

    /// Tile conservation and hand-size invariants; a violation is fatal.
    fn check_invariants(&self) -> Result<(), GameError> {
        let in_hands: usize = self.table.players().map(|p| p.hand().len()).sum();
        let total = self.deck.len() + self.discard.len() + in_hands + 1;
        if total != FULL_SET {
            return Err(GameError::FatalInvariant(format!(
                "tile count diverged: {} of {}",
                total, FULL_SET
            )));
        }
        for seated in self.table.players() {
            let size = seated.hand().len();
            let expected_fifteen =
                seated.seat() == self.turn && self.turn_phase == TurnPhase::WaitingForDiscard;
            match (size, expected_fifteen) {
                (15, true) | (14, false) => {}
                _ => {
                    return Err(GameError::FatalInvariant(format!(
                        "hand size {} at {} in {}",
                        size,
                        seated.seat(),
                        self.turn_phase
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Unique for Room {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use okey_database::MemoryStore;
    use okey_database::User;
    use okey_tiles::Color;

    struct Harness {
        channels: RoomChannels,
        store: Arc<MemoryStore>,
        players: Vec<(PlayerId, ConnId)>,
    }

    async fn harness_with_balances(balances: [Chips; 4]) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let channels = Room::spawn("table", 100, store.clone());
        let mut players = Vec::new();
        for (i, balance) in balances.into_iter().enumerate() {
            let user = User::new(&format!("u{}", i), &format!("U{}", i), balance);
            store.create_user(&user).await.unwrap();
            let player: PlayerId = user.id().cast();
            let conn = ConnId::default();
            channels
                .commands
                .send(Command::Join {
                    player,
                    name: format!("U{}", i),
                    conn,
                })
                .await
                .unwrap();
            players.push((player, conn));
        }
        Harness {
            channels,
            store,
            players,
        }
    }

    async fn harness() -> Harness {
        harness_with_balances([1_000; 4]).await
    }

    async fn next(rx: &mut UnboundedReceiver<Outbound>) -> Outbound {
        tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timely message")
            .expect("open channel")
    }

    async fn wait_for<F>(rx: &mut UnboundedReceiver<Outbound>, mut pred: F) -> Outbound
    where
        F: FnMut(&Outbound) -> bool,
    {
        loop {
            let out = next(rx).await;
            if pred(&out) {
                return out;
            }
        }
    }

    async fn started_view(h: &mut Harness, conn: ConnId) -> GameView {
        let host = h.players[0].0;
        h.channels
            .commands
            .send(Command::Start {
                player: host,
                difficulty: Difficulty::Normal,
            })
            .await
            .unwrap();
        let out = wait_for(&mut h.channels.outbound, |o| {
            o.target == Target::Connection(conn)
                && matches!(o.message, ServerMessage::OnGameStarted { .. })
        })
        .await;
        match out.message {
            ServerMessage::OnGameStarted { initial_state, .. } => initial_state,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn joins_fill_seats_and_fifth_is_rejected() {
        let mut h = harness().await;
        let out = wait_for(&mut h.channels.outbound, |o| {
            matches!(
                &o.message,
                ServerMessage::OnPlayerJoined { position, .. } if *position == Seat::West as u8
            )
        })
        .await;
        assert_eq!(out.target, Target::Group);
        let fifth = ConnId::default();
        h.channels
            .commands
            .send(Command::Join {
                player: PlayerId::default(),
                name: "late".into(),
                conn: fifth,
            })
            .await
            .unwrap();
        let out = wait_for(&mut h.channels.outbound, |o| {
            matches!(&o.message, ServerMessage::OnError { .. })
        })
        .await;
        assert_eq!(out.target, Target::Connection(fifth));
        match out.message {
            ServerMessage::OnError { kind, .. } => assert_eq!(kind, "RoomFull"),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn start_collects_stakes_and_projects_privately() {
        let mut h = harness().await;
        let conn = h.players[0].1;
        let view = started_view(&mut h, conn).await;
        // dealer's own hand in full, opponents by count only
        assert_eq!(view.hand.len(), 15);
        assert_eq!(view.opponents.len(), 3);
        assert!(view.opponents.iter().all(|o| o.tile_count == 14));
        assert_eq!(view.deck_count, okey_core::DECK_AFTER_DEAL);
        assert!(view.commitment_hash.is_some());
        for (player, _) in &h.players {
            let user = h.store.user(player.cast()).await.unwrap().unwrap();
            assert_eq!(user.chips(), 900);
        }
    }

    #[tokio::test]
    async fn out_of_turn_discard_is_rejected_without_state_change() {
        let mut h = harness().await;
        let east_conn = h.players[1].1;
        let south_conn = h.players[0].1;
        let _ = started_view(&mut h, south_conn).await;
        h.channels
            .commands
            .send(Command::Discard {
                player: h.players[1].0,
                tile: 3,
            })
            .await
            .unwrap();
        let out = wait_for(&mut h.channels.outbound, |o| {
            matches!(&o.message, ServerMessage::OnError { .. })
        })
        .await;
        assert_eq!(out.target, Target::Connection(east_conn));
        match out.message {
            ServerMessage::OnError { kind, .. } => assert_eq!(kind, "NotYourTurn"),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn turn_advances_counter_clockwise() {
        let mut h = harness().await;
        let south = h.players[0].0;
        let south_conn = h.players[0].1;
        let view = started_view(&mut h, south_conn).await;
        let tile = view
            .hand
            .iter()
            .find(|t| !t.is_okey())
            .expect("a discardable tile")
            .id();
        h.channels
            .commands
            .send(Command::Discard {
                player: south,
                tile,
            })
            .await
            .unwrap();
        let out = wait_for(&mut h.channels.outbound, |o| {
            matches!(&o.message, ServerMessage::OnTileDiscarded { .. })
        })
        .await;
        match out.message {
            ServerMessage::OnTileDiscarded {
                next_turn_position, ..
            } => assert_eq!(next_turn_position, Seat::West as u8),
            _ => unreachable!(),
        }
        wait_for(&mut h.channels.outbound, |o| {
            matches!(
                &o.message,
                ServerMessage::OnTurnChanged { position, .. } if *position == Seat::West as u8
            )
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_triggers_auto_play_and_advances() {
        let mut h = harness().await;
        let south = h.players[0].0;
        let south_conn = h.players[0].1;
        let _ = started_view(&mut h, south_conn).await;
        let out = wait_for(&mut h.channels.outbound, |o| {
            matches!(&o.message, ServerMessage::OnTurnTimerTick { is_critical: true, .. })
        })
        .await;
        assert_eq!(out.target, Target::Group);
        wait_for(&mut h.channels.outbound, |o| {
            matches!(
                &o.message,
                ServerMessage::OnPlayerTimeout { player_id, .. } if *player_id == south
            )
        })
        .await;
        wait_for(&mut h.channels.outbound, |o| {
            matches!(&o.message, ServerMessage::OnAutoPlayTriggered { reason, .. } if reason == "Timeout")
        })
        .await;
        wait_for(&mut h.channels.outbound, |o| {
            matches!(
                &o.message,
                ServerMessage::OnTurnChanged { position, .. } if *position == Seat::West as u8
            )
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_inside_window_reattaches() {
        let mut h = harness().await;
        let east = h.players[1].0;
        let south_conn = h.players[0].1;
        let _ = started_view(&mut h, south_conn).await;
        h.channels
            .commands
            .send(Command::Disconnect { player: east })
            .await
            .unwrap();
        wait_for(&mut h.channels.outbound, |o| {
            matches!(&o.message, ServerMessage::OnPlayerDisconnected { .. })
        })
        .await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        let fresh = ConnId::default();
        h.channels
            .commands
            .send(Command::Reconnect {
                player: east,
                conn: fresh,
            })
            .await
            .unwrap();
        wait_for(&mut h.channels.outbound, |o| {
            matches!(&o.message, ServerMessage::OnPlayerReconnected { .. })
        })
        .await;
        let out = wait_for(&mut h.channels.outbound, |o| {
            matches!(&o.message, ServerMessage::OnReconnected { .. })
        })
        .await;
        assert_eq!(out.target, Target::Connection(fresh));
        match out.message {
            ServerMessage::OnReconnected { game_state, .. } => {
                assert_eq!(game_state.hand.len(), 14);
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_after_window_is_rejected() {
        let mut h = harness().await;
        let east = h.players[1].0;
        let south_conn = h.players[0].1;
        let _ = started_view(&mut h, south_conn).await;
        h.channels
            .commands
            .send(Command::Disconnect { player: east })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(31)).await;
        let fresh = ConnId::default();
        h.channels
            .commands
            .send(Command::Reconnect {
                player: east,
                conn: fresh,
            })
            .await
            .unwrap();
        let out = wait_for(&mut h.channels.outbound, |o| {
            o.target == Target::Connection(fresh)
        })
        .await;
        match out.message {
            ServerMessage::OnError { kind, .. } => assert_eq!(kind, "ReconnectExpired"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn insufficient_stake_cancels_without_moving_chips() {
        let mut h = harness_with_balances([1_000, 1_000, 1_000, 50]).await;
        let host = h.players[0].0;
        h.channels
            .commands
            .send(Command::Start {
                player: host,
                difficulty: Difficulty::Normal,
            })
            .await
            .unwrap();
        let out = wait_for(&mut h.channels.outbound, |o| {
            matches!(&o.message, ServerMessage::OnError { .. })
        })
        .await;
        assert_eq!(out.target, Target::Connection(h.players[0].1));
        match out.message {
            ServerMessage::OnError { kind, .. } => assert_eq!(kind, "InsufficientBalance"),
            _ => unreachable!(),
        }
        for ((player, _), expected) in h.players.iter().zip([1_000, 1_000, 1_000, 50]) {
            let user = h.store.user(player.cast()).await.unwrap().unwrap();
            assert_eq!(user.chips(), expected);
        }
    }

    #[tokio::test]
    async fn declared_win_settles_the_table() {
        let store = Arc::new(MemoryStore::new());
        let (commands_tx, _commands_rx) = mpsc::channel(8);
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel();
        let mut table = Table::new();
        let mut user_ids = Vec::new();
        for (i, seat) in Seat::all().into_iter().enumerate() {
            let user = User::new(&format!("u{}", i), &format!("U{}", i), 1_000);
            store.create_user(&user).await.unwrap();
            user_ids.push(user.id());
            table.sit(SeatedPlayer::human(
                user.id().cast(),
                user.display_name(),
                seat,
                ConnId::default(),
            ));
        }
        // South holds four runs plus the winning discard
        let mut hand = Vec::new();
        for (base, color, from, len) in [
            (0u8, Color::Yellow, 1u8, 3u8),
            (3, Color::Blue, 4, 3),
            (6, Color::Black, 7, 4),
            (10, Color::Red, 2, 4),
        ] {
            for i in 0..len {
                hand.push(Tile::new(base + i, color, from + i));
            }
        }
        hand.push(Tile::new(14, Color::Red, 13));
        *table.at_mut(Seat::South).unwrap().hand_mut() = hand;
        for (i, seat) in [Seat::East, Seat::North, Seat::West].into_iter().enumerate() {
            let junk = (0..14u8)
                .map(|j| Tile::new(20 + 14 * i as u8 + j, Color::from(j % 4), (j % 13) + 1))
                .collect::<Vec<_>>();
            *table.at_mut(seat).unwrap().hand_mut() = junk;
        }
        let history = GameHistory::started(uuid::Uuid::now_v7(), 100, "hash", None);
        store.create_history(&history).await.unwrap();
        collect_stakes(&*store, history.id(), 100, &user_ids)
            .await
            .unwrap();
        let south = table.at(Seat::South).unwrap().id();
        let mut room = Room {
            id: ID::default(),
            name: "rigged".into(),
            stake: 100,
            phase: GamePhase::Playing,
            turn_phase: TurnPhase::WaitingForDiscard,
            table,
            host: Some(south),
            deck: vec![Tile::new(90, Color::Yellow, 13)],
            discard: Vec::new(),
            indicator: Some(Tile::new(91, Color::Red, 1)),
            commitment: Some(Commitment::new("seed".into(), "state".into(), 1, None)),
            client_seed: None,
            dealer: Seat::South,
            turn: Seat::South,
            turn_number: 1,
            turn_duration: Duration::from_secs(TURN_SECONDS),
            timer: None,
            last_timeout: None,
            history: Some(history.clone()),
            store: store.clone(),
            commands: commands_tx,
            outbound: outbound_tx,
            settled: settled_tx,
            bots_spawned: 0,
        };
        room.declare_win(south, 14).await.unwrap();
        assert_eq!(room.phase, GamePhase::Finished);
        let winner = store.user(user_ids[0]).await.unwrap().unwrap();
        assert_eq!(winner.chips(), 1_280);
        assert_eq!(winner.games_won(), 1);
        assert!(winner.elo() >= 1_003);
        let stored = store.history(history.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), GameStatus::Completed);
        assert!(settled_rx.try_recv().is_ok());
        let out = wait_for(&mut outbound_rx, |o| {
            matches!(&o.message, ServerMessage::OnShuffleRevealed { .. })
        })
        .await;
        match out.message {
            ServerMessage::OnShuffleRevealed { reveal, .. } => assert!(reveal.verify()),
            _ => unreachable!(),
        }
    }
}
