use crate::PlayerId;
use crate::SeatedPlayer;
use okey_core::Seat;
use okey_core::TABLE_SEATS;

/// The physical table: four seats, filled in join order South, East,
/// North, West. Separates roster bookkeeping from game logic.
#[derive(Default)]
pub struct Table {
    seats: [Option<SeatedPlayer>; TABLE_SEATS],
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }
    /// The next seat a joiner would take.
    pub fn first_free(&self) -> Option<Seat> {
        Seat::all()
            .into_iter()
            .find(|s| self.seats[s.index()].is_none())
    }
    pub fn sit(&mut self, player: SeatedPlayer) {
        let seat = player.seat();
        self.seats[seat.index()] = Some(player);
    }
    pub fn remove(&mut self, player: PlayerId) -> Option<SeatedPlayer> {
        self.seats
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|p| p.id() == player))
            .and_then(Option::take)
    }
    pub fn occupied(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }
    pub fn is_full(&self) -> bool {
        self.occupied() == TABLE_SEATS
    }
    pub fn at(&self, seat: Seat) -> Option<&SeatedPlayer> {
        self.seats[seat.index()].as_ref()
    }
    pub fn at_mut(&mut self, seat: Seat) -> Option<&mut SeatedPlayer> {
        self.seats[seat.index()].as_mut()
    }
    pub fn get(&self, player: PlayerId) -> Option<&SeatedPlayer> {
        self.players().find(|p| p.id() == player)
    }
    pub fn get_mut(&mut self, player: PlayerId) -> Option<&mut SeatedPlayer> {
        self.players_mut().find(|p| p.id() == player)
    }
    pub fn seat_of(&self, player: PlayerId) -> Option<Seat> {
        self.get(player).map(SeatedPlayer::seat)
    }
    pub fn players(&self) -> impl Iterator<Item = &SeatedPlayer> {
        self.seats.iter().filter_map(Option::as_ref)
    }
    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut SeatedPlayer> {
        self.seats.iter_mut().filter_map(Option::as_mut)
    }
    pub fn humans(&self) -> impl Iterator<Item = &SeatedPlayer> {
        self.players().filter(|p| !p.is_bot())
    }
    /// Connected human count; the room cancels when this hits zero mid-game.
    pub fn connected_humans(&self) -> usize {
        self.humans().filter(|p| p.connected()).count()
    }
}
