//! The client's read-only copy of a game.
//!
//! A [`Mirror`] never applies moves itself. It only swaps in whole
//! authoritative snapshots, and only newer ones, so out-of-order or
//! duplicated updates cannot roll the board back.
//!
//! Hover previews come from one of two places:
//!
//! - [`Mirror::preview_local`] computes flips against the mirrored
//!   snapshot, with no round trip.
//! - [`Mirror::begin_probe`] / [`Mirror::accept_preview`] ask the
//!   authority and keep only the answer to the latest question, computed
//!   against the board the mirror is showing.

use flipside_board::{BoardSnapshot, FlipSet, Piece, Position, Score};
use flipside_protocol::{GameId, GameStatus, GameUpdate, Message, Preview};

use crate::Seat;

/// Outcome of offering something to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Taken; the view changed.
    Applied,
    /// Older than (or for a different game than) what is shown. Dropped.
    Stale,
}

#[derive(Debug, Clone)]
struct View {
    version: u64,
    board: BoardSnapshot,
    turn: Piece,
    status: GameStatus,
    score: Score,
    winner: Option<Piece>,
}

/// Client-side mirror of one seated game.
#[derive(Debug, Clone, Default)]
pub struct Mirror {
    seat: Option<Seat>,
    view: Option<View>,
    preview: Option<(Position, FlipSet)>,
    next_seq: u64,
    pending_probe: Option<u64>,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the mirror to a game. A different game starts from scratch.
    pub fn seat(&mut self, game: GameId, color: Piece) {
        if self.seat.map(|s| s.game) != Some(game) {
            self.view = None;
            self.clear_preview();
        }
        self.seat = Some(Seat { game, color });
    }

    /// Applies an authoritative update if it is newer than the current view.
    pub fn apply_update(&mut self, update: &GameUpdate) -> Reconcile {
        if let Some(seat) = self.seat {
            if seat.game != update.id {
                return Reconcile::Stale;
            }
        }
        if let Some(view) = &self.view {
            if update.version <= view.version {
                tracing::debug!(
                    held = view.version,
                    got = update.version,
                    "dropping stale game update"
                );
                return Reconcile::Stale;
            }
        }

        self.view = Some(View {
            version: update.version,
            board: update.board,
            turn: update.turn,
            status: update.status,
            score: update.score,
            winner: update.winner,
        });
        self.clear_preview();
        Reconcile::Applied
    }

    // -- reading ------------------------------------------------------------

    pub fn version(&self) -> Option<u64> {
        self.view.as_ref().map(|v| v.version)
    }

    pub fn board(&self) -> Option<&BoardSnapshot> {
        self.view.as_ref().map(|v| &v.board)
    }

    pub fn turn(&self) -> Option<Piece> {
        self.view.as_ref().map(|v| v.turn)
    }

    pub fn status(&self) -> Option<GameStatus> {
        self.view.as_ref().map(|v| v.status)
    }

    pub fn score(&self) -> Option<Score> {
        self.view.as_ref().map(|v| v.score)
    }

    pub fn winner(&self) -> Option<Piece> {
        self.view.as_ref().and_then(|v| v.winner)
    }

    pub fn color(&self) -> Option<Piece> {
        self.seat.map(|s| s.color)
    }

    /// `true` when seated, playing, and our color is to move.
    pub fn is_my_turn(&self) -> bool {
        match (&self.view, self.seat) {
            (Some(view), Some(seat)) => {
                !view.status.is_finished() && view.turn == seat.color
            }
            _ => false,
        }
    }

    /// The live preview, if any.
    pub fn preview(&self) -> Option<(Position, &FlipSet)> {
        self.preview.as_ref().map(|(at, flips)| (*at, flips))
    }

    // -- previews -----------------------------------------------------------

    /// Computes the hover preview at `at` from the mirrored board.
    ///
    /// Squares that capture nothing (or are occupied, or off the board)
    /// show no preview.
    pub fn preview_local(&mut self, at: Position) -> Option<&FlipSet> {
        self.pending_probe = None;
        self.preview = match (&self.view, self.seat) {
            (Some(view), Some(seat)) => view
                .board
                .preview(seat.color, at)
                .ok()
                .map(|flips| (at, flips)),
            _ => None,
        };
        self.preview.as_ref().map(|(_, flips)| flips)
    }

    /// Starts an authority round trip for a hover at `at`. Returns the
    /// probe's sequence number and the `Probe` to send. Any earlier probe
    /// is superseded.
    pub fn begin_probe(&mut self, at: Position) -> (u64, Message) {
        self.next_seq += 1;
        self.pending_probe = Some(self.next_seq);
        let probe = Message::Probe {
            seq: self.next_seq,
            row: at.row,
            col: at.col,
        };
        (self.next_seq, probe)
    }

    /// Forgets probe `seq` if it is still the one awaiting an answer.
    pub fn cancel_probe(&mut self, seq: u64) {
        if self.pending_probe == Some(seq) {
            self.pending_probe = None;
        }
    }

    /// Keeps `preview` only if it answers the latest probe and was
    /// computed against the board currently shown.
    pub fn accept_preview(&mut self, preview: Preview) -> Reconcile {
        let current = self.pending_probe == Some(preview.seq)
            && self.version() == Some(preview.version);
        if !current {
            return Reconcile::Stale;
        }
        self.pending_probe = None;
        self.preview = if preview.flips.is_empty() {
            None
        } else {
            Some((preview.at, preview.flips))
        };
        Reconcile::Applied
    }

    /// The pointer left the board (or the player left the game).
    pub fn leave(&mut self) {
        self.clear_preview();
    }

    fn clear_preview(&mut self) {
        self.preview = None;
        self.pending_probe = None;
    }
}

#[cfg(test)]
mod tests {
    use flipside_board::{Board, Move, validate};

    use super::*;

    struct Game {
        id: GameId,
        board: Board,
        turn: Piece,
        version: u64,
    }

    impl Game {
        fn new() -> Self {
            Self {
                id: GameId::new_v4(),
                board: Board::initial(),
                turn: Piece::Black,
                version: 0,
            }
        }

        fn update(&self) -> GameUpdate {
            GameUpdate {
                id: self.id,
                version: self.version,
                board: self.board.snapshot(),
                turn: self.turn,
                status: GameStatus::Active,
                score: self.board.score(),
                last_move: None,
                passed: None,
                winner: None,
            }
        }

        fn play(&mut self, row: u8, col: u8) -> GameUpdate {
            let at = Position::new(row, col);
            let flips = validate(&self.board, self.turn, at).unwrap();
            self.board = self.board.apply(Move { piece: self.turn, at }, &flips);
            self.turn = !self.turn;
            self.version += 1;
            self.update()
        }
    }

    fn mirror_for(game: &Game, color: Piece) -> Mirror {
        let mut m = Mirror::new();
        m.seat(game.id, color);
        assert_eq!(m.apply_update(&game.update()), Reconcile::Applied);
        m
    }

    #[test]
    fn test_apply_update_out_of_order_keeps_newest() {
        let mut game = Game::new();
        let mut m = mirror_for(&game, Piece::White);
        let v1 = game.play(2, 3);
        let v2 = game.play(2, 2);

        assert_eq!(m.apply_update(&v2), Reconcile::Applied);
        assert_eq!(m.apply_update(&v1), Reconcile::Stale);

        assert_eq!(m.version(), Some(2));
        assert_eq!(m.board(), Some(&game.board.snapshot()));
    }

    #[test]
    fn test_apply_update_duplicate_is_stale() {
        let mut game = Game::new();
        let mut m = mirror_for(&game, Piece::White);
        let v1 = game.play(2, 3);

        assert_eq!(m.apply_update(&v1), Reconcile::Applied);
        assert_eq!(m.apply_update(&v1), Reconcile::Stale);
    }

    #[test]
    fn test_apply_update_for_other_game_is_stale() {
        let game = Game::new();
        let mut m = mirror_for(&game, Piece::Black);
        let mut other = Game::new();
        other.version = 9;

        assert_eq!(m.apply_update(&other.update()), Reconcile::Stale);
        assert_eq!(m.version(), Some(0));
    }

    #[test]
    fn test_is_my_turn_follows_updates() {
        let mut game = Game::new();
        let mut m = mirror_for(&game, Piece::Black);
        assert!(m.is_my_turn());

        m.apply_update(&game.play(2, 3));

        assert!(!m.is_my_turn());
        assert_eq!(m.turn(), Some(Piece::White));
    }

    #[test]
    fn test_preview_local_shows_flips_for_legal_square() {
        let game = Game::new();
        let mut m = mirror_for(&game, Piece::Black);

        let flips = m.preview_local(Position::new(2, 3)).unwrap();

        assert_eq!(flips.as_slice(), [Position::new(3, 3)]);
    }

    #[test]
    fn test_preview_local_illegal_square_clears_preview() {
        let game = Game::new();
        let mut m = mirror_for(&game, Piece::Black);
        m.preview_local(Position::new(2, 3));

        assert!(m.preview_local(Position::new(0, 0)).is_none());
        assert!(m.preview().is_none());
    }

    #[test]
    fn test_accept_preview_keeps_only_latest_probe() {
        let game = Game::new();
        let mut m = mirror_for(&game, Piece::Black);
        let (first, _) = m.begin_probe(Position::new(2, 3));
        let (second, _) = m.begin_probe(Position::new(3, 2));
        let answer = |seq, at: Position, flip: Position| Preview {
            seq,
            version: 0,
            at,
            flips: vec![flip].into(),
        };

        let late = answer(first, Position::new(2, 3), Position::new(3, 3));
        assert_eq!(m.accept_preview(late), Reconcile::Stale);

        let fresh = answer(second, Position::new(3, 2), Position::new(3, 3));
        assert_eq!(m.accept_preview(fresh), Reconcile::Applied);
        assert_eq!(m.preview().map(|(at, _)| at), Some(Position::new(3, 2)));
    }

    #[test]
    fn test_begin_probe_returns_seq_carried_by_message() {
        let game = Game::new();
        let mut m = mirror_for(&game, Piece::Black);

        let (seq, probe) = m.begin_probe(Position::new(2, 3));

        assert_eq!(seq, 1);
        assert_eq!(probe, Message::Probe { seq: 1, row: 2, col: 3 });
        assert_eq!(m.begin_probe(Position::new(2, 3)).0, 2);
    }

    #[test]
    fn test_cancel_probe_drops_its_answer() {
        let game = Game::new();
        let mut m = mirror_for(&game, Piece::Black);
        let (seq, _) = m.begin_probe(Position::new(2, 3));

        m.cancel_probe(seq);

        let preview = Preview {
            seq,
            version: 0,
            at: Position::new(2, 3),
            flips: vec![Position::new(3, 3)].into(),
        };
        assert_eq!(m.accept_preview(preview), Reconcile::Stale);
        assert!(m.preview().is_none());
    }

    #[test]
    fn test_cancel_probe_ignores_superseded_seq() {
        let game = Game::new();
        let mut m = mirror_for(&game, Piece::Black);
        let (first, _) = m.begin_probe(Position::new(2, 3));
        let (second, _) = m.begin_probe(Position::new(3, 2));

        m.cancel_probe(first);

        let preview = Preview {
            seq: second,
            version: 0,
            at: Position::new(3, 2),
            flips: vec![Position::new(3, 3)].into(),
        };
        assert_eq!(m.accept_preview(preview), Reconcile::Applied);
    }

    #[test]
    fn test_accept_preview_against_old_board_is_stale() {
        let mut game = Game::new();
        let mut m = mirror_for(&game, Piece::White);
        let (seq, _) = m.begin_probe(Position::new(2, 2));
        // The authority answers against version 0, but a move lands first.
        m.apply_update(&game.play(2, 3));

        let preview = Preview {
            seq,
            version: 0,
            at: Position::new(2, 2),
            flips: vec![Position::new(3, 3)].into(),
        };

        assert_eq!(m.accept_preview(preview), Reconcile::Stale);
    }

    #[test]
    fn test_leave_clears_preview() {
        let game = Game::new();
        let mut m = mirror_for(&game, Piece::Black);
        m.preview_local(Position::new(2, 3));

        m.leave();

        assert!(m.preview().is_none());
    }

    #[test]
    fn test_new_update_clears_preview() {
        let mut game = Game::new();
        let mut m = mirror_for(&game, Piece::White);
        assert!(m.preview_local(Position::new(2, 4)).is_some());

        m.apply_update(&game.play(2, 3));

        assert!(m.preview().is_none());
    }
}
