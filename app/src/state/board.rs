//! Board state — the latest published scoreboard snapshot and result.
//!
//! The `GameController` itself lives inside the scoreboard actor. This
//! store only holds what it last published, for the web layer to read.

use std::sync::{Arc, RwLock};

use hoopclock::{GameController, GameFinished, GameSettings, GameState, NullSink};

/// Shared interior state backing both `BoardState` (read) and `BoardWriter` (write).
struct BoardInner {
    game: RwLock<GameState>,
    finished: RwLock<Option<GameFinished>>,
}

/// Read-only board state.
///
/// Lives on `SystemState.board` and is accessible to all actors and the
/// web layer.
pub struct BoardState {
    inner: Arc<BoardInner>,
}

/// Write handle for the board.
///
/// Only the scoreboard actor holds this, so every published state comes
/// from the one task that owns the controller.
pub struct BoardWriter {
    inner: Arc<BoardInner>,
}

impl BoardState {
    /// Create a new `BoardState` (showing a fresh default game) and its
    /// companion `BoardWriter`.
    pub fn new() -> (Self, BoardWriter) {
        let initial = GameController::new(GameSettings::default(), Box::new(NullSink)).snapshot();
        let inner = Arc::new(BoardInner {
            game: RwLock::new(initial),
            finished: RwLock::new(None),
        });
        (
            Self {
                inner: Arc::clone(&inner),
            },
            BoardWriter { inner },
        )
    }

    /// Latest published game state.
    pub fn snapshot(&self) -> GameState {
        self.inner
            .game
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Finish record of the current session, if it has finished.
    pub fn finished(&self) -> Option<GameFinished> {
        self.inner
            .finished
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl BoardWriter {
    pub fn publish(&self, state: GameState) {
        *self.inner.game.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    pub fn set_finished(&self, finished: Option<GameFinished>) {
        *self
            .inner
            .finished
            .write()
            .unwrap_or_else(|e| e.into_inner()) = finished;
    }
}
