//! Scoreboard actor — owns the `GameController` and drives its clocks.
//!
//! Runs on a dedicated thread with a current-thread tokio runtime. The run
//! loop selects over bus commands and the two tick schedules, so every
//! mutation of the game happens on this one task. After each change the
//! snapshot is written to the board and published as a `game_snapshot`
//! event.

mod cues;
mod schedule;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::oneshot;

use crate::actors::Actor;
use crate::actors::host::select_host;
use crate::bus::{BusReceiver, BusSender};
use crate::state::{BoardWriter, SystemState};
use cues::BusCueSink;
use hoopclock::clock::ClockKind;
use hoopclock::report::{Reporter, format_summary};
use hoopclock::{
    ActorState, ActorStatus, AlertLevel, AlertMessage, CommandOutcome, FinishReason, GameAction,
    GameCommand, GameController, GameFinished, GameResult, GameSettings, HoopEvent, HoopMessage,
    HostBridge, Step,
};
use schedule::TickSchedule;

// ---------------------------------------------------------------------------
// ScoreboardActor
// ---------------------------------------------------------------------------

/// Always-on actor holding the sole `BoardWriter`.
pub struct ScoreboardActor {
    writer: Mutex<Option<BoardWriter>>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl ScoreboardActor {
    pub fn new(writer: BoardWriter) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
            shutdown_tx: Mutex::new(None),
        }
    }
}

impl Actor for ScoreboardActor {
    fn start(&self, state: Arc<SystemState>, sender: BusSender, receiver: BusReceiver) {
        let Some(writer) = self
            .writer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        else {
            tracing::error!("scoreboard: start() called more than once");
            return;
        };
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(shutdown_tx);

        std::thread::Builder::new()
            .name("scoreboard".into())
            .spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed to create scoreboard tokio runtime");
                let board = Scoreboard::new(state, sender, writer);
                rt.block_on(run(board, receiver, shutdown_rx));
            })
            .expect("failed to spawn scoreboard thread");
    }

    fn stop(&self) {
        if let Some(tx) = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            let _ = tx.send(());
        }
    }
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

async fn run(
    mut board: Scoreboard,
    mut receiver: BusReceiver,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    board.emit_status(ActorStatus::Connected);
    board.publish();
    tracing::info!("scoreboard: ready");

    loop {
        tokio::select! {
            msg = receiver.recv() => match msg {
                Ok(msg) => {
                    if let HoopEvent::GameCommand(cmd) = &msg.event {
                        board.handle_command(cmd);
                    }
                }
                Err(_) => break,
            },
            generation = board.main.tick() => board.on_tick(ClockKind::Main, generation),
            generation = board.shot.tick() => board.on_tick(ClockKind::Shot, generation),
            _ = &mut shutdown_rx => break,
        }
    }

    board.emit_status(ActorStatus::Disconnected);
    tracing::info!("scoreboard: stopped");
}

// ---------------------------------------------------------------------------
// Scoreboard
// ---------------------------------------------------------------------------

/// The controller plus everything it reports to.
struct Scoreboard {
    controller: GameController,
    state: Arc<SystemState>,
    writer: BoardWriter,
    sender: BusSender,
    host: Arc<dyn HostBridge>,
    reporter: Reporter,
    main: TickSchedule,
    shot: TickSchedule,
}

impl Scoreboard {
    fn new(state: Arc<SystemState>, sender: BusSender, writer: BoardWriter) -> Self {
        let config = state.system.snapshot();
        let host = select_host(&config.host, sender.clone(), Arc::clone(&state.hosts));
        let sink = BusCueSink::new(sender.clone(), Arc::clone(&host));
        let mut controller = GameController::new(GameSettings::from(&config.game), Box::new(sink));
        controller.set_cues_enabled(config.game.cues);
        Self {
            controller,
            state,
            writer,
            sender,
            host,
            reporter: Reporter::new(config.host.max_payload_bytes),
            main: TickSchedule::new(ClockKind::Main),
            shot: TickSchedule::new(ClockKind::Shot),
        }
    }

    fn handle_command(&mut self, cmd: &GameCommand) {
        let (applied, finished) = match &cmd.action {
            GameAction::SendResult => (self.send_result(), false),
            action => {
                let step = self.apply(action);
                let outcome = (step.changed(), matches!(step, Step::Finished(_)));
                self.settle(step);
                outcome
            }
        };
        if let Some(request_id) = &cmd.request_id {
            self.sender.send(HoopMessage::new(CommandOutcome {
                request_id: request_id.clone(),
                applied,
                finished,
            }));
        }
    }

    fn apply(&mut self, action: &GameAction) -> Step {
        let c = &mut self.controller;
        match action {
            GameAction::AddScore { team, points } => c.add_score(*team, *points),
            GameAction::RemoveScore { team } => c.remove_score(*team),
            GameAction::AddFoul { team } => c.add_foul(*team),
            GameAction::RemoveFoul { team } => c.remove_foul(*team),
            GameAction::ToggleMainClock => c.toggle_main_clock(),
            GameAction::ToggleShotClock => c.toggle_shot_clock(),
            GameAction::Finish => c.finish(),
            GameAction::SetCues { enabled } => {
                c.set_cues_enabled(*enabled);
                Step::Applied
            }
            GameAction::Reset => {
                self.new_session();
                self.controller.reset()
            }
            GameAction::StartNewGame {
                team1_name,
                team2_name,
            } => {
                self.new_session();
                self.controller.start_new_game(team1_name, team2_name)
            }
            GameAction::Rematch => {
                self.new_session();
                self.controller.rematch()
            }
            GameAction::SendResult => Step::Ignored,
        }
    }

    fn on_tick(&mut self, kind: ClockKind, generation: u64) {
        let step = self.controller.tick(kind, generation);
        self.settle(step);
    }

    /// Pick up the latest `[game]` settings and drop the previous finish.
    fn new_session(&mut self) {
        let section = self.state.system.snapshot().game;
        self.controller.reconfigure(GameSettings::from(&section));
        self.writer.set_finished(None);
    }

    /// Publish the outcome of a step and realign the tick schedules.
    fn settle(&mut self, step: Step) {
        if step.changed() {
            self.publish();
        }
        match step {
            Step::Finished(result) => self.on_finished(&result),
            Step::Amended(result) => {
                tracing::info!("scoreboard: finished game corrected, record rebuilt");
                self.record_finish(&result);
            }
            Step::Ignored | Step::Applied => {}
        }
        let clock = self.controller.clock();
        self.main.sync(clock.main_generation());
        self.shot.sync(clock.shot_generation());
    }

    fn publish(&self) {
        let snapshot = self.controller.snapshot();
        self.writer.publish(snapshot.clone());
        self.sender.send(HoopMessage::new(snapshot));
    }

    fn on_finished(&self, result: &GameResult) {
        let reason = self.controller.finish_reason().unwrap_or(FinishReason::Forced);
        tracing::info!(
            "scoreboard: game finished ({reason:?}) {} {} - {} {}",
            result.team1_name,
            result.score1,
            result.score2,
            result.team2_name
        );
        self.record_finish(result);
        if self.state.system.snapshot().game.auto_send {
            self.send_result();
        }
    }

    /// Store and announce the finish record for `result`.
    fn record_finish(&self, result: &GameResult) {
        let finished = GameFinished {
            reason: self.controller.finish_reason().unwrap_or(FinishReason::Forced),
            summary: format_summary(result),
            result: result.clone(),
        };
        self.writer.set_finished(Some(finished.clone()));
        self.sender.send(HoopMessage::new(finished));
    }

    /// Deliver the finished result (or a live export) to the host. Failures
    /// are logged and never touch the game.
    fn send_result(&self) -> bool {
        let result = self
            .controller
            .final_result()
            .unwrap_or_else(|| self.controller.result(Utc::now()));
        match self.reporter.deliver(&result, self.host.as_ref()) {
            Ok(kind) => {
                tracing::info!("scoreboard: result delivered ({kind:?} payload)");
                true
            }
            Err(e) => {
                tracing::warn!("scoreboard: result delivery failed: {e}");
                self.sender.send(HoopMessage::new(AlertMessage {
                    level: AlertLevel::Warn,
                    message: format!("result not delivered: {e}"),
                }));
                false
            }
        }
    }

    fn emit_status(&self, status: ActorStatus) {
        let settings = self.controller.settings();
        let telemetry = HashMap::from([
            ("duration".into(), settings.duration_secs.to_string()),
            ("shot_clock".into(), (settings.shot_reset / 10).to_string()),
            ("target".into(), settings.rule.target.to_string()),
        ]);
        self.sender.send(HoopMessage::new(ActorState::new(status, telemetry)));
    }
}
