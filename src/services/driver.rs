use std::sync::Arc;

use tokio::{sync::mpsc, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    services::{draw_service, orchestrator},
    state::{DrawSession, SessionCommand, SessionParts, SharedState},
};

/// Build a session and spawn the driver that executes its queued commands.
pub fn start_session(parts: SessionParts) -> SharedState {
    let (state, commands) = DrawSession::new(parts);
    tokio::spawn(run(Arc::clone(&state), commands));
    state
}

/// Execute session commands one after the other until every sender is gone.
pub async fn run(state: SharedState, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
    info!("session driver started");
    while let Some(command) = commands.recv().await {
        debug!(?command, state = %state.state(), "session command");
        handle(&state, command).await;
    }
    info!("session driver stopped");
}

async fn handle(state: &SharedState, command: SessionCommand) {
    match command {
        SessionCommand::Transition(to) => {
            if !state.transition(to) {
                warn!(target_state = %to, state = %state.state(), "queued transition rejected");
            }
        }
        SessionCommand::RunDraw => {
            state.set_draw_task(tokio::spawn(orchestrator::run_draw(Arc::clone(state))));
        }
        SessionCommand::ArmCountdown => {
            let interval = state.config().snapshot().await.auto_interval;
            let session = Arc::clone(state);
            state.set_countdown(tokio::spawn(async move {
                sleep(interval).await;
                draw_service::countdown_expired(&session);
            }));
            debug!(interval_ms = interval.as_millis() as u64, "countdown armed");
        }
        SessionCommand::DisarmCountdown => state.disarm_countdown(),
        SessionCommand::CelebrationStarted => draw_service::begin_celebration(state).await,
    }
}
