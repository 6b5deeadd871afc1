use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::messages::{ClientEvent, ServerEvent, SessionDecl};
use super::types::{AdmissionError, ClientId, OutboundMessage, Registry, Role};

/// Commands sent to the coordinator actor
pub(crate) enum SessionCommand {
    ActiveSet {
        reply: oneshot::Sender<Option<u32>>,
    },
    Register {
        role: Role,
        id: ClientId,
        tx: mpsc::UnboundedSender<OutboundMessage>,
    },
    Inbound {
        from: ClientId,
        event: ClientEvent,
    },
    Leave {
        role: Role,
        id: ClientId,
    },
}

struct ActiveSession {
    id: u32,
    set: u32,
}

/// Mutable per-coordinator session record. `completed` never exceeds the
/// player count; the transition to equality fires the `questionDone`
/// broadcast and resets it in the same command step.
#[derive(Default)]
struct SessionState {
    session: Option<ActiveSession>,
    completed: usize,
}

pub(crate) async fn session_actor(mut rx: mpsc::Receiver<SessionCommand>) {
    let mut registry = Registry::default();
    let mut state = SessionState::default();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            SessionCommand::ActiveSet { reply } => {
                let _ = reply.send(state.session.as_ref().map(|s| s.set));
            }

            SessionCommand::Register { role, id, tx } => {
                registry.register(role, id.clone(), tx);
                match (role, &state.session) {
                    (Role::Player, Some(session)) => {
                        registry.send_player(&id, encode(&ServerEvent::ActiveSet(session.set)));
                        info!(
                            "player {} joined session {} (set {})",
                            id, session.id, session.set
                        );
                    }
                    (Role::Player, None) => info!("player {} joined", id),
                    (Role::Host, _) => info!("host {} connected", id),
                }
                // Every admission pushes a fresh roster to the players; the
                // host is not part of this broadcast.
                registry.broadcast_players(encode(&ServerEvent::PlayerNames(registry.snapshot())));
            }

            SessionCommand::Inbound { from, event } => match event {
                ClientEvent::SessionId(decl) => apply_session_decl(&mut state, decl),

                ClientEvent::StartGame => {
                    info!("game started");
                    registry.broadcast_players(encode(&ServerEvent::StartGame));
                }

                ClientEvent::PlayerDone => {
                    // Commands are handled one at a time, so the
                    // increment-compare-reset below is a single atomic step
                    // even under concurrent reports.
                    let players = registry.player_count();
                    state.completed = (state.completed + 1).min(players);
                    debug!("{} finished ({}/{})", from, state.completed, players);
                    if players > 0 && state.completed == players {
                        let done = encode(&ServerEvent::QuestionDone);
                        registry.broadcast_players(done.clone());
                        registry.send_host(done);
                        state.completed = 0;
                    }
                }

                ClientEvent::TimeOut => {
                    state.completed = 0;
                    registry.broadcast_players(encode(&ServerEvent::QuestionDone));
                }

                ClientEvent::SetSize(value) => {
                    registry.send_host(encode(&ServerEvent::SetSize(value)));
                }
            },

            SessionCommand::Leave { role, id } => {
                registry.remove(role, &id);
                info!("{} disconnected", id);
                if role == Role::Player {
                    // Departure can shrink the quorum below the current
                    // count; keep completed <= player count.
                    state.completed = state.completed.min(registry.player_count());
                    registry
                        .broadcast_players(encode(&ServerEvent::PlayerNames(registry.snapshot())));
                }
            }
        }
    }
}

fn apply_session_decl(state: &mut SessionState, decl: SessionDecl) {
    match decl {
        SessionDecl::Declared { id, set } => {
            info!("session {} declared for set {}", id, set);
            state.session = Some(ActiveSession { id, set });
        }
        SessionDecl::Legacy(id) => match &mut state.session {
            Some(session) => session.id = id,
            None => warn!("legacy sessionID {} before any declaration, ignored", id),
        },
    }
}

fn encode(event: &ServerEvent) -> OutboundMessage {
    let json =
        serde_json::to_string(event).expect("ServerEvent serialization should never fail");
    OutboundMessage::from(json)
}

/// Handle to communicate with the coordinator actor
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Spawn a coordinator actor and return a handle to it
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<SessionCommand>(1024);
        tokio::spawn(session_actor(rx));
        Self { tx }
    }

    /// Set number of the currently declared session, if any
    pub async fn active_set(&self) -> Result<Option<u32>, AdmissionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(SessionCommand::ActiveSet { reply: reply_tx })
            .await;
        reply_rx
            .await
            .map_err(|_| AdmissionError::Internal("actor channel closed".to_string()))
    }

    /// Register an admitted connection under its role
    pub async fn register(
        &self,
        role: Role,
        id: ClientId,
        tx: mpsc::UnboundedSender<OutboundMessage>,
    ) {
        let _ = self.tx.send(SessionCommand::Register { role, id, tx }).await;
    }

    /// Forward an inbound event to the coordinator
    pub async fn inbound(&self, from: ClientId, event: ClientEvent) {
        let _ = self.tx.send(SessionCommand::Inbound { from, event }).await;
    }

    /// Remove a departed connection
    pub async fn leave(&self, role: Role, id: ClientId) {
        let _ = self.tx.send(SessionCommand::Leave { role, id }).await;
    }
}
