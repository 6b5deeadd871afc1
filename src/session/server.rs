use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, info, warn};

use super::actor::SessionHandle;
use super::messages::ClientEvent;
use super::types::{AdmissionError, ClientId, OutboundMessage, Role};

pub const DEFAULT_SESSION_PORT: u16 = 8001;
const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket endpoint for live quiz sessions. One coordinator actor owns
/// the registry and session state; each connection gets its own receive
/// loop and send task.
pub struct SessionServer {
    listener: TcpListener,
    handle: SessionHandle,
}

impl SessionServer {
    /// Bind the endpoint and spawn the coordinator actor
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("session coordinator listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            handle: SessionHandle::spawn(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let handle = self.handle.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, handle).await {
                    // Refused admissions end up here too, so this is not an
                    // error-level event.
                    debug!("connection from {} closed: {}", addr, e);
                }
            });
        }
    }
}

/// Query parameters of the upgrade request. Absence of `setNumber` selects
/// host admission; its presence selects player admission with that claim.
struct ConnectQuery {
    client_id: ClientId,
    set: Option<u32>,
}

fn parse_connect_query(query: Option<&str>) -> Result<ConnectQuery, AdmissionError> {
    let mut client_id = None;
    let mut set = None;

    for pair in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "clientID" => client_id = Some(value.to_owned()),
            "setNumber" => {
                let claim = value
                    .parse()
                    .map_err(|_| AdmissionError::BadQuery("setNumber must be an integer"))?;
                set = Some(claim);
            }
            _ => {}
        }
    }

    let client_id = client_id
        .filter(|id| !id.is_empty())
        .ok_or(AdmissionError::MissingClientId)?;

    Ok(ConnectQuery {
        client_id: ClientId::from(client_id),
        set,
    })
}

/// Decide host or player admission for a parsed upgrade request. The host
/// defines the session and is never validated; a player's claim must match
/// the declared session's set number exactly.
fn admit(query: &ConnectQuery, active_set: Option<u32>) -> Result<Role, AdmissionError> {
    match (query.set, active_set) {
        (None, _) => Ok(Role::Host),
        (Some(_), None) => Err(AdmissionError::NoActiveSession),
        (Some(claimed), Some(active)) if claimed == active => Ok(Role::Player),
        (Some(claimed), Some(active)) => Err(AdmissionError::SetMismatch { claimed, active }),
    }
}

fn deny(status: StatusCode, reason: &AdmissionError) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handle: SessionHandle,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let active_set = handle.active_set().await?;

    // A denied claim never completes the handshake; the caller sees only
    // the refused connection.
    let mut admitted: Option<(ConnectQuery, Role)> = None;
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        let query = match parse_connect_query(req.uri().query()) {
            Ok(query) => query,
            Err(e) => return Err(deny(StatusCode::BAD_REQUEST, &e)),
        };
        match admit(&query, active_set) {
            Ok(role) => {
                admitted = Some((query, role));
                Ok(resp)
            }
            Err(e) => Err(deny(StatusCode::FORBIDDEN, &e)),
        }
    })
    .await?;

    let Some((query, role)) = admitted else {
        return Ok(());
    };
    let client_id = query.client_id;

    info!("WebSocket connection from {} ({:?} {})", addr, role, client_id);

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();

    handle.register(role, client_id.clone(), tx).await;

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let ws_msg = Message::Text(msg.into_inner());
                    if ws_tx.send(ws_msg).await.is_err() {
                        break;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("no pong from {}, disconnecting", client_id);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + PONG_TIMEOUT);
            }

            _ = pong_timeout => {
                warn!("pong timeout, disconnecting {}", client_id);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", client_id, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => handle.inbound(client_id.clone(), event).await,
                            // Unrecognized event types are dropped, never fatal.
                            Err(e) => debug!("ignoring event from {}: {}", client_id, e),
                        }
                    }
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                    }
                    Message::Close(_) => {
                        info!("close received from {}", client_id);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    handle.leave(role, client_id).await;
    send_task.abort();
    info!("WebSocket disconnected: {}", addr);

    Ok(())
}
