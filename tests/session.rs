//! End-to-end tests for the session coordinator: real server, real
//! WebSocket clients.

use futures_util::{SinkExt, StreamExt};
use podium::session::SessionServer;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::{Duration, sleep, timeout};
use tokio_tungstenite::tungstenite::{Error, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> u16 {
    let server = SessionServer::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();
    tokio::spawn(server.run());
    port
}

async fn connect_host(port: u16, id: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws?clientID={id}"))
        .await
        .unwrap();
    ws
}

async fn connect_player(port: u16, id: &str, set: u32) -> Result<Ws, Error> {
    connect_async(format!(
        "ws://127.0.0.1:{port}/ws?clientID={id}&setNumber={set}"
    ))
    .await
    .map(|(ws, _)| ws)
}

async fn send(ws: &mut Ws, event: Value) {
    ws.send(Message::text(event.to_string())).await.unwrap();
}

/// Let in-flight events reach the coordinator before the next connection
/// is validated against its state.
async fn settle() {
    sleep(Duration::from_millis(250)).await;
}

async fn recv_event(ws: &mut Ws) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("connection closed while waiting for an event")
            .unwrap();
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// The stream must stay quiet for the window, keepalive frames aside.
async fn assert_no_event(ws: &mut Ws) {
    let got_text = timeout(Duration::from_millis(300), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(_) => continue,
                None => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    if let Ok(text) = got_text {
        panic!("expected no event, got {text}");
    }
}

#[tokio::test]
async fn single_player_session_end_to_end() {
    let port = start_server().await;

    let mut host = connect_host(port, "host").await;
    send(
        &mut host,
        json!({"type": "sessionID", "content": {"id": 42, "set": 7}}),
    )
    .await;
    settle().await;

    let mut alice = connect_player(port, "alice", 7).await.unwrap();
    assert_eq!(
        recv_event(&mut alice).await,
        json!({"type": "activeSet", "content": 7})
    );
    assert_eq!(
        recv_event(&mut alice).await,
        json!({"type": "playerNames", "content": ["alice"]})
    );

    // A mismatched claim never completes the handshake.
    let denied = connect_player(port, "bob", 9).await;
    match denied {
        Err(Error::Http(response)) => assert_eq!(response.status(), 403),
        other => panic!("expected a refused handshake, got {other:?}"),
    }

    send(&mut host, json!({"type": "startGame"})).await;
    assert_eq!(recv_event(&mut alice).await, json!({"type": "startGame"}));

    // With exactly one player a single report is already full quorum. The
    // host hears questionDone here and nothing before it: roster updates
    // go to players only.
    send(&mut alice, json!({"type": "playerDone"})).await;
    assert_eq!(recv_event(&mut alice).await, json!({"type": "questionDone"}));
    assert_eq!(recv_event(&mut host).await, json!({"type": "questionDone"}));
}

#[tokio::test]
async fn player_is_refused_before_any_session_is_declared() {
    let port = start_server().await;
    let denied = connect_player(port, "eager", 0).await;
    match denied {
        Err(Error::Http(response)) => assert_eq!(response.status(), 403),
        other => panic!("expected a refused handshake, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_client_id_is_a_bad_request() {
    let port = start_server().await;
    let result = connect_async(format!("ws://127.0.0.1:{port}/ws?setNumber=7")).await;
    match result {
        Err(Error::Http(response)) => assert_eq!(response.status(), 400),
        other => panic!("expected a refused handshake, got {other:?}"),
    }
}

#[tokio::test]
async fn quorum_of_two_fires_once_and_resets() {
    let port = start_server().await;

    let mut host = connect_host(port, "host").await;
    send(
        &mut host,
        json!({"type": "sessionID", "content": {"id": 1, "set": 3}}),
    )
    .await;
    settle().await;

    let mut alice = connect_player(port, "alice", 3).await.unwrap();
    recv_event(&mut alice).await; // activeSet
    recv_event(&mut alice).await; // playerNames ["alice"]

    let mut bob = connect_player(port, "bob", 3).await.unwrap();
    assert_eq!(
        recv_event(&mut bob).await,
        json!({"type": "activeSet", "content": 3})
    );
    assert_eq!(
        recv_event(&mut bob).await,
        json!({"type": "playerNames", "content": ["alice", "bob"]})
    );
    assert_eq!(
        recv_event(&mut alice).await,
        json!({"type": "playerNames", "content": ["alice", "bob"]})
    );

    for round in 0..2 {
        send(&mut alice, json!({"type": "playerDone"})).await;
        assert_no_event(&mut bob).await;

        send(&mut bob, json!({"type": "playerDone"})).await;
        assert_eq!(
            recv_event(&mut alice).await,
            json!({"type": "questionDone"}),
            "round {round}"
        );
        assert_eq!(recv_event(&mut bob).await, json!({"type": "questionDone"}));
        assert_eq!(recv_event(&mut host).await, json!({"type": "questionDone"}));
    }
}

#[tokio::test]
async fn timeout_cuts_the_question_short() {
    let port = start_server().await;

    let mut host = connect_host(port, "host").await;
    send(
        &mut host,
        json!({"type": "sessionID", "content": {"id": 5, "set": 2}}),
    )
    .await;
    settle().await;

    let mut alice = connect_player(port, "alice", 2).await.unwrap();
    recv_event(&mut alice).await;
    recv_event(&mut alice).await;
    let mut bob = connect_player(port, "bob", 2).await.unwrap();
    recv_event(&mut bob).await;
    recv_event(&mut bob).await;
    recv_event(&mut alice).await;

    send(&mut alice, json!({"type": "playerDone"})).await;
    settle().await;
    send(&mut host, json!({"type": "timeOut"})).await;
    assert_eq!(recv_event(&mut alice).await, json!({"type": "questionDone"}));
    assert_eq!(recv_event(&mut bob).await, json!({"type": "questionDone"}));
    assert_no_event(&mut host).await;

    // The forced reset means the next report is one of two again.
    send(&mut alice, json!({"type": "playerDone"})).await;
    assert_no_event(&mut alice).await;
    send(&mut bob, json!({"type": "playerDone"})).await;
    assert_eq!(recv_event(&mut alice).await, json!({"type": "questionDone"}));
    assert_eq!(recv_event(&mut bob).await, json!({"type": "questionDone"}));
    assert_eq!(recv_event(&mut host).await, json!({"type": "questionDone"}));
}

#[tokio::test]
async fn departure_updates_roster_and_quorum() {
    let port = start_server().await;

    let mut host = connect_host(port, "host").await;
    send(
        &mut host,
        json!({"type": "sessionID", "content": {"id": 8, "set": 4}}),
    )
    .await;
    settle().await;

    let mut alice = connect_player(port, "alice", 4).await.unwrap();
    recv_event(&mut alice).await;
    recv_event(&mut alice).await;
    let mut bob = connect_player(port, "bob", 4).await.unwrap();
    recv_event(&mut bob).await;
    recv_event(&mut bob).await;
    recv_event(&mut alice).await;

    bob.close(None).await.unwrap();
    assert_eq!(
        recv_event(&mut alice).await,
        json!({"type": "playerNames", "content": ["alice"]})
    );

    // Broadcasts keep flowing after the departure and the quorum shrinks
    // to the remaining player.
    send(&mut host, json!({"type": "startGame"})).await;
    assert_eq!(recv_event(&mut alice).await, json!({"type": "startGame"}));

    send(&mut alice, json!({"type": "playerDone"})).await;
    assert_eq!(recv_event(&mut alice).await, json!({"type": "questionDone"}));
    assert_eq!(recv_event(&mut host).await, json!({"type": "questionDone"}));
}

#[tokio::test]
async fn set_size_reaches_the_host_verbatim() {
    let port = start_server().await;

    let mut host = connect_host(port, "host").await;
    send(
        &mut host,
        json!({"type": "sessionID", "content": {"id": 2, "set": 6}}),
    )
    .await;
    settle().await;

    let mut alice = connect_player(port, "alice", 6).await.unwrap();
    recv_event(&mut alice).await;
    recv_event(&mut alice).await;

    send(&mut alice, json!({"type": "setSize", "content": 10})).await;
    assert_eq!(
        recv_event(&mut host).await,
        json!({"type": "setSize", "content": 10})
    );
    assert_no_event(&mut alice).await;
}

#[tokio::test]
async fn unknown_events_are_ignored_and_the_connection_survives() {
    let port = start_server().await;

    let mut host = connect_host(port, "host").await;
    send(
        &mut host,
        json!({"type": "sessionID", "content": {"id": 3, "set": 1}}),
    )
    .await;
    settle().await;

    let mut alice = connect_player(port, "alice", 1).await.unwrap();
    recv_event(&mut alice).await;
    recv_event(&mut alice).await;

    send(&mut alice, json!({"type": "confetti", "content": "???"})).await;
    send(&mut alice, json!({"malformed": true})).await;

    // The connection is still registered and still part of the quorum.
    send(&mut alice, json!({"type": "playerDone"})).await;
    assert_eq!(recv_event(&mut alice).await, json!({"type": "questionDone"}));
    assert_eq!(recv_event(&mut host).await, json!({"type": "questionDone"}));
}
