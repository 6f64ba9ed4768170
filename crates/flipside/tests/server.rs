//! End-to-end tests: a real server on an OS-assigned port, driven by
//! `GameClient` and by raw `tokio-tungstenite` sockets.

use std::sync::Arc;
use std::time::Duration;

use flipside::prelude::*;
use flipside_board::Cell;
use flipside_protocol::{Envelope, Message};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as WsMessage;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const WAIT: Duration = Duration::from_secs(3);

struct Fixture {
    addr: String,
    registry: Arc<InMemoryRegistry>,
    authority: Arc<flipside_authority::Authority<InMemoryRegistry>>,
    /// alpha (P-1, Black) against beta (P-2, White).
    game: GameId,
}

fn tokens() -> TokenTable {
    [
        ("alpha", PlayerId(1)),
        ("beta", PlayerId(2)),
        ("gamma", PlayerId(3)),
    ]
    .into_iter()
    .collect()
}

async fn start_server_with(config: ServerConfig) -> Fixture {
    let registry = Arc::new(InMemoryRegistry::new());
    let game = registry.create(PlayerId(1), PlayerId(2));

    let server = FlipsideServerBuilder::new()
        .config(ServerConfig {
            bind: "127.0.0.1:0".into(),
            ..config
        })
        .build(tokens(), Arc::clone(&registry))
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("local addr").to_string();
    let authority = server.authority();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    Fixture {
        addr,
        registry,
        authority,
        game,
    }
}

async fn start_server() -> Fixture {
    start_server_with(ServerConfig::default()).await
}

async fn connect_raw(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_raw(ws: &mut ClientWs, frame: &str) {
    ws.send(WsMessage::Text(frame.into())).await.expect("send");
}

async fn send_envelope(ws: &mut ClientWs, envelope: Envelope) {
    let text = serde_json::to_string(&envelope).expect("encode");
    send_raw(ws, &text).await;
}

/// Next protocol message, or `None` once the server closed the socket.
async fn recv_raw(ws: &mut ClientWs) -> Option<Message> {
    loop {
        let frame = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a frame");
        match frame {
            Some(Ok(WsMessage::Text(text))) => {
                let env: Envelope =
                    serde_json::from_str(text.as_str()).expect("decode");
                return Some(env.message);
            }
            Some(Ok(WsMessage::Binary(data))) => {
                let env: Envelope = serde_json::from_slice(&data).expect("decode");
                return Some(env.message);
            }
            Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

fn expect_error(message: Option<Message>, code: ErrorCode) -> String {
    match message {
        Some(Message::Error { code: got, message }) => {
            assert_eq!(got, code, "unexpected error: {message}");
            message
        }
        other => panic!("expected {code} error, got {other:?}"),
    }
}

async fn identify_raw(ws: &mut ClientWs, token: &str) {
    send_envelope(ws, Envelope::new(Message::Identify).with_token(token)).await;
    assert!(matches!(recv_raw(ws).await, Some(Message::Ready { .. })));
}

async fn next(client: &mut GameClient) -> ClientEvent {
    tokio::time::timeout(WAIT, client.next_event())
        .await
        .expect("timed out waiting for an event")
        .expect("event")
}

async fn next_update(client: &mut GameClient) -> GameUpdate {
    match next(client).await {
        ClientEvent::Update(update) => update,
        other => panic!("expected update, got {other:?}"),
    }
}

/// Connects, identifies and joins; consumes the join's first update.
async fn seated(addr: &str, token: &str, game: GameId) -> GameClient {
    let mut client = GameClient::connect(addr, token).await.expect("connect");
    client.identify().await.unwrap();
    assert!(matches!(next(&mut client).await, ClientEvent::Ready(_)));
    client.join(game).await.unwrap();
    assert!(matches!(next(&mut client).await, ClientEvent::Joined { .. }));
    next_update(&mut client).await;
    client
}

/// Both players seated, both mirrors on the Active update.
async fn active_game(fx: &Fixture) -> (GameClient, GameClient) {
    let mut black = seated(&fx.addr, "alpha", fx.game).await;
    let white = seated(&fx.addr, "beta", fx.game).await;
    let update = next_update(&mut black).await;
    assert_eq!(update.status, GameStatus::Active);
    (black, white)
}

// =========================================================================
// Identify
// =========================================================================

#[tokio::test]
async fn test_identify_invalid_token_is_unauthorized_then_closed() {
    let fx = start_server().await;
    let mut ws = connect_raw(&fx.addr).await;

    send_envelope(&mut ws, Envelope::new(Message::Identify).with_token("nope")).await;

    let message = expect_error(recv_raw(&mut ws).await, ErrorCode::Unauthorized);
    assert!(message.contains("invalid user token"));
    assert!(recv_raw(&mut ws).await.is_none(), "server should close");
}

#[tokio::test]
async fn test_identify_without_token_is_unauthorized() {
    let fx = start_server().await;
    let mut ws = connect_raw(&fx.addr).await;

    send_raw(&mut ws, r#"{"op":6,"d":{"type":"Identify"}}"#).await;

    expect_error(recv_raw(&mut ws).await, ErrorCode::Unauthorized);
}

#[tokio::test]
async fn test_join_before_identify_is_unauthorized_and_connection_survives() {
    let fx = start_server().await;
    let mut ws = connect_raw(&fx.addr).await;

    send_envelope(&mut ws, Envelope::new(Message::Join { id: fx.game })).await;
    expect_error(recv_raw(&mut ws).await, ErrorCode::Unauthorized);

    identify_raw(&mut ws, "alpha").await;
    assert_eq!(fx.authority.game_count().await, 0, "no game was touched");
}

#[tokio::test]
async fn test_identify_timeout_sends_unauthorized_then_closes() {
    let fx = start_server_with(ServerConfig {
        identify_timeout_secs: 1,
        ..ServerConfig::default()
    })
    .await;
    let mut ws = connect_raw(&fx.addr).await;

    let message = expect_error(recv_raw(&mut ws).await, ErrorCode::Unauthorized);

    assert_eq!(message, "connection timed out");
    assert!(recv_raw(&mut ws).await.is_none());
}

#[tokio::test]
async fn test_token_mismatch_after_identify_is_unauthorized() {
    let fx = start_server().await;
    let mut ws = connect_raw(&fx.addr).await;
    identify_raw(&mut ws, "alpha").await;

    send_envelope(
        &mut ws,
        Envelope::new(Message::Join { id: fx.game }).with_token("beta"),
    )
    .await;

    expect_error(recv_raw(&mut ws).await, ErrorCode::Unauthorized);
}

// =========================================================================
// Malformed input
// =========================================================================

#[tokio::test]
async fn test_malformed_frames_get_malformed_message() {
    let fx = start_server().await;
    let mut ws = connect_raw(&fx.addr).await;

    for frame in [
        "not json",
        r#"{"op":3,"d":{"type":"Identify"}}"#,
        r#"{"op":8,"d":{"type":"Place","row":"two"}}"#,
        r#"{"op":2,"d":{"type":"Ready","player":1}}"#,
    ] {
        send_raw(&mut ws, frame).await;
        expect_error(recv_raw(&mut ws).await, ErrorCode::MalformedMessage);
    }

    // Still usable afterwards.
    identify_raw(&mut ws, "alpha").await;
}

// =========================================================================
// Join
// =========================================================================

#[tokio::test]
async fn test_join_unknown_game_is_game_not_found() {
    let fx = start_server().await;
    let mut client = GameClient::connect(&fx.addr, "alpha").await.unwrap();
    client.identify().await.unwrap();
    next(&mut client).await;

    client.join(GameId::new_v4()).await.unwrap();

    match next(&mut client).await {
        ClientEvent::Error { code, message } => {
            assert_eq!(code, ErrorCode::GameNotFound);
            assert_eq!(message, "no game exists with specified id");
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_as_non_participant_is_unauthorized() {
    let fx = start_server().await;
    let mut client = GameClient::connect(&fx.addr, "gamma").await.unwrap();
    client.identify().await.unwrap();
    next(&mut client).await;

    client.join(fx.game).await.unwrap();

    assert!(matches!(
        next(&mut client).await,
        ClientEvent::Error { code: ErrorCode::Unauthorized, .. }
    ));
}

#[tokio::test]
async fn test_join_assigns_colors_and_activates_game() {
    let fx = start_server().await;

    let mut black = GameClient::connect(&fx.addr, "alpha").await.unwrap();
    black.identify().await.unwrap();
    assert_eq!(next(&mut black).await, ClientEvent::Ready(PlayerId(1)));
    black.join(fx.game).await.unwrap();
    assert_eq!(
        next(&mut black).await,
        ClientEvent::Joined {
            game: fx.game,
            color: Piece::Black,
            turn: Piece::Black,
        }
    );
    let waiting = next_update(&mut black).await;
    assert_eq!(waiting.status, GameStatus::WaitingForPlayers);
    assert_eq!(waiting.version, 0);

    let white = seated(&fx.addr, "beta", fx.game).await;
    let active = next_update(&mut black).await;

    assert_eq!(active.status, GameStatus::Active);
    assert_eq!(active.version, 1);
    assert_eq!(white.mirror().color(), Some(Piece::White));
    assert_eq!(white.mirror().version(), Some(1));
    assert!(black.mirror().is_my_turn());
    assert!(!white.mirror().is_my_turn());
}

// =========================================================================
// Play
// =========================================================================

#[tokio::test]
async fn test_place_broadcasts_update_to_both_players() {
    let fx = start_server().await;
    let (mut black, mut white) = active_game(&fx).await;

    black.place(Position::new(2, 3)).await.unwrap();

    assert_eq!(next(&mut black).await, ClientEvent::Accepted);
    let seen_by_black = next_update(&mut black).await;
    let seen_by_white = next_update(&mut white).await;
    assert_eq!(seen_by_black, seen_by_white);

    let update = seen_by_white;
    assert_eq!(update.version, 2);
    assert_eq!(update.turn, Piece::White);
    assert_eq!(update.score, Score { black: 4, white: 1 });
    let last = update.last_move.expect("last move");
    assert_eq!(last.at, Position::new(2, 3));
    assert_eq!(last.flips.as_slice(), &[Position::new(3, 3)]);

    assert!(white.mirror().is_my_turn());
    assert_eq!(
        white.mirror().board().unwrap().get(Position::new(3, 3)),
        Some(Cell::Black)
    );
}

#[tokio::test]
async fn test_place_out_of_turn_is_rejected_locally() {
    let fx = start_server().await;
    let (_black, mut white) = active_game(&fx).await;

    let err = white.place(Position::new(2, 4)).await.unwrap_err();

    assert!(matches!(err, FlipsideError::Session(SessionError::OutOfTurn)));
}

#[tokio::test]
async fn test_place_out_of_turn_is_rejected_by_server() {
    let fx = start_server().await;
    let _black = seated(&fx.addr, "alpha", fx.game).await;
    let mut ws = connect_raw(&fx.addr).await;
    identify_raw(&mut ws, "beta").await;
    send_envelope(&mut ws, Envelope::new(Message::Join { id: fx.game })).await;
    assert!(matches!(recv_raw(&mut ws).await, Some(Message::Joined { .. })));
    assert!(matches!(recv_raw(&mut ws).await, Some(Message::GameUpdate(_))));

    send_raw(&mut ws, r#"{"op":8,"d":{"type":"Place","row":2,"col":4}}"#).await;

    expect_error(recv_raw(&mut ws).await, ErrorCode::OutOfTurn);
    let view = fx.authority.game(fx.game).await.unwrap().view();
    assert_eq!(view.version, 1, "board unchanged");
}

#[tokio::test]
async fn test_place_illegal_moves_report_move_errors() {
    let fx = start_server().await;
    let (mut black, _white) = active_game(&fx).await;

    black.place(Position::new(0, 0)).await.unwrap();
    assert!(matches!(
        next(&mut black).await,
        ClientEvent::Error { code: ErrorCode::NoCaptures, .. }
    ));

    black.place(Position::new(3, 3)).await.unwrap();
    assert!(matches!(
        next(&mut black).await,
        ClientEvent::Error { code: ErrorCode::CellOccupied, .. }
    ));

    black.place(Position::new(9, 0)).await.unwrap();
    assert!(matches!(
        next(&mut black).await,
        ClientEvent::Error { code: ErrorCode::OutOfRange, .. }
    ));
}

#[tokio::test]
async fn test_full_game_finishes_closes_both_and_unloads() {
    let fx = start_server().await;
    let (mut black, mut white) = active_game(&fx).await;

    let last = loop {
        let (mover, other) = if black.mirror().is_my_turn() {
            (&mut black, &mut white)
        } else {
            (&mut white, &mut black)
        };
        let color = mover.mirror().color().expect("seated");
        let at = mover.mirror().board().expect("board").legal_moves(color)[0];

        mover.place(at).await.unwrap();
        assert_eq!(next(mover).await, ClientEvent::Accepted);
        let update = next_update(mover).await;
        assert_eq!(next_update(other).await, update);

        if update.status == GameStatus::Finished {
            break update;
        }
    };

    assert!(last.board.is_terminal());
    assert_eq!(last.winner, last.score.leader());
    assert!(black.session().is_terminated());
    assert!(white.session().is_terminated());

    // The server hangs up on both players once the game is over.
    assert_eq!(next(&mut black).await, ClientEvent::Closed);
    assert_eq!(next(&mut white).await, ClientEvent::Closed);
    assert!(matches!(
        black.next_event().await,
        Err(FlipsideError::Closed)
    ));

    tokio::time::timeout(WAIT, async {
        while fx.authority.game_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("finished game should be unloaded");
    assert_eq!(fx.registry.archived().len(), 1);
    assert!(fx.registry.get(fx.game).unwrap().finished);
}

// =========================================================================
// Previews
// =========================================================================

#[tokio::test]
async fn test_hover_returns_authority_preview() {
    let fx = start_server().await;
    let (mut black, _white) = active_game(&fx).await;

    let seq = black.hover(Position::new(2, 3)).await.unwrap();

    match next(&mut black).await {
        ClientEvent::Preview(preview) => {
            assert_eq!(preview.seq, seq);
            assert_eq!(preview.version, 1);
            assert_eq!(preview.flips.as_slice(), &[Position::new(3, 3)]);
        }
        other => panic!("expected preview, got {other:?}"),
    }
    let (at, flips) = black.mirror().preview().expect("preview kept");
    assert_eq!(at, Position::new(2, 3));
    assert_eq!(flips.len(), 1);
}

#[tokio::test]
async fn test_hover_before_join_is_rejected_locally() {
    let fx = start_server().await;
    let mut client = GameClient::connect(&fx.addr, "alpha").await.unwrap();

    let err = client.hover(Position::new(2, 3)).await.unwrap_err();

    assert!(matches!(
        err,
        FlipsideError::Session(SessionError::Unauthorized(_))
    ));
    assert!(client.mirror().preview().is_none());
}

#[tokio::test]
async fn test_hover_superseded_probe_is_dropped() {
    let fx = start_server().await;
    let (mut black, _white) = active_game(&fx).await;

    black.hover(Position::new(2, 3)).await.unwrap();
    let latest = black.hover(Position::new(3, 2)).await.unwrap();

    // The answer to the first probe is swallowed.
    match next(&mut black).await {
        ClientEvent::Preview(preview) => assert_eq!(preview.seq, latest),
        other => panic!("expected preview, got {other:?}"),
    }
}

#[tokio::test]
async fn test_preview_local_matches_authority() {
    let fx = start_server().await;
    let (mut black, _white) = active_game(&fx).await;

    let local = black
        .preview_local(Position::new(2, 3))
        .cloned()
        .expect("legal square");
    assert!(black.preview_local(Position::new(0, 0)).is_none());

    black.hover(Position::new(2, 3)).await.unwrap();
    match next(&mut black).await {
        ClientEvent::Preview(preview) => assert_eq!(preview.flips, local),
        other => panic!("expected preview, got {other:?}"),
    }
}

// =========================================================================
// Leaving
// =========================================================================

#[tokio::test]
async fn test_leave_notifies_opponent_and_flags_abandon() {
    let fx = start_server().await;
    let (mut black, mut white) = active_game(&fx).await;

    white.leave().await.unwrap();

    let update = next_update(&mut black).await;
    assert_eq!(update.status, GameStatus::WaitingForPlayers);
    let info = fx
        .authority
        .game(fx.game)
        .await
        .expect("unfinished game stays loaded")
        .info()
        .await
        .unwrap();
    assert_eq!(info.abandoned_by, Some(PlayerId(2)));
    assert_eq!(info.connections, 1);
}

#[tokio::test]
async fn test_dropped_socket_is_treated_as_leave() {
    let fx = start_server().await;
    let (mut black, white) = active_game(&fx).await;

    drop(white);

    let update = next_update(&mut black).await;
    assert_eq!(update.status, GameStatus::WaitingForPlayers);
}

#[tokio::test]
async fn test_rejoin_after_leave_reactivates_game() {
    let fx = start_server().await;
    let (mut black, mut white) = active_game(&fx).await;
    white.leave().await.unwrap();
    next_update(&mut black).await;

    let _white = seated(&fx.addr, "beta", fx.game).await;

    let update = next_update(&mut black).await;
    assert_eq!(update.status, GameStatus::Active);
    assert_eq!(update.version, 3);
    assert!(fx.registry.get(fx.game).is_some());
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_run_until_stops_accepting() {
    let server = FlipsideServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(tokens(), Arc::new(InMemoryRegistry::new()))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    let running = tokio::spawn(server.run_until(async {
        let _ = stopped.await;
    }));
    let _ = stop.send(());

    tokio::time::timeout(WAIT, running)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();
    assert!(
        tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .is_err()
    );
}
