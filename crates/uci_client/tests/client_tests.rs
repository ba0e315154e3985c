//! Integration tests for the UCI client against the scripted engine
//!
//! Every test runs with paused time, so think times and deadlines resolve
//! instantly while keeping their relative order.

use std::time::Duration;
use uci_client::testing::{ScriptedEngine, ScriptedTransport};
use uci_client::{
    Difficulty, EngineClient, EngineConfig, EngineError, EngineStatus, MoveRequest, START_FEN,
};

fn start_client() -> (EngineClient, ScriptedEngine) {
    start_client_with(EngineConfig::default())
}

fn start_client_with(config: EngineConfig) -> (EngineClient, ScriptedEngine) {
    let (transport, engine) = ScriptedTransport::new();
    (EngineClient::spawn(transport, config), engine)
}

fn level(n: u8) -> Difficulty {
    Difficulty::new(n).unwrap()
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_handshake_reaches_ready() {
    //! uci, default options and isready are sent before anything else
    let (client, engine) = start_client();

    client
        .wait_ready(Duration::from_secs(1))
        .await
        .expect("scripted engine answers the handshake");

    assert_eq!(client.status(), EngineStatus::Ready { degraded: false });
    let sent = engine.sent();
    assert_eq!(sent.first().map(String::as_str), Some("uci"));
    assert!(sent.contains(&"setoption name Hash value 64".to_string()));
    assert!(sent.contains(&"setoption name Threads value 1".to_string()));
    assert_eq!(sent.last().map(String::as_str), Some("isready"));
}

#[tokio::test(start_paused = true)]
async fn test_silent_engine_becomes_degraded_ready() {
    //! Missing acknowledgements delay readiness but do not block it forever
    let (transport, engine) = ScriptedTransport::new();
    engine.ignore_handshake();
    let client = EngineClient::spawn(transport, EngineConfig::default());

    assert!(
        client.wait_ready(Duration::from_secs(1)).await.is_err(),
        "should not be ready before the handshake deadline"
    );
    client
        .wait_ready(Duration::from_secs(10))
        .await
        .expect("degraded mode after the handshake deadline");
    assert_eq!(client.status(), EngineStatus::Ready { degraded: true });

    engine.emit("uciok");
    engine.emit("readyok");
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(
        client.status(),
        EngineStatus::Ready { degraded: false },
        "late acknowledgements should leave degraded mode"
    );
}

#[tokio::test(start_paused = true)]
async fn test_request_before_ready_is_not_ready() {
    let mut config = EngineConfig::default();
    config.ready_wait_ms = 100;
    let (transport, engine) = ScriptedTransport::new();
    engine.ignore_handshake();
    let client = EngineClient::spawn(transport, config);

    let result = client
        .request_move(MoveRequest::new(START_FEN, level(3)))
        .await;

    assert_eq!(result.error(), Some(&EngineError::NotReady));
    assert_eq!(engine.count_sent("go"), 0, "nothing should be searched");
}

// ============================================================================
// Move requests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_request_move_returns_best_move_with_stats() {
    let (client, engine) = start_client();

    let result = client
        .request_move(MoveRequest::new(START_FEN, level(1)))
        .await;

    assert!(result.is_success(), "unexpected failure: {:?}", result.error());
    assert_eq!(result.best_move().unwrap().to_string(), "e2e4");
    assert_eq!(result.evaluation_centipawns, Some(35), "last info line wins");
    assert_eq!(result.depth, Some(8));
    assert!(result.thinking_time_ms >= 100);
    assert!(result.thinking_time_ms < 500 * 3 + 2000);

    let sent = engine.sent();
    assert!(sent.contains(&"setoption name Skill Level value 0".to_string()));
    assert!(sent.contains(&format!("position fen {START_FEN}")));
    assert!(sent.contains(&"go movetime 500".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_skill_level_follows_difficulty() {
    let (client, engine) = start_client();

    client
        .request_move(MoveRequest::new(START_FEN, level(10)))
        .await;

    assert!(engine
        .sent()
        .contains(&"setoption name Skill Level value 19".to_string()));
    assert!(engine.sent().contains(&"go movetime 2000".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_request_is_busy() {
    //! The second request is refused without writing anything to the engine
    let (client, engine) = start_client();
    client.wait_ready(Duration::from_secs(1)).await.unwrap();
    let other = client.clone();

    let (first, second) = tokio::join!(
        client.request_move(MoveRequest::new(START_FEN, level(2))),
        other.request_move(MoveRequest::new(START_FEN, level(2))),
    );

    assert!(first.is_success());
    assert_eq!(second.error(), Some(&EngineError::Busy));
    assert_eq!(engine.count_sent("go"), 1, "exactly one search");
    assert_eq!(engine.count_sent("position"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_bestmove_is_reported() {
    let (client, engine) = start_client();
    engine.queue_bestmove("z9z9");

    let result = client
        .request_move(MoveRequest::new(START_FEN, level(4)))
        .await;

    assert_eq!(
        result.error(),
        Some(&EngineError::InvalidMove {
            token: "z9z9".to_string()
        })
    );

    let next = client
        .request_move(MoveRequest::new(START_FEN, level(4)))
        .await;
    assert!(next.is_success(), "client should recover after a bad token");
}

#[tokio::test(start_paused = true)]
async fn test_no_legal_move_token_is_invalid() {
    let (client, engine) = start_client();
    engine.queue_bestmove("(none)");

    let result = client
        .request_move(MoveRequest::new("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", level(4)))
        .await;

    assert!(matches!(
        result.error(),
        Some(EngineError::InvalidMove { .. })
    ));
}

// ============================================================================
// Deadlines and cancellation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_search_timeout_then_stale_bestmove_dropped() {
    //! The bestmove a timed-out search eventually prints must not answer the next request
    let (client, engine) = start_client();
    engine.hang_searches();
    engine.queue_bestmove("a2a3");
    engine.queue_bestmove("d2d4");

    let result = client
        .request_move(MoveRequest::new(START_FEN, level(1)))
        .await;

    match result.error() {
        Some(EngineError::SearchTimeout { after_ms }) => {
            assert!(*after_ms >= 3500, "deadline is 3 x 500 + 2000, got {after_ms}")
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(engine.count_sent("stop"), 1, "timed out search should be stopped");

    engine.resume_searches();
    let next = client
        .request_move(MoveRequest::new(START_FEN, level(1)))
        .await;
    assert_eq!(next.best_move().map(|m| m.to_string()), Some("d2d4".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_request() {
    let (client, engine) = start_client();
    engine.set_think_time(Duration::from_secs(1));
    engine.queue_bestmove("a2a3");
    engine.queue_bestmove("g1f3");

    let searcher = client.clone();
    let pending = tokio::spawn(async move {
        searcher
            .request_move(MoveRequest::new(START_FEN, level(5)))
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(engine.is_searching());
    client.stop().await;

    let cancelled = pending.await.unwrap();
    assert_eq!(cancelled.error(), Some(&EngineError::Cancelled));

    let next = client
        .request_move(MoveRequest::new(START_FEN, level(5)))
        .await;
    assert_eq!(
        next.best_move().map(|m| m.to_string()),
        Some("g1f3".to_string()),
        "stale a2a3 from the stopped search must be discarded"
    );
}

#[tokio::test(start_paused = true)]
async fn test_new_game_sends_ucinewgame() {
    let (client, engine) = start_client();
    client.wait_ready(Duration::from_secs(1)).await.unwrap();

    client.new_game().await;

    assert_eq!(engine.count_sent("ucinewgame"), 1);
    assert_eq!(engine.count_sent("stop"), 0, "nothing to stop when idle");
}

// ============================================================================
// Engine loss and disposal
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_engine_exit_fails_pending_request() {
    let (client, engine) = start_client();
    engine.hang_searches();

    let searcher = client.clone();
    let pending = tokio::spawn(async move {
        searcher
            .request_move(MoveRequest::new(START_FEN, level(5)))
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.close();

    let result = pending.await.unwrap();
    assert!(matches!(
        result.error(),
        Some(EngineError::Unavailable { .. })
    ));
    assert!(matches!(client.status(), EngineStatus::Unavailable { .. }));

    let after = client
        .request_move(MoveRequest::new(START_FEN, level(5)))
        .await;
    assert!(matches!(after.error(), Some(EngineError::Unavailable { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_dispose_sends_quit() {
    let (client, engine) = start_client();
    client.wait_ready(Duration::from_secs(1)).await.unwrap();

    client.dispose().await;

    assert_eq!(engine.sent().last().map(String::as_str), Some("quit"));
    assert!(matches!(client.status(), EngineStatus::Unavailable { .. }));
    let result = client
        .request_move(MoveRequest::new(START_FEN, level(5)))
        .await;
    assert!(!result.is_success());
}
