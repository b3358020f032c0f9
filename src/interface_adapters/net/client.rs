use crate::domain::rounds::Submission;
use crate::domain::{ArenaInput, ArenaSnapshot, GameKind, VerifiedSession, VerifyError};
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::next_conn_id;
use crate::use_cases::game::spawn_round_loop;
use crate::use_cases::{ConnId, ServerEvent, SharedHub};

use axum::{
    Error,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, timeout};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    HelloRequired,
    HelloTimeout,
    #[allow(dead_code)]
    SessionVerify(VerifyError),
    ClosedBeforeHello,
    RoomFull,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct SessionQuery {
    // Session token; when absent the first hello must carry it.
    #[serde(default)]
    token: Option<String>,
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_SESSION_TOKEN_LEN: usize = 4096;
// Yaw deltas beyond a full turn per message are treated as garbage.
const MAX_YAW_DELTA: f32 = 360.0;

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        // Separate connection id for correlating logs before/after a player_id exists.
        let conn_id = next_conn_id();
        let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
        handle_socket(socket, state, query.token, conn_id).instrument(span)
    })
}

async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    query_token: Option<String>,
    conn_id: ConnId,
) {
    let session = match bootstrap_connection(&mut socket, &state, query_token).await {
        Ok(session) => session,
        Err(NetError::ClosedBeforeHello) => {
            info!("client disconnected before hello");
            return;
        }
        Err(e) => {
            // Close frames were already sent by the failing step.
            info!(error = ?e, "connection rejected during bootstrap");
            return;
        }
    };

    let (outbound_tx, outbound_rx) = mpsc::channel(state.settings.outbound_capacity);
    let replaced = Arc::new(Notify::new());

    let assignment = {
        let mut hub = state.hub.lock().await;
        hub.attach(conn_id, outbound_tx, replaced.clone());
        let assignment = hub.connect(conn_id, &session.player_name, &session.room_code);
        if assignment.is_none() {
            hub.disconnect(conn_id);
        }
        assignment
    };

    let Some(assignment) = assignment else {
        let e = NetError::RoomFull;
        let _ = send_close_with_reason(&mut socket, close_code::POLICY, "room full").await;
        warn!(room_code = %session.room_code, error = ?e, "connection rejected");
        return;
    };

    Span::current().record("player_id", assignment.player_id);
    info!(
        player_id = assignment.player_id,
        name = %session.player_name,
        room_code = %session.room_code,
        binding = ?assignment.binding,
        "client connected"
    );
    if let Some(room_id) = assignment.start_loop {
        spawn_round_loop(state.hub.clone(), room_id);
    }

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(
        write_loop(sink, outbound_rx, replaced).instrument(Span::current()),
    );
    let pusher = tokio::spawn(
        snapshot_pusher(state.hub.clone(), conn_id, state.settings.snapshot_interval)
            .instrument(Span::current()),
    );

    let mut ctx = ConnCtx::new(conn_id);
    let outcome = run_client_loop(stream, &mut writer, &state.hub, &mut ctx).await;

    // Detaching drops the outbound sender, which lets the writer drain and close.
    pusher.abort();
    state.hub.lock().await.disconnect(conn_id);
    if !writer.is_finished() {
        if let Err(e) = writer.await {
            debug!(error = %e, "writer task join error");
        }
    }

    info!(
        msgs_in = ctx.msgs_in,
        bytes_in = ctx.bytes_in,
        invalid_json = ctx.invalid_json,
        "client disconnected"
    );
    if let Err(e) = outcome {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
    query_token: Option<String>,
) -> Result<VerifiedSession, NetError> {
    // A token in the query binds the session at connect; otherwise the first hello carries it.
    let token = match query_token {
        Some(token) => token,
        None => match timeout(state.settings.hello_timeout, read_hello(socket)).await {
            Ok(result) => result?,
            Err(_) => {
                let _ = send_close_with_reason(socket, close_code::POLICY, "hello timeout").await;
                return Err(NetError::HelloTimeout);
            }
        },
    };

    let token = token.trim();
    if token.is_empty() || token.len() > MAX_SESSION_TOKEN_LEN {
        let _ =
            send_close_with_reason(socket, close_code::POLICY, "invalid session token").await;
        return Err(NetError::SessionVerify(VerifyError::InvalidToken));
    }

    match state.verifier.verify(token).await {
        Ok(session) => Ok(session),
        Err(err) => {
            let (code, reason) = match err {
                VerifyError::InvalidToken => (close_code::POLICY, "invalid session token"),
                VerifyError::SessionExpired => (close_code::POLICY, "session expired"),
                VerifyError::UpstreamUnavailable => (close_code::ERROR, "auth unavailable"),
            };
            let _ = send_close_with_reason(socket, code, reason).await;
            Err(NetError::SessionVerify(err))
        }
    }
}

async fn read_hello(socket: &mut WebSocket) -> Result<String, NetError> {
    let mut last_log = Instant::now() - LOG_THROTTLE;
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeHello);
        };

        match incoming.map_err(NetError::Ws)? {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Hello(hello)) => {
                    debug!(name = %hello.name, version = hello.version, "hello received");
                    let Some(token) = hello.token else {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "session token required",
                        )
                        .await;
                        return Err(NetError::HelloRequired);
                    };
                    return Ok(token);
                }
                Ok(_) | Err(_) => {
                    if should_log(&mut last_log) {
                        warn!(bytes = text.len(), "message before hello dropped");
                    }
                }
            },
            Message::Binary(_) => {
                if should_log(&mut last_log) {
                    warn!("binary frame before hello dropped");
                }
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeHello),
        }
    }
}

struct ConnCtx {
    conn_id: ConnId,
    msgs_in: u64,
    bytes_in: u64,
    invalid_json: u32,
    last_invalid_log: Instant,
    last_ignored_log: Instant,
}

impl ConnCtx {
    fn new(conn_id: ConnId) -> Self {
        let now = Instant::now() - LOG_THROTTLE;
        Self {
            conn_id,
            msgs_in: 0,
            bytes_in: 0,
            invalid_json: 0,
            last_invalid_log: now,
            last_ignored_log: now,
        }
    }
}

async fn run_client_loop(
    mut stream: WsStream,
    writer: &mut JoinHandle<Result<(), NetError>>,
    hub: &SharedHub,
    ctx: &mut ConnCtx,
) -> Result<(), NetError> {
    loop {
        let control = tokio::select! {
            incoming = stream.next() => handle_incoming_ws(incoming, hub, ctx).await,
            // Writer finished: the connection was replaced or the socket failed.
            written = &mut *writer => {
                return match written {
                    Ok(result) => result,
                    Err(e) => {
                        error!(error = %e, "writer task panicked");
                        Ok(())
                    }
                };
            }
        };

        if let LoopControl::Disconnect = control {
            return Ok(());
        }
    }
}

async fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    hub: &SharedHub,
    ctx: &mut ConnCtx,
) -> LoopControl {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => dispatch(message, hub, ctx).await,
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }
                    }
                }
                LoopControl::Continue
            }
            Message::Binary(_) => {
                if should_log(&mut ctx.last_invalid_log) {
                    warn!("binary frame dropped");
                }
                LoopControl::Continue
            }
            Message::Ping(_) | Message::Pong(_) => LoopControl::Continue,
            Message::Close(_) => LoopControl::Disconnect,
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            LoopControl::Disconnect
        }
        None => {
            debug!("websocket closed");
            LoopControl::Disconnect
        }
    }
}

async fn dispatch(message: ClientMessage, hub: &SharedHub, ctx: &mut ConnCtx) {
    let conn_id = ctx.conn_id;
    let now = tokio::time::Instant::now().into_std();

    match message {
        ClientMessage::Hello(_) => {
            // Identity is bound once per connection.
            if should_log(&mut ctx.last_ignored_log) {
                debug!("repeated hello ignored");
            }
        }
        ClientMessage::Ready(ready) => {
            let start_loop = hub.lock().await.set_ready(conn_id, ready.ready);
            if let Some(room_id) = start_loop {
                spawn_round_loop(hub.clone(), room_id);
            }
        }
        ClientMessage::SelectGame(choice) => match GameKind::parse(&choice.game_type) {
            Some(game) => hub.lock().await.select_game(conn_id, game),
            None => {
                if should_log(&mut ctx.last_invalid_log) {
                    warn!(game_type = %choice.game_type, "unknown game type");
                }
            }
        },
        ClientMessage::Input(input) => {
            let Some(input) = sanitize_input(input.into()) else {
                if should_log(&mut ctx.last_invalid_log) {
                    warn!("invalid input values (NaN/inf); dropping");
                }
                return;
            };
            let queued = hub.lock().await.queue_input(conn_id, input);
            if !queued && should_log(&mut ctx.last_ignored_log) {
                debug!("input ignored outside a running arena");
            }
        }
        ClientMessage::SpeedTypeSubmit(submit) => {
            hub.lock()
                .await
                .submit(conn_id, Submission::Word(submit.word), submit.time_ms, now);
        }
        ClientMessage::MathSprintSubmit(submit) => {
            hub.lock()
                .await
                .submit(conn_id, Submission::Answer(submit.answer), submit.time_ms, now);
        }
        ClientMessage::ClickSpeedSubmit(submit) => {
            hub.lock()
                .await
                .submit(conn_id, Submission::Click, submit.time_ms, now);
        }
    }
}

fn sanitize_input(mut input: ArenaInput) -> Option<ArenaInput> {
    if !input.yaw_delta.is_finite() {
        return None;
    }
    input.yaw_delta = input.yaw_delta.clamp(-MAX_YAW_DELTA, MAX_YAW_DELTA);
    Some(input)
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Drains the connection's outbound queue onto the socket.
///
/// Ends when the queue closes (connection detached) or a newer connection replaces this one.
async fn write_loop(
    mut sink: WsSink,
    mut outbound: mpsc::Receiver<ServerEvent>,
    replaced: Arc<Notify>,
) -> Result<(), NetError> {
    loop {
        tokio::select! {
            event = outbound.recv() => {
                let Some(event) = event else {
                    let _ = sink.close().await;
                    return Ok(());
                };
                if let Err(e) = send_message(&mut sink, &ServerMessage::from(&event)).await {
                    debug!(error = ?e, "failed to send server message");
                    return Err(e);
                }
            }
            _ = replaced.notified() => {
                info!("connection replaced by newer session");
                let frame = CloseFrame {
                    code: close_code::POLICY,
                    reason: "connection replaced".into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                let _ = sink.close().await;
                return Ok(());
            }
        }
    }
}

/// Offers the latest arena snapshot to this connection, skipping ones already sent.
async fn snapshot_pusher(hub: SharedHub, conn_id: ConnId, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_sent: Option<Arc<ArenaSnapshot>> = None;

    loop {
        interval.tick().await;
        let mut guard = hub.lock().await;
        let Some(snapshot) = guard.arena_snapshot(conn_id) else {
            continue;
        };
        if last_sent
            .as_ref()
            .is_some_and(|last| Arc::ptr_eq(last, &snapshot))
        {
            continue;
        }
        if guard.push_snapshot(conn_id, snapshot.clone()) {
            last_sent = Some(snapshot);
        }
    }
}

async fn send_message(sink: &mut WsSink, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    sink.send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_yaw_delta_is_not_finite_then_input_is_dropped() {
        let input = ArenaInput {
            yaw_delta: f32::NAN,
            ..ArenaInput::default()
        };
        assert!(sanitize_input(input).is_none());
    }

    #[test]
    fn when_yaw_delta_is_huge_then_it_is_clamped() {
        let input = ArenaInput {
            yaw_delta: 10_000.0,
            shoot: true,
            ..ArenaInput::default()
        };
        let input = sanitize_input(input).unwrap();
        assert_eq!(input.yaw_delta, MAX_YAW_DELTA);
        assert!(input.shoot);
    }

    #[test]
    fn when_logged_recently_then_throttled() {
        let mut last = Instant::now() - LOG_THROTTLE;
        assert!(should_log(&mut last));
        assert!(!should_log(&mut last));
    }
}
