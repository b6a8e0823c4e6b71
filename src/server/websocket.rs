use super::AppState;
use crate::conversation::{ ChatSession, SessionError, SubmitOutcome };
use crate::models::websocket::{ ClientMessage, ServerMessage };

use std::collections::HashMap;
use std::error::Error;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use tokio::io::{ AsyncRead, AsyncWrite };
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use tokio_tungstenite::{ accept_hdr_async, WebSocketStream };
use tokio_tungstenite::tungstenite::handshake::server::{ ErrorResponse, Request, Response };
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::Message;

use governor::{ DefaultDirectRateLimiter, Quota, RateLimiter };

use chrono::Utc;
use hmac::{ Hmac, Mac };
use sha2::Sha256;
use url::form_urlencoded;

use futures::stream::SplitSink;
use futures::{ SinkExt, StreamExt };
use log::{ debug, error, info, warn };

type HmacSha256 = Hmac<Sha256>;

const MAX_MESSAGE_SIZE: usize = 1 * 1024 * 1024;
const SIGNATURE_WINDOW_SECS: u64 = 300;
const OUTBOX_CAPACITY: usize = 32;

/// Hex HMAC-SHA256 of `ts` under `secret`, as expected in the `sig` query param.
pub fn sign(secret: &str, ts: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(ts.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks the `ts`/`sig` pair in a handshake query string.
pub fn verify_signature(secret: &str, query: &str, now: i64) -> Result<(), &'static str> {
    let params: HashMap<String, String> = form_urlencoded
        ::parse(query.as_bytes())
        .into_owned()
        .collect();

    let ts = params.get("ts").or_else(|| params.get("X-Api-Ts"));
    let sig = params.get("sig").or_else(|| params.get("X-Api-Sign"));
    let (ts, sig) = match (ts, sig) {
        (Some(ts), Some(sig)) => (ts, sig),
        _ => {
            return Err("missing ts/sig");
        }
    };

    let ts_i: i64 = ts.parse().map_err(|_| "invalid timestamp")?;
    if now.abs_diff(ts_i) > SIGNATURE_WINDOW_SECS {
        return Err("timestamp out of range");
    }

    let expected = hex::decode(sig).map_err(|_| "bad signature")?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "bad server key")?;
    mac.update(ts.as_bytes());
    mac.verify_slice(&expected).map_err(|_| "bad signature")
}

fn reject(reason: &str) -> ErrorResponse {
    let mut res = ErrorResponse::new(Some(reason.to_string()));
    *res.status_mut() = StatusCode::UNAUTHORIZED;
    res
}

pub async fn start_ws_server(
    addr: &str,
    state: AppState,
    api_key: Option<String>,
    rate_limit: NonZeroU32
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!("WS server listening on: {}", addr);
    if api_key.as_deref().map_or(true, str::is_empty) {
        warn!("SERVER_API_KEY not set; WebSocket clients are not authenticated.");
    }
    serve_ws(listener, state, api_key, rate_limit).await
}

pub async fn serve_ws(
    listener: TcpListener,
    state: AppState,
    api_key: Option<String>,
    rate_limit: NonZeroU32
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let limiter: Arc<DefaultDirectRateLimiter> = Arc::new(RateLimiter::direct(Quota::per_second(rate_limit)));

    loop {
        let (stream, peer) = listener.accept().await?;

        if limiter.check().is_err() {
            warn!("Global connection rate limit exceeded for {}. Dropping connection.", peer);
            continue;
        }

        info!("Incoming connection from: {}", peer);
        let state = state.clone();
        let required_api_key = api_key.clone();

        tokio::spawn(async move {
            if let Err(e) = process_connection(peer, stream, state, required_api_key).await {
                error!("Failed to process connection for {}: {}", peer, e);
            }
        });
    }
}

async fn process_connection<S>(
    peer: SocketAddr,
    stream: S,
    state: AppState,
    required_api_key: Option<String>
) -> Result<(), Box<dyn Error + Send + Sync>>
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static
{
    let auth_callback = |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let secret = match &required_api_key {
            Some(k) if !k.is_empty() => k,
            _ => {
                return Ok(response);
            }
        };

        let query = req.uri().query().unwrap_or("");
        match verify_signature(secret, query, Utc::now().timestamp()) {
            Ok(()) => Ok(response),
            Err(reason) => {
                warn!("Rejected handshake from {}: {}", peer, reason);
                Err(reject(reason))
            }
        }
    };

    let ws = accept_hdr_async(stream, auth_callback).await?;
    handle_connection(peer, ws, state).await;
    Ok(())
}

async fn write_messages<S>(
    peer: SocketAddr,
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut outbox: mpsc::Receiver<Message>
)
    where S: AsyncRead + AsyncWrite + Unpin
{
    while let Some(message) = outbox.recv().await {
        if let Err(e) = sink.send(message).await {
            debug!("Stopped writing to {}: {}", peer, e);
            break;
        }
    }
    let _ = sink.close().await;
}

async fn send_message(outbox: &mpsc::Sender<Message>, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => outbox.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            error!("Failed to encode server message: {}", e);
            false
        }
    }
}

fn reply_for(outcome: SubmitOutcome) -> ServerMessage {
    match outcome {
        SubmitOutcome::Replied(msg) | SubmitOutcome::Failed(msg) =>
            ServerMessage::Response {
                content: msg.content,
                timestamp: msg.timestamp,
            },
        SubmitOutcome::Cancelled => ServerMessage::Cancelled,
    }
}

/// Runs one chat session over an accepted socket. Replies are produced on a
/// separate task so a `cancel` from the client can interrupt them.
pub async fn handle_connection<S>(peer: SocketAddr, websocket: WebSocketStream<S>, state: AppState)
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static
{
    let (sink, mut rx) = websocket.split();
    let (outbox, outbox_rx) = mpsc::channel::<Message>(OUTBOX_CAPACITY);
    let writer = tokio::spawn(write_messages(peer, sink, outbox_rx));

    let session = ChatSession::new(Arc::clone(&state.assistant));
    info!("Assigned conversation ID {} to {}", session.id(), peer);
    send_message(&outbox, &ServerMessage::History { messages: session.history() }).await;

    while let Some(msg) = rx.next().await {
        let message = match msg {
            Ok(message) => message,
            Err(e) => {
                match e {
                    | tokio_tungstenite::tungstenite::Error::ConnectionClosed
                    | tokio_tungstenite::tungstenite::Error::Protocol(_) => {
                        info!("WebSocket connection closed or protocol error for {}: {}", peer, e);
                    }
                    tokio_tungstenite::tungstenite::Error::Io(ref io_err) if
                        io_err.kind() == std::io::ErrorKind::ConnectionReset
                    => {
                        info!("WebSocket connection reset by peer {}", peer);
                    }
                    _ => {
                        error!("Error receiving message from {}: {}", peer, e);
                    }
                }
                break;
            }
        };

        if message.len() > MAX_MESSAGE_SIZE {
            warn!(
                "Message from {} exceeds size limit ({} > {})",
                peer,
                message.len(),
                MAX_MESSAGE_SIZE
            );
            let error_msg = ServerMessage::Error {
                message: "Message too large".to_string(),
            };
            send_message(&outbox, &error_msg).await;
            break;
        }

        match message {
            Message::Text(text) =>
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Chat { content }) =>
                        match session.begin(&content) {
                            Ok(pending) => {
                                send_message(&outbox, &ServerMessage::Processing).await;
                                let outbox = outbox.clone();
                                tokio::spawn(async move {
                                    let outcome = pending.finish().await;
                                    send_message(&outbox, &reply_for(outcome)).await;
                                });
                            }
                            Err(SessionError::Busy) => {
                                send_message(&outbox, &ServerMessage::Busy).await;
                            }
                            Err(e) => {
                                let error_msg = ServerMessage::Error { message: e.to_string() };
                                send_message(&outbox, &error_msg).await;
                            }
                        }
                    Ok(ClientMessage::Cancel) => {
                        if !session.cancel() {
                            debug!("Cancel from {} with nothing in flight", peer);
                        }
                    }
                    Err(e) => {
                        error!("Failed to parse message from {}: {}", peer, e);
                        let error_msg = ServerMessage::Error {
                            message: format!("Failed to parse message: {}", e),
                        };
                        send_message(&outbox, &error_msg).await;
                    }
                }
            Message::Ping(ping_data) => {
                if outbox.send(Message::Pong(ping_data)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => {
                info!("Received close frame from {}", peer);
                break;
            }
            Message::Binary(_) => {
                warn!("Ignoring binary message from {}", peer);
            }
            Message::Pong(_) | Message::Frame(_) => {}
        }
    }

    session.cancel();
    drop(outbox);
    let _ = writer.await;
    info!("WebSocket connection closed for {} (Conv ID: {})", peer, session.id());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trip() {
        let now = 1_700_000_000;
        let sig = sign("secret", &now.to_string()).unwrap();
        let query = format!("ts={}&sig={}", now, sig);
        assert_eq!(verify_signature("secret", &query, now + 10), Ok(()));
    }

    #[test]
    fn alternate_param_names_are_accepted() {
        let now = 1_700_000_000;
        let sig = sign("secret", &now.to_string()).unwrap();
        let query = format!("X-Api-Ts={}&X-Api-Sign={}", now, sig);
        assert_eq!(verify_signature("secret", &query, now), Ok(()));
    }

    #[test]
    fn signature_failures() {
        let now = 1_700_000_000;
        let sig = sign("secret", &now.to_string()).unwrap();

        assert_eq!(verify_signature("secret", "", now), Err("missing ts/sig"));
        assert_eq!(
            verify_signature("secret", &format!("ts={}&sig={}", now, sig), now + SIGNATURE_WINDOW_SECS as i64 + 1),
            Err("timestamp out of range")
        );
        assert_eq!(
            verify_signature("other", &format!("ts={}&sig={}", now, sig), now),
            Err("bad signature")
        );
        assert_eq!(verify_signature("secret", &format!("ts={}&sig=zz", now), now), Err("bad signature"));
        assert_eq!(verify_signature("secret", "ts=soon&sig=00", now), Err("invalid timestamp"));
    }

    #[test]
    fn extreme_timestamps_are_out_of_range() {
        let now = 1_700_000_000;
        assert_eq!(
            verify_signature("secret", "ts=-9223372036854775808&sig=00", now),
            Err("timestamp out of range")
        );
        assert_eq!(
            verify_signature("secret", "ts=9223372036854775807&sig=00", now),
            Err("timestamp out of range")
        );
        assert_eq!(
            verify_signature("secret", "ts=0&sig=00", i64::MIN),
            Err("timestamp out of range")
        );
    }
}
