//! `/ipc`：WebSocket 上的消息通道（服务端侧）

use crate::backend::BackendHandle;
use crate::channel::{ReplyBody, Request};
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// 处理 WebSocket 连接
pub async fn handle_socket(ws: WebSocketUpgrade, backend: BackendHandle) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_client(socket, backend))
}

/// 处理单个客户端连接：每条文本消息是一个请求，逐个转给后端并回复
async fn handle_client(mut socket: WebSocket, backend: BackendHandle) {
    info!("📱 New message channel client connected");

    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Text(text)) => {
                let request = match serde_json::from_str::<Request>(&text) {
                    Ok(request) => request,
                    Err(e) => {
                        warn!("Failed to parse request '{}': {}", text, e);
                        // 能读出 id 就回一个错误，否则无法关联，只能丢弃
                        if let Some(rejection) = reject_frame(&text, &e) {
                            if socket.send(Message::Text(rejection)).await.is_err() {
                                warn!("❌ Client disconnected (send failed)");
                                break;
                            }
                        }
                        continue;
                    }
                };
                debug!("📥 {} #{}", request.channel, request.id);

                let reply = match backend.call(request).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!("Backend unavailable: {}", e);
                        break;
                    }
                };
                let text = match serde_json::to_string(&reply) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode reply #{}: {}", reply.id, e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    warn!("❌ Client disconnected (send failed)");
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("👋 Client sent close message");
                break;
            }
            Ok(Message::Ping(_)) => {
                // 自动回复pong（axum会处理）
            }
            Ok(_) => {}
            Err(e) => {
                warn!("❌ Client disconnected (recv error): {}", e);
                break;
            }
        }
    }

    info!("👋 Message channel client disconnected");
}

/// 无法解析为请求、但带有数字 id 的帧：按原样带回 id 和通道名，回复体为错误
fn reject_frame(text: &str, error: &serde_json::Error) -> Option<String> {
    let frame: Value = serde_json::from_str(text).ok()?;
    let id = frame.get("id")?.as_u64()?;
    let channel = frame.get("channel").cloned().unwrap_or(Value::Null);
    let body = serde_json::to_value(ReplyBody::Err(format!("Invalid request: {}", error))).ok()?;
    Some(json!({ "id": id, "channel": channel, "body": body }).to_string())
}
