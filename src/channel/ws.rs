//! WebSocket 传输（客户端侧）：每个请求/回复是一条 JSON 文本消息

use crate::channel::client::{ChannelClient, Dispatcher, Outbound};
use crate::channel::message::{Reply, Request};
use crate::error::{DeckError, Result};
use futures_util::{Sink, SinkExt, StreamExt};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// 连接到服务端的 `/ipc` 端点
pub async fn connect(url: &str, timeout: Duration) -> Result<ChannelClient> {
    let (stream, _) = connect_async(url)
        .await
        .map_err(|e| DeckError::Transport(format!("Failed to connect to {}: {}", url, e)))?;
    info!("🔌 Connected to {}", url);

    let (sink, mut source) = stream.split();
    let (client, outbound) = ChannelClient::new(timeout);
    let Outbound { requests, dispatcher } = outbound;

    // 发送方向
    tokio::spawn(write_requests(sink, requests, dispatcher.clone()));

    // 接收方向
    tokio::spawn(async move {
        while let Some(message) = source.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<Reply>(&text) {
                    Ok(reply) => dispatcher.deliver(reply),
                    Err(e) => warn!("Failed to parse reply '{}': {}", text, e),
                },
                Ok(Message::Close(_)) => {
                    info!("👋 Server closed the connection");
                    break;
                }
                Ok(_) => {
                    // 忽略 ping/pong/二进制
                }
                Err(e) => {
                    warn!("❌ WebSocket receive error: {}", e);
                    break;
                }
            }
        }
        dispatcher.fail_all("WebSocket connection closed");
    });

    Ok(client)
}

/// 把排队的请求逐条写到连接上；写失败后连接不可用，所有挂起的请求立即失败
async fn write_requests<S>(mut sink: S, mut requests: mpsc::UnboundedReceiver<Request>, writer: Dispatcher)
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    while let Some(request) = requests.recv().await {
        let id = request.id;
        let text = match serde_json::to_string(&request) {
            Ok(text) => text,
            Err(e) => {
                writer.fail(id, e.into());
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text)).await {
            warn!("❌ Failed to send request #{}: {}", id, e);
            writer.fail(id, DeckError::Transport(e.to_string()));
            writer.fail_all("WebSocket send failed");
            break;
        }
    }
    let _ = sink.close().await;
    debug!("WebSocket writer stopped");
}
