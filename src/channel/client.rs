//! 请求/回复配对
//!
//! 调用方在请求入队之前登记一次性监听（oneshot），回复按 id 路由，
//! 监听在触发、超时或发送失败后移除。没有监听的回复直接丢弃。

use crate::channel::message::{Channel, Reply, ReplyBody, Request, RequestId};
use crate::error::{DeckError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

struct Listener {
    channel: Channel,
    tx: oneshot::Sender<Result<Value>>,
}

#[derive(Default)]
struct PendingTable {
    listeners: Mutex<HashMap<RequestId, Listener>>,
}

impl PendingTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 发送端：注册监听、分配 id、等待回复
#[derive(Clone)]
pub struct ChannelClient {
    pending: Arc<PendingTable>,
    next_id: Arc<AtomicU64>,
    outbound: mpsc::UnboundedSender<Request>,
    timeout: Duration,
}

/// 传输层持有的一端：取出待发请求，把回复交给 Dispatcher
pub struct Outbound {
    pub requests: mpsc::UnboundedReceiver<Request>,
    pub dispatcher: Dispatcher,
}

impl Outbound {
    pub async fn next(&mut self) -> Option<Request> {
        self.requests.recv().await
    }
}

/// 把回复或传输错误路由回对应的监听
///
/// 不持有发送队列，所有 ChannelClient 被丢弃后传输任务可以自然退出
#[derive(Clone)]
pub struct Dispatcher {
    pending: Arc<PendingTable>,
}

impl ChannelClient {
    pub fn new(timeout: Duration) -> (Self, Outbound) {
        let pending = Arc::new(PendingTable::default());
        let (outbound, requests) = mpsc::unbounded_channel();

        let client = Self {
            pending: pending.clone(),
            next_id: Arc::new(AtomicU64::new(1)),
            outbound,
            timeout,
        };
        let outbound = Outbound {
            requests,
            dispatcher: Dispatcher { pending },
        };

        (client, outbound)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 尚未收到回复的请求数
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// 无负载请求（xxx:get）
    pub async fn query<R: DeserializeOwned>(&self, channel: Channel) -> Result<R> {
        let value = self.send(channel, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 带负载请求
    pub async fn request<P, R>(&self, channel: Channel, payload: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_value(payload)?;
        let value = self.send(channel, Some(payload)).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn send(&self, channel: Channel, payload: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        // 先登记监听，再入队
        self.pending.lock().insert(id, Listener { channel, tx });
        debug!("📤 {} #{}", channel, id);

        if self.outbound.send(Request { id, channel, payload }).is_err() {
            self.pending.lock().remove(&id);
            return Err(DeckError::ChannelClosed);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DeckError::ChannelClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                warn!("⏱️  No reply on {} #{} after {:?}", channel, id, self.timeout);
                Err(DeckError::Timeout { channel, after: self.timeout })
            }
        }
    }
}

impl Dispatcher {
    /// 投递回复；没有对应监听时静默丢弃
    pub fn deliver(&self, reply: Reply) {
        let Some(listener) = self.pending.lock().remove(&reply.id) else {
            debug!("Dropping reply on {} #{}: no listener", reply.channel, reply.id);
            return;
        };

        let result = if listener.channel != reply.channel {
            warn!(
                "Reply #{} arrived on {} but was requested on {}",
                reply.id, reply.channel, listener.channel
            );
            Err(DeckError::Transport(format!(
                "reply on {} for a {} request",
                reply.channel, listener.channel
            )))
        } else {
            match reply.body {
                ReplyBody::Ok(value) => Ok(value),
                ReplyBody::Err(message) => Err(DeckError::Remote(message)),
            }
        };

        debug!("📥 {} #{}", listener.channel, reply.id);
        let _ = listener.tx.send(result);
    }

    /// 单个请求的传输错误事件
    pub fn fail(&self, id: RequestId, error: DeckError) {
        if let Some(listener) = self.pending.lock().remove(&id) {
            let _ = listener.tx.send(Err(error));
        }
    }

    /// 连接断开：所有挂起的请求都以传输错误结束
    pub fn fail_all(&self, reason: &str) {
        let listeners: Vec<_> = self.pending.lock().drain().collect();
        if !listeners.is_empty() {
            warn!("Failing {} pending request(s): {}", listeners.len(), reason);
        }
        for (_, listener) in listeners {
            let _ = listener.tx.send(Err(DeckError::Transport(reason.to_string())));
        }
    }
}
