//! 后端：通道目录到仓库操作的映射，以及持有仓库的单任务 actor

pub mod api;

pub use api::Api;

use crate::channel::{Channel, Reply, ReplyBody, Request};
use crate::error::{DeckError, Result};
use crate::repository::Repository;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

type Job = (Request, oneshot::Sender<Reply>);

/// 仓库任务的句柄；IPC、REST 和本地传输共用同一个
#[derive(Clone)]
pub struct BackendHandle {
    tx: mpsc::Sender<Job>,
    next_id: Arc<AtomicU64>,
}

pub struct Backend;

impl Backend {
    /// 启动仓库任务：请求逐个处理，前一个完成之前不会接收下一个
    pub fn spawn<R: Repository>(mut api: Api<R>) -> BackendHandle {
        let (tx, mut rx) = mpsc::channel::<Job>(64);

        tokio::spawn(async move {
            info!("🗄️  Backend repository task started");
            while let Some((request, reply_tx)) = rx.recv().await {
                let reply = api.handle(&request);
                if reply_tx.send(reply).is_err() {
                    debug!("Caller of {} #{} went away", request.channel, request.id);
                }
            }
            info!("Backend repository task stopped");
        });

        BackendHandle {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl BackendHandle {
    pub async fn call(&self, request: Request) -> Result<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| DeckError::ChannelClosed)?;
        reply_rx.await.map_err(|_| DeckError::ChannelClosed)
    }

    /// 无负载调用，供 REST 层使用
    pub async fn query<R: DeserializeOwned>(&self, channel: Channel) -> Result<R> {
        self.invoke(channel, None).await
    }

    pub async fn execute<P, R>(&self, channel: Channel, payload: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_value(payload)?;
        self.invoke(channel, Some(payload)).await
    }

    async fn invoke<R: DeserializeOwned>(&self, channel: Channel, payload: Option<Value>) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let reply = self.call(Request { id, channel, payload }).await?;
        match reply.body {
            ReplyBody::Ok(value) => Ok(serde_json::from_value(value)?),
            ReplyBody::Err(message) => Err(DeckError::Remote(message)),
        }
    }
}
