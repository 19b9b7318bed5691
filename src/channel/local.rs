//! 进程内传输：客户端与后端在同一个事件循环里

use crate::backend::BackendHandle;
use crate::channel::client::{ChannelClient, Outbound};
use std::time::Duration;
use tracing::debug;

/// 把一个新的 ChannelClient 接到后端
pub fn connect(backend: BackendHandle, timeout: Duration) -> ChannelClient {
    let (client, outbound) = ChannelClient::new(timeout);
    let Outbound { mut requests, dispatcher } = outbound;

    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let id = request.id;
            match backend.call(request).await {
                Ok(reply) => dispatcher.deliver(reply),
                Err(e) => dispatcher.fail(id, e),
            }
        }
        debug!("Local transport stopped");
    });

    client
}
