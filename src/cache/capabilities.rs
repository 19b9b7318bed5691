use crate::channel::{Channel, ChannelClient};
use crate::error::Result;
use crate::model::{CapabilityKind, SelectableOption};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// 按能力种类缓存可选项
///
/// 第一次成功拉取后不再请求；并发的首次调用共享同一个请求。
/// 拉取失败时不缓存，下次调用会重试。
#[derive(Clone)]
pub struct CapabilityCache {
    client: ChannelClient,
    cells: Arc<[OnceCell<Vec<SelectableOption>>; 4]>,
}

impl CapabilityCache {
    pub fn new(client: ChannelClient) -> Self {
        Self {
            client,
            cells: Arc::new(Default::default()),
        }
    }

    fn cell(&self, kind: CapabilityKind) -> &OnceCell<Vec<SelectableOption>> {
        let index = match kind {
            CapabilityKind::PageSize => 0,
            CapabilityKind::PrintQuality => 1,
            CapabilityKind::MediaType => 2,
            CapabilityKind::Destination => 3,
        };
        &self.cells[index]
    }

    pub async fn get(&self, kind: CapabilityKind) -> Result<Vec<SelectableOption>> {
        let options = self
            .cell(kind)
            .get_or_try_init(|| async {
                debug!("🔄 Fetching {} options", kind);
                self.client
                    .request::<_, Vec<SelectableOption>>(Channel::DevicesCapabilities, &kind)
                    .await
            })
            .await?;
        Ok(options.clone())
    }

    pub fn is_cached(&self, kind: CapabilityKind) -> bool {
        self.cell(kind).initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Outbound, Reply};
    use crate::error::DeckError;
    use serde_json::json;
    use std::time::Duration;

    fn cache() -> (CapabilityCache, Outbound) {
        let (client, outbound) = ChannelClient::new(Duration::from_secs(5));
        (CapabilityCache::new(client), outbound)
    }

    fn options() -> Vec<SelectableOption> {
        vec![SelectableOption::new("0", "label0 ")]
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let (cache, mut outbound) = cache();
        let first = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(CapabilityKind::PageSize).await })
        };
        let request = outbound.next().await.unwrap();
        assert_eq!(request.channel, Channel::DevicesCapabilities);
        assert_eq!(request.payload, Some(json!("pageSize")));
        outbound.dispatcher.deliver(Reply::ok(&request, json!(options())));

        assert_eq!(first.await.unwrap().unwrap(), options());
        assert!(cache.is_cached(CapabilityKind::PageSize));
        assert_eq!(cache.get(CapabilityKind::PageSize).await.unwrap(), options());
        assert!(outbound.requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_share_one_request() {
        let (cache, mut outbound) = cache();
        let calls: Vec<_> = (0..2)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get(CapabilityKind::MediaType).await })
            })
            .collect();

        let request = outbound.next().await.unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(outbound.requests.try_recv().is_err());

        outbound.dispatcher.deliver(Reply::ok(&request, json!(options())));
        for call in calls {
            assert_eq!(call.await.unwrap().unwrap(), options());
        }
    }

    #[tokio::test]
    async fn test_kinds_are_cached_separately() {
        let (cache, mut outbound) = cache();
        let quality = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(CapabilityKind::PrintQuality).await })
        };
        let request = outbound.next().await.unwrap();
        outbound.dispatcher.deliver(Reply::ok(&request, json!(options())));
        quality.await.unwrap().unwrap();

        assert!(!cache.is_cached(CapabilityKind::Destination));
        let destination = tokio::spawn(async move { cache.get(CapabilityKind::Destination).await });
        let request = outbound.next().await.unwrap();
        assert_eq!(request.payload, Some(json!("destination")));
        outbound.dispatcher.deliver(Reply::ok(&request, json!([])));
        assert!(destination.await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let (cache, mut outbound) = cache();
        let failed = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(CapabilityKind::PageSize).await })
        };
        let request = outbound.next().await.unwrap();
        outbound.dispatcher.fail(request.id, DeckError::Transport("down".into()));
        assert!(failed.await.unwrap().is_err());
        assert!(!cache.is_cached(CapabilityKind::PageSize));

        let retry = tokio::spawn(async move { cache.get(CapabilityKind::PageSize).await });
        let request = outbound.next().await.unwrap();
        outbound.dispatcher.deliver(Reply::ok(&request, json!(options())));
        assert_eq!(retry.await.unwrap().unwrap(), options());
    }
}
