//! 客户端数据缓存
//!
//! 同步读取、异步拉取：第一次读返回空集合并触发拉取，写成功后重新拉取，
//! 写失败只记录错误。每个集合同一时间最多一个拉取在途。

use crate::channel::{Channel, ChannelClient};
use crate::error::Result;
use crate::model::{
    CapabilityKind, Device, DeviceId, NewDeviceParams, Page, PageId, UpdateDeviceParams,
    UpdatePagesParams, UpdateParams,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error};

/// 单个集合的缓存状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// 从未拉取过，也没有拉取在途
    Empty,
    /// 拉取在途
    Fetching,
    /// 已有快照，没有拉取在途
    Populated,
}

struct Slot<T> {
    cached: Option<Vec<T>>,
    fetching: bool,
    // 在途拉取开始后又有写成功，结束后需要再拉一次
    stale: bool,
}

struct Collection<T> {
    name: &'static str,
    channel: Channel,
    slot: Mutex<Slot<T>>,
    updates: watch::Sender<Vec<T>>,
}

impl<T> Collection<T>
where
    T: Clone + DeserializeOwned + Send + Sync + 'static,
{
    fn new(name: &'static str, channel: Channel) -> Arc<Self> {
        let (updates, _) = watch::channel(Vec::new());
        Arc::new(Self {
            name,
            channel,
            slot: Mutex::new(Slot { cached: None, fetching: false, stale: false }),
            updates,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> CacheState {
        let slot = self.lock();
        match (slot.fetching, slot.cached.is_some()) {
            (true, _) => CacheState::Fetching,
            (false, true) => CacheState::Populated,
            (false, false) => CacheState::Empty,
        }
    }

    fn read(self: &Arc<Self>, client: &ChannelClient) -> Vec<T> {
        let mut slot = self.lock();
        if let Some(cached) = &slot.cached {
            return cached.clone();
        }
        if !slot.fetching {
            slot.fetching = true;
            drop(slot);
            self.spawn_fetch(client.clone());
        }
        Vec::new()
    }

    fn invalidate(self: &Arc<Self>, client: &ChannelClient) {
        let mut slot = self.lock();
        if slot.fetching {
            slot.stale = true;
            return;
        }
        slot.fetching = true;
        drop(slot);
        self.spawn_fetch(client.clone());
    }

    /// 只在集合被读过（有快照或拉取在途）时才重新拉取
    fn invalidate_if_loaded(self: &Arc<Self>, client: &ChannelClient) {
        if self.state() != CacheState::Empty {
            self.invalidate(client);
        }
    }

    fn spawn_fetch(self: &Arc<Self>, client: ChannelClient) {
        let collection = self.clone();
        tokio::spawn(async move { collection.fetch(client).await });
    }

    async fn fetch(&self, client: ChannelClient) {
        loop {
            debug!("🔄 Fetching {}", self.name);
            let result = client.query::<Vec<T>>(self.channel).await;

            let again = {
                let mut slot = self.lock();
                match result {
                    Ok(items) => {
                        debug!("✅ {} {} cached", items.len(), self.name);
                        slot.cached = Some(items.clone());
                        self.updates.send_replace(items);
                    }
                    Err(e) => {
                        // 失败也要清除在途标记，下一次读取会重试
                        error!("Error while fetching {}: {}", self.name, e);
                    }
                }

                if slot.stale {
                    slot.stale = false;
                    true
                } else {
                    slot.fetching = false;
                    false
                }
            };

            if !again {
                break;
            }
        }
    }
}

/// 设备与页面的客户端缓存
#[derive(Clone)]
pub struct DataService {
    client: ChannelClient,
    devices: Arc<Collection<Device>>,
    pages: Arc<Collection<Page>>,
}

impl DataService {
    pub fn new(client: ChannelClient) -> Self {
        Self {
            client,
            devices: Collection::new("devices", Channel::DevicesGet),
            pages: Collection::new("pages", Channel::PagesGet),
        }
    }

    /// 当前缓存的设备；未缓存时返回空集合并触发拉取
    pub fn devices(&self) -> Vec<Device> {
        self.devices.read(&self.client)
    }

    /// 当前缓存的页面；未缓存时返回空集合并触发拉取
    pub fn pages(&self) -> Vec<Page> {
        self.pages.read(&self.client)
    }

    pub fn pages_for_device(&self, device_id: DeviceId) -> Vec<Page> {
        self.pages()
            .into_iter()
            .filter(|page| page.device_id == device_id)
            .collect()
    }

    pub fn devices_state(&self) -> CacheState {
        self.devices.state()
    }

    pub fn pages_state(&self) -> CacheState {
        self.pages.state()
    }

    /// 每次拉取成功都会推送新快照
    pub fn subscribe_devices(&self) -> watch::Receiver<Vec<Device>> {
        self.devices.updates.subscribe()
    }

    pub fn subscribe_pages(&self) -> watch::Receiver<Vec<Page>> {
        self.pages.updates.subscribe()
    }

    pub fn refresh_devices(&self) {
        self.devices.invalidate(&self.client);
    }

    pub fn refresh_pages(&self) {
        self.pages.invalidate(&self.client);
    }

    pub async fn add_new_device(&self, name: &str) -> Result<bool> {
        let params = NewDeviceParams { name: name.to_string() };
        let added = self
            .write(Channel::DevicesAdd, &params, || format!("adding device {}", name))
            .await?;
        if added {
            self.devices.invalidate(&self.client);
        }
        Ok(added)
    }

    pub async fn add_new_page(&self, device_id: DeviceId) -> Result<bool> {
        let added = self
            .write(Channel::PagesAdd, &device_id, || format!("adding page to device id: {}", device_id))
            .await?;
        if added {
            self.pages.invalidate(&self.client);
        }
        Ok(added)
    }

    pub async fn delete_device(&self, id: DeviceId) -> Result<bool> {
        let deleted = self
            .write(Channel::DevicesDelete, &id, || format!("deleting device id: {}", id))
            .await?;
        if deleted {
            self.devices.invalidate(&self.client);
            // 后端级联删除了该设备的页面
            self.pages.invalidate_if_loaded(&self.client);
        }
        Ok(deleted)
    }

    pub async fn delete_page(&self, id: PageId) -> Result<bool> {
        let deleted = self
            .write(Channel::PagesDelete, &id, || format!("deleting page id: {}", id))
            .await?;
        if deleted {
            self.pages.invalidate(&self.client);
        }
        Ok(deleted)
    }

    pub async fn update_device_name(&self, id: DeviceId, new_value: &str) -> Result<bool> {
        let params = UpdateDeviceParams { id, new_value: new_value.to_string() };
        let updated = self
            .write(Channel::DevicesUpdate, &params, || format!("updating device id: {}", id))
            .await?;
        if updated {
            self.devices.invalidate(&self.client);
        }
        Ok(updated)
    }

    /// 一次请求更新一批页面；任何一页失败整体即为 false
    pub async fn update_page_field(
        &self,
        field: CapabilityKind,
        pages: &[PageId],
        new_value: &str,
    ) -> Result<bool> {
        let params = UpdatePagesParams {
            field,
            update: UpdateParams { pages: pages.to_vec(), new_value: new_value.to_string() },
        };
        let updated = self
            .write(Channel::PagesUpdate, &params, || format!("updating pages: {:?}", pages))
            .await?;
        if updated {
            self.pages.invalidate(&self.client);
        }
        Ok(updated)
    }

    /// 发送一个写请求；失败（false 或传输错误）记录一次错误
    async fn write<P, F>(&self, channel: Channel, payload: &P, describe: F) -> Result<bool>
    where
        P: Serialize + ?Sized,
        F: FnOnce() -> String,
    {
        match self.client.request::<_, bool>(channel, payload).await {
            Ok(true) => Ok(true),
            Ok(false) => {
                error!("Error while {}", describe());
                Ok(false)
            }
            Err(e) => {
                error!("Error while {}: {}", describe(), e);
                Err(e)
            }
        }
    }
}
