//! 需要确认的界面动作：删除、退出、设置

use crate::cache::DataService;
use crate::error::Result;
use crate::localization::{Language, LocalizationService};
use crate::modal::{
    DialogResult, ModalDescription, ModalManager, ModalSettings, ModalSize, CONFIRMATION, SETTINGS,
};
use crate::model::{DeviceId, PageId};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct Workbench {
    data: DataService,
    modals: Arc<ModalManager>,
    localization: Arc<LocalizationService>,
}

impl Workbench {
    pub fn new(data: DataService, modals: Arc<ModalManager>, localization: Arc<LocalizationService>) -> Self {
        modals.register(
            CONFIRMATION,
            ModalDescription { content: "Confirm".into(), settings: ModalSettings::default() },
        );
        modals.register(
            SETTINGS,
            ModalDescription {
                content: "Settings".into(),
                settings: ModalSettings { size: Some(ModalSize::Lg), ..Default::default() },
            },
        );

        Self { data, modals, localization }
    }

    pub fn data(&self) -> &DataService {
        &self.data
    }

    async fn confirm(&self, message: String) -> bool {
        let result = self.modals.push(CONFIRMATION, json!({ "message": message })).await;
        if !result.is_accepted() {
            debug!("Confirmation declined: {}", message);
        }
        result.is_accepted()
    }

    /// 取消时返回 `Ok(false)`，不会发出任何请求
    pub async fn delete_device(&self, id: DeviceId) -> Result<bool> {
        let name = self
            .data
            .devices()
            .into_iter()
            .find(|device| device.id == id)
            .map(|device| device.name)
            .unwrap_or_else(|| id.to_string());

        let message = format!("{}: {}", self.localization.delete_device_message(), name);
        if !self.confirm(message).await {
            return Ok(false);
        }
        self.data.delete_device(id).await
    }

    pub async fn delete_page(&self, id: PageId) -> Result<bool> {
        let message = format!("{}: {}", self.localization.delete_page_message(), id);
        if !self.confirm(message).await {
            return Ok(false);
        }
        self.data.delete_page(id).await
    }

    /// 是否应该退出
    pub async fn close(&self) -> bool {
        let close = self.confirm(self.localization.close_message()).await;
        if close {
            info!("👋 Closing");
        }
        close
    }

    /// 打开设置对话框；确认后应用返回的语言
    pub async fn settings(&self) -> bool {
        let params = json!({ "language": self.localization.language() });
        let value = match self.modals.push(SETTINGS, params).await {
            DialogResult::Accepted(value) => value,
            _ => return false,
        };

        match value.get("language").cloned().map(serde_json::from_value::<Language>) {
            Some(Ok(language)) => {
                self.localization.set_language(language);
                true
            }
            Some(Err(e)) => {
                warn!("Settings returned an unknown language: {}", e);
                false
            }
            None => false,
        }
    }

    pub async fn add_device(&self) -> Result<bool> {
        self.data.add_new_device(&self.localization.device_name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Api, Backend};
    use crate::cache::CacheState;
    use crate::channel;
    use crate::modal::manager::testing::ScriptedHost;
    use crate::modal::DialogOutcome;
    use crate::repository::{Capabilities, Data};
    use serde_json::Value;
    use std::time::Duration;

    fn workbench() -> (Workbench, Arc<ScriptedHost>, Arc<LocalizationService>) {
        let backend = Backend::spawn(Api::new(Data::seeded(), Capabilities::new()));
        let client = channel::local::connect(backend, Duration::from_secs(5));
        let host = Arc::new(ScriptedHost::default());
        let modals = Arc::new(ModalManager::new(Arc::new(host.clone())));
        let localization = Arc::new(LocalizationService::default());
        let workbench = Workbench::new(DataService::new(client), modals, localization.clone());
        (workbench, host, localization)
    }

    async fn loaded(workbench: &Workbench) {
        let mut devices = workbench.data().subscribe_devices();
        let mut pages = workbench.data().subscribe_pages();
        workbench.data().devices();
        workbench.data().pages();
        if workbench.data().devices_state() != CacheState::Populated {
            devices.changed().await.unwrap();
        }
        if workbench.data().pages_state() != CacheState::Populated {
            pages.changed().await.unwrap();
        }
    }

    async fn wait_opened(host: &ScriptedHost, count: usize) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while host.opened_count() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("dialog was not opened");
    }

    #[tokio::test]
    async fn test_delete_device_asks_with_device_name() {
        let (workbench, host, _) = workbench();
        loaded(&workbench).await;
        let mut devices = workbench.data().subscribe_devices();

        let task = tokio::spawn({
            let workbench = workbench.clone();
            async move { workbench.delete_device(1).await }
        });
        wait_opened(&host, 1).await;
        assert_eq!(host.last_params(), Some(json!({ "message": "Delete Device: Device 1" })));

        host.answer(0, DialogOutcome::Accepted(json!({})));
        assert!(task.await.unwrap().unwrap());

        devices.changed().await.unwrap();
        assert!(workbench.data().devices().iter().all(|device| device.id != 1));
    }

    #[tokio::test]
    async fn test_declined_delete_leaves_data() {
        let (workbench, host, _) = workbench();
        loaded(&workbench).await;

        let task = tokio::spawn({
            let workbench = workbench.clone();
            async move { workbench.delete_page(2).await }
        });
        wait_opened(&host, 1).await;
        host.answer(0, DialogOutcome::Rejected(json!("declined")));

        assert!(!task.await.unwrap().unwrap());
        assert_eq!(workbench.data().pages().len(), 4);
        assert_eq!(workbench.data().pages_state(), CacheState::Populated);
    }

    #[tokio::test]
    async fn test_close_uses_localized_message() {
        let (workbench, host, localization) = workbench();
        localization.set_language(Language::Klingon);

        let task = tokio::spawn({
            let workbench = workbench.clone();
            async move { workbench.close().await }
        });
        wait_opened(&host, 1).await;
        assert_eq!(host.last_params(), Some(json!({ "message": "ghorgh yImej" })));

        host.answer(0, DialogOutcome::Accepted(json!({})));
        assert!(task.await.unwrap());
    }

    #[tokio::test]
    async fn test_settings_applies_returned_language() {
        let (workbench, host, localization) = workbench();
        let mut changes = localization.language_changes();

        let task = tokio::spawn({
            let workbench = workbench.clone();
            async move { workbench.settings().await }
        });
        wait_opened(&host, 1).await;
        assert_eq!(host.last_params(), Some(json!({ "language": "english" })));

        host.answer(0, DialogOutcome::Accepted(json!({ "language": "klingon" })));
        assert!(task.await.unwrap());
        assert_eq!(changes.recv().await.unwrap(), Language::Klingon);
        assert_eq!(localization.language(), Language::Klingon);
    }

    #[tokio::test]
    async fn test_settings_rejected_keeps_language() {
        let (workbench, host, localization) = workbench();

        let task = tokio::spawn({
            let workbench = workbench.clone();
            async move { workbench.settings().await }
        });
        wait_opened(&host, 1).await;
        host.answer(0, DialogOutcome::Rejected(Value::Null));

        assert!(!task.await.unwrap());
        assert_eq!(localization.language(), Language::English);
    }

    #[tokio::test]
    async fn test_add_device_uses_default_name() {
        let (workbench, _, _) = workbench();
        loaded(&workbench).await;

        let mut devices = workbench.data().subscribe_devices();
        assert!(workbench.add_device().await.unwrap());
        devices.changed().await.unwrap();

        let names: Vec<_> = workbench.data().devices().into_iter().map(|device| device.name).collect();
        assert!(names.contains(&"Device".to_string()));
    }
}
