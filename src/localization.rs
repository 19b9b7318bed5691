//! 语言切换广播与能力标签翻译
//!
//! `language_changes()` 就是 language$：订阅者每收到一次变化都要重新拉取并翻译

use crate::cache::CapabilityCache;
use crate::model::{CapabilityKind, SelectableOption};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Klingon,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "klingon" | "tlh" => Ok(Language::Klingon),
            _ => Err(format!("Unknown language: {}", s)),
        }
    }
}

pub const STR_CLOSE_MESSAGE: &str = "STR_Close_Message";
pub const STR_DELETE_DEVICE_MESSAGE: &str = "STR_Delete_Device_Message";
pub const STR_DELETE_PAGE_MESSAGE: &str = "STR_Delete_Page_Message";
pub const STR_DEVICE_NAME: &str = "STR_Device_Name";

// (key, English, Klingon)
const STRINGS: &[(&str, &str, &str)] = &[
    (STR_CLOSE_MESSAGE, "Close Application", "ghorgh yImej"),
    (STR_DELETE_DEVICE_MESSAGE, "Delete Device", "jan yIQaw'"),
    (STR_DELETE_PAGE_MESSAGE, "Delete Page", "nav yIQaw'"),
    (STR_DEVICE_NAME, "Device", "jan"),
    ("STR_PageSize_A4", "A4", "A4"),
    ("STR_PageSize_A3", "A3", "A3"),
    ("STR_PageSize_A5", "A5", "A5"),
    ("STR_PageSize_Letter", "Letter", "QIn"),
    ("STR_PageSize_Legal", "Legal", "chut"),
    ("STR_Quality_Draft", "Draft", "nargh"),
    ("STR_Quality_Normal", "Normal", "motlh"),
    ("STR_Quality_High", "High", "Dun"),
    ("STR_Media_Plain", "Plain", "Hal"),
    ("STR_Media_Glossy", "Glossy", "boch"),
    ("STR_Media_Recycled", "Recycled", "Qoj"),
    ("STR_Media_Transparency", "Transparency", "leSpoH"),
    ("STR_Destination_Basket", "Basket", "ngaSwI'"),
    ("STR_Destination_Tray1", "Tray 1", "veD wa'"),
    ("STR_Destination_Tray2", "Tray 2", "veD cha'"),
    ("STR_Destination_Stapler", "Stapler", "rar"),
];

pub struct LocalizationService {
    current: RwLock<Language>,
    language_tx: broadcast::Sender<Language>,
}

impl Default for LocalizationService {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl LocalizationService {
    pub fn new(language: Language) -> Self {
        let (language_tx, _) = broadcast::channel(16);
        Self {
            current: RwLock::new(language),
            language_tx,
        }
    }

    pub fn language(&self) -> Language {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// 切换语言并通知所有订阅者
    pub fn set_language(&self, language: Language) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = language;
        info!("🌐 Language set to {:?}", language);
        // 没有订阅者时发送失败，忽略
        let _ = self.language_tx.send(language);
    }

    /// language$
    pub fn language_changes(&self) -> broadcast::Receiver<Language> {
        self.language_tx.subscribe()
    }

    /// 未知的键原样返回
    pub fn translate(&self, key: &str) -> String {
        let language = self.language();
        STRINGS
            .iter()
            .find(|(k, _, _)| *k == key)
            .map(|(_, english, klingon)| match language {
                Language::English => *english,
                Language::Klingon => *klingon,
            })
            .unwrap_or(key)
            .to_string()
    }

    pub fn localized_capability(&self, option: &SelectableOption) -> SelectableOption {
        SelectableOption::new(option.value.clone(), self.translate(&option.label))
    }

    pub fn close_message(&self) -> String {
        self.translate(STR_CLOSE_MESSAGE)
    }

    pub fn delete_device_message(&self) -> String {
        self.translate(STR_DELETE_DEVICE_MESSAGE)
    }

    pub fn delete_page_message(&self) -> String {
        self.translate(STR_DELETE_PAGE_MESSAGE)
    }

    pub fn device_name(&self) -> String {
        self.translate(STR_DEVICE_NAME)
    }
}

pub type LocalizedOptions = HashMap<CapabilityKind, Vec<SelectableOption>>;

/// 翻译后的能力选项，语言每变一次就重新拉取并翻译
pub struct LocalizedCapabilities {
    options: watch::Receiver<LocalizedOptions>,
    task: JoinHandle<()>,
}

impl LocalizedCapabilities {
    pub fn spawn(capabilities: CapabilityCache, localization: Arc<LocalizationService>) -> Self {
        // 先订阅再加载，加载期间的切换不会丢
        let mut language = localization.language_changes();
        let (tx, options) = watch::channel(LocalizedOptions::new());

        let task = tokio::spawn(async move {
            loop {
                let mut localized = LocalizedOptions::new();
                for kind in CapabilityKind::ALL {
                    match capabilities.get(kind).await {
                        Ok(list) => {
                            let list = list.iter().map(|o| localization.localized_capability(o)).collect();
                            localized.insert(kind, list);
                        }
                        Err(e) => warn!("Failed to load {} options: {}", kind, e),
                    }
                }
                tx.send_replace(localized);
                debug!("Localized capabilities refreshed ({:?})", localization.language());

                match language.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self { options, task }
    }

    pub fn options(&self, kind: CapabilityKind) -> Vec<SelectableOption> {
        self.options.borrow().get(&kind).cloned().unwrap_or_default()
    }

    pub fn subscribe(&self) -> watch::Receiver<LocalizedOptions> {
        self.options.clone()
    }
}

impl Drop for LocalizedCapabilities {
    fn drop(&mut self) {
        self.task.abort();
    }
}
