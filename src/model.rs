//! 数据模型：设备、页面、可选项以及请求参数
//!
//! 所有结构都以 camelCase 在线上传输（`deviceId`、`newValue` ...）

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type DeviceId = u32;
pub type PageId = u32;

/// 类打印机设备
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
}

/// 打印页（作业），属于某个设备
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    pub device_id: DeviceId,
    pub page_size: String,
    pub print_quality: String,
    pub media_type: String,
    pub destination: String,
}

impl Page {
    /// 读取某个能力字段的当前值
    pub fn field(&self, kind: CapabilityKind) -> &str {
        match kind {
            CapabilityKind::PageSize => &self.page_size,
            CapabilityKind::PrintQuality => &self.print_quality,
            CapabilityKind::MediaType => &self.media_type,
            CapabilityKind::Destination => &self.destination,
        }
    }

    pub(crate) fn field_mut(&mut self, kind: CapabilityKind) -> &mut String {
        match kind {
            CapabilityKind::PageSize => &mut self.page_size,
            CapabilityKind::PrintQuality => &mut self.print_quality,
            CapabilityKind::MediaType => &mut self.media_type,
            CapabilityKind::Destination => &mut self.destination,
        }
    }
}

/// 某个能力的一个合法取值（value + 显示标签）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectableOption {
    pub value: String,
    pub label: String,
}

impl SelectableOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// 通过离散选项集配置的页面属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapabilityKind {
    PageSize,
    PrintQuality,
    MediaType,
    Destination,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 4] = [
        CapabilityKind::PageSize,
        CapabilityKind::PrintQuality,
        CapabilityKind::MediaType,
        CapabilityKind::Destination,
    ];

    /// 线上名称，同时用作 REST 路径段
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::PageSize => "pageSize",
            CapabilityKind::PrintQuality => "printQuality",
            CapabilityKind::MediaType => "mediaType",
            CapabilityKind::Destination => "destination",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CapabilityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown capability kind: {}", s))
    }
}

/// devices:add
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeviceParams {
    pub name: String,
}

/// devices:update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeviceParams {
    pub id: DeviceId,
    pub new_value: String,
}

/// REST 形式的批量页面更新参数（字段在路径中）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParams {
    pub pages: Vec<PageId>,
    pub new_value: String,
}

/// pages:update，字段与参数打平在同一个对象里
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePagesParams {
    pub field: CapabilityKind,
    #[serde(flatten)]
    pub update: UpdateParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDeviceResponse {
    pub deleted_device_id: DeviceId,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePageResponse {
    pub deleted_page_id: PageId,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_uses_camel_case_on_the_wire() {
        let page = Page {
            id: 1,
            device_id: 2,
            page_size: "A4".into(),
            print_quality: "high".into(),
            media_type: "plain".into(),
            destination: "basket".into(),
        };

        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["deviceId"], 2);
        assert_eq!(value["pageSize"], "A4");
        assert_eq!(value["printQuality"], "high");
    }

    #[test]
    fn test_capability_kind_parses_path_segments() {
        assert_eq!("pageSize".parse::<CapabilityKind>().unwrap(), CapabilityKind::PageSize);
        assert_eq!("DESTINATION".parse::<CapabilityKind>().unwrap(), CapabilityKind::Destination);
        assert!("colour".parse::<CapabilityKind>().is_err());
    }

    #[test]
    fn test_update_pages_params_are_flat() {
        let params: UpdatePagesParams = serde_json::from_value(json!({
            "field": "destination",
            "pages": [1, 2, 3, 4],
            "newValue": "basket"
        }))
        .unwrap();

        assert_eq!(params.field, CapabilityKind::Destination);
        assert_eq!(params.update.pages, vec![1, 2, 3, 4]);
        assert_eq!(params.update.new_value, "basket");
    }
}
