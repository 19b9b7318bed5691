use crate::model::{CapabilityKind, SelectableOption};
use std::collections::HashMap;

/// 设备能力目录（静态，进程生命周期内不变）
///
/// label 是本地化键，由前端的 LocalizationService 翻译
#[derive(Debug, Clone)]
pub struct Capabilities {
    options: HashMap<CapabilityKind, Vec<SelectableOption>>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl Capabilities {
    pub fn new() -> Self {
        let table: [(CapabilityKind, &[(&str, &str)]); 4] = [
            (
                CapabilityKind::PageSize,
                &[
                    ("A4", "STR_PageSize_A4"),
                    ("A3", "STR_PageSize_A3"),
                    ("A5", "STR_PageSize_A5"),
                    ("Letter", "STR_PageSize_Letter"),
                    ("Legal", "STR_PageSize_Legal"),
                ],
            ),
            (
                CapabilityKind::PrintQuality,
                &[
                    ("draft", "STR_Quality_Draft"),
                    ("normal", "STR_Quality_Normal"),
                    ("high", "STR_Quality_High"),
                ],
            ),
            (
                CapabilityKind::MediaType,
                &[
                    ("plain", "STR_Media_Plain"),
                    ("glossy", "STR_Media_Glossy"),
                    ("recycled", "STR_Media_Recycled"),
                    ("transparency", "STR_Media_Transparency"),
                ],
            ),
            (
                CapabilityKind::Destination,
                &[
                    ("basket", "STR_Destination_Basket"),
                    ("tray1", "STR_Destination_Tray1"),
                    ("tray2", "STR_Destination_Tray2"),
                    ("stapler", "STR_Destination_Stapler"),
                ],
            ),
        ];

        let options = table
            .into_iter()
            .map(|(kind, entries)| {
                let list = entries
                    .iter()
                    .map(|(value, label)| SelectableOption::new(*value, *label))
                    .collect();
                (kind, list)
            })
            .collect();

        Self { options }
    }

    pub fn get_capabilities(&self, kind: CapabilityKind) -> Vec<SelectableOption> {
        self.options.get(&kind).cloned().unwrap_or_default()
    }
}
