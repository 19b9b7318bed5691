use crate::model::{CapabilityKind, Device, DeviceId, Page, PageId};
use crate::repository::Repository;
use tracing::debug;

pub const DEFAULT_PAGE_SIZE: &str = "A4";
pub const DEFAULT_PRINT_QUALITY: &str = "normal";
pub const DEFAULT_MEDIA_TYPE: &str = "plain";
pub const DEFAULT_DESTINATION: &str = "basket";

/// 内存中的设备/页面集合
///
/// id 从 1 开始单调递增，进程存活期间不会复用
#[derive(Debug)]
pub struct Data {
    devices: Vec<Device>,
    pages: Vec<Page>,
    next_device_id: DeviceId,
    next_page_id: PageId,
}

impl Default for Data {
    fn default() -> Self {
        Self::new()
    }
}

impl Data {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            pages: Vec::new(),
            next_device_id: 1,
            next_page_id: 1,
        }
    }

    /// 演示数据：两个设备，各两页
    pub fn seeded() -> Self {
        let mut data = Self::new();
        for name in ["Device 1", "Device 2"] {
            data.new_device(name);
        }
        for device_id in [1, 1, 2, 2] {
            data.new_page(device_id);
        }
        data
    }

    fn set_page_field(&mut self, kind: CapabilityKind, page_id: PageId, new_value: &str) -> bool {
        match self.pages.iter_mut().find(|page| page.id == page_id) {
            Some(page) => {
                *page.field_mut(kind) = new_value.to_string();
                true
            }
            None => false,
        }
    }
}

impl Repository for Data {
    fn get_devices(&self) -> Vec<Device> {
        self.devices.clone()
    }

    fn get_pages(&self) -> Vec<Page> {
        self.pages.clone()
    }

    fn new_device(&mut self, name: &str) {
        let id = self.next_device_id;
        self.next_device_id += 1;
        self.devices.push(Device { id, name: name.to_string() });
        debug!("Created device {} ({})", id, name);
    }

    fn new_page(&mut self, device_id: DeviceId) -> bool {
        if !self.devices.iter().any(|device| device.id == device_id) {
            return false;
        }

        let id = self.next_page_id;
        self.next_page_id += 1;
        self.pages.push(Page {
            id,
            device_id,
            page_size: DEFAULT_PAGE_SIZE.to_string(),
            print_quality: DEFAULT_PRINT_QUALITY.to_string(),
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            destination: DEFAULT_DESTINATION.to_string(),
        });
        debug!("Created page {} for device {}", id, device_id);
        true
    }

    fn delete_device(&mut self, id: DeviceId) -> bool {
        let before = self.devices.len();
        self.devices.retain(|device| device.id != id);
        if self.devices.len() == before {
            return false;
        }

        // 级联删除：页面不能指向不存在的设备
        let pages_before = self.pages.len();
        self.pages.retain(|page| page.device_id != id);
        debug!("Deleted device {} and {} page(s)", id, pages_before - self.pages.len());
        true
    }

    fn delete_page(&mut self, id: PageId) -> bool {
        let before = self.pages.len();
        self.pages.retain(|page| page.id != id);
        self.pages.len() != before
    }

    fn update_device_name(&mut self, id: DeviceId, new_name: &str) -> bool {
        match self.devices.iter_mut().find(|device| device.id == id) {
            Some(device) => {
                device.name = new_name.to_string();
                true
            }
            None => false,
        }
    }

    fn update_page_size(&mut self, page_id: PageId, new_value: &str) -> bool {
        self.set_page_field(CapabilityKind::PageSize, page_id, new_value)
    }

    fn update_print_quality(&mut self, page_id: PageId, new_value: &str) -> bool {
        self.set_page_field(CapabilityKind::PrintQuality, page_id, new_value)
    }

    fn update_media_type(&mut self, page_id: PageId, new_value: &str) -> bool {
        self.set_page_field(CapabilityKind::MediaType, page_id, new_value)
    }

    fn update_destination(&mut self, page_id: PageId, new_value: &str) -> bool {
        self.set_page_field(CapabilityKind::Destination, page_id, new_value)
    }
}
