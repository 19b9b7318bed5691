//! 后端的权威数据存储
//!
//! 单线程、内存、同步：所有操作都在 Backend 任务里顺序执行

pub mod capabilities;
pub mod data;

pub use capabilities::Capabilities;
pub use data::Data;

use crate::model::{CapabilityKind, Device, DeviceId, Page, PageId};

/// 设备与页面仓库
///
/// 变更操作返回 `bool`：目标存在并已修改时为 `true`
pub trait Repository: Send + 'static {
    fn get_devices(&self) -> Vec<Device>;
    fn get_pages(&self) -> Vec<Page>;

    fn new_device(&mut self, name: &str);
    /// 父设备不存在时不创建页面
    fn new_page(&mut self, device_id: DeviceId) -> bool;

    fn delete_device(&mut self, id: DeviceId) -> bool;
    fn delete_page(&mut self, id: PageId) -> bool;

    fn update_device_name(&mut self, id: DeviceId, new_name: &str) -> bool;

    fn update_page_size(&mut self, page_id: PageId, new_value: &str) -> bool;
    fn update_print_quality(&mut self, page_id: PageId, new_value: &str) -> bool;
    fn update_media_type(&mut self, page_id: PageId, new_value: &str) -> bool;
    fn update_destination(&mut self, page_id: PageId, new_value: &str) -> bool;

    /// 按字段分派到对应的单属性更新
    fn update_page_field(&mut self, kind: CapabilityKind, page_id: PageId, new_value: &str) -> bool {
        match kind {
            CapabilityKind::PageSize => self.update_page_size(page_id, new_value),
            CapabilityKind::PrintQuality => self.update_print_quality(page_id, new_value),
            CapabilityKind::MediaType => self.update_media_type(page_id, new_value),
            CapabilityKind::Destination => self.update_destination(page_id, new_value),
        }
    }
}
