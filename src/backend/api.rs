use crate::channel::{Channel, Reply, Request};
use crate::error::{DeckError, Result};
use crate::model::{
    CapabilityKind, DeviceId, NewDeviceParams, PageId, UpdateDeviceParams, UpdatePagesParams,
    UpdateParams,
};
use crate::repository::{Capabilities, Repository};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// 通道目录 -> 仓库操作
pub struct Api<R: Repository> {
    data: R,
    capabilities: Capabilities,
}

impl<R: Repository> Api<R> {
    pub fn new(data: R, capabilities: Capabilities) -> Self {
        Self { data, capabilities }
    }

    pub fn data(&self) -> &R {
        &self.data
    }

    /// 处理一个请求并生成回复；负载无法解析时回复 Err
    pub fn handle(&mut self, request: &Request) -> Reply {
        debug!("⚙️  Handling {} #{}", request.channel, request.id);
        match self.dispatch(request) {
            Ok(value) => Reply::ok(request, value),
            Err(e) => {
                warn!("Rejecting {} #{}: {}", request.channel, request.id, e);
                Reply::err(request, e.to_string())
            }
        }
    }

    fn dispatch(&mut self, request: &Request) -> Result<Value> {
        let value = match request.channel {
            Channel::DevicesGet => serde_json::to_value(self.data.get_devices())?,
            Channel::DevicesAdd => {
                let params: NewDeviceParams = payload(request)?;
                self.data.new_device(&params.name);
                json!(true)
            }
            Channel::DevicesDelete => {
                let id: DeviceId = payload(request)?;
                json!(self.data.delete_device(id))
            }
            Channel::DevicesUpdate => {
                let params: UpdateDeviceParams = payload(request)?;
                json!(self.data.update_device_name(params.id, &params.new_value))
            }
            Channel::DevicesCapabilities => {
                let kind: CapabilityKind = payload(request)?;
                serde_json::to_value(self.capabilities.get_capabilities(kind))?
            }
            Channel::PagesGet => serde_json::to_value(self.data.get_pages())?,
            Channel::PagesAdd => {
                let device_id: DeviceId = payload(request)?;
                json!(self.data.new_page(device_id))
            }
            Channel::PagesDelete => {
                let id: PageId = payload(request)?;
                json!(self.data.delete_page(id))
            }
            Channel::PagesUpdate => {
                let params: UpdatePagesParams = payload(request)?;
                json!(self.update_pages(params.field, &params.update))
            }
        };

        Ok(value)
    }

    /// 对每个页面都执行一次更新（不短路），结果取逻辑与
    pub fn update_pages(&mut self, field: CapabilityKind, update: &UpdateParams) -> bool {
        update.pages.iter().fold(true, |all_ok, &page_id| {
            let ok = self.data.update_page_field(field, page_id, &update.new_value);
            all_ok && ok
        })
    }
}

fn payload<T: DeserializeOwned>(request: &Request) -> Result<T> {
    let value = request
        .payload
        .clone()
        .ok_or_else(|| DeckError::Remote(format!("{} requires a payload", request.channel)))?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ReplyBody;
    use crate::model::{Device, Page, SelectableOption};
    use crate::repository::Data;

    /// 记录调用、按预设结果返回的仓库
    #[derive(Default)]
    struct RecordingRepository {
        calls: Vec<(String, PageId, String)>,
        failing_pages: Vec<PageId>,
        exists: bool,
    }

    impl Repository for RecordingRepository {
        fn get_devices(&self) -> Vec<Device> {
            vec![Device { id: 1, name: "Device 1".into() }]
        }
        fn get_pages(&self) -> Vec<Page> {
            Vec::new()
        }
        fn new_device(&mut self, name: &str) {
            self.calls.push(("new_device".into(), 0, name.into()));
        }
        fn new_page(&mut self, device_id: DeviceId) -> bool {
            self.calls.push(("new_page".into(), device_id, String::new()));
            self.exists
        }
        fn delete_device(&mut self, id: DeviceId) -> bool {
            self.calls.push(("delete_device".into(), id, String::new()));
            self.exists
        }
        fn delete_page(&mut self, id: PageId) -> bool {
            self.calls.push(("delete_page".into(), id, String::new()));
            self.exists
        }
        fn update_device_name(&mut self, id: DeviceId, new_name: &str) -> bool {
            self.calls.push(("update_device_name".into(), id, new_name.into()));
            self.exists
        }
        fn update_page_size(&mut self, page_id: PageId, new_value: &str) -> bool {
            self.record("update_page_size", page_id, new_value)
        }
        fn update_print_quality(&mut self, page_id: PageId, new_value: &str) -> bool {
            self.record("update_print_quality", page_id, new_value)
        }
        fn update_media_type(&mut self, page_id: PageId, new_value: &str) -> bool {
            self.record("update_media_type", page_id, new_value)
        }
        fn update_destination(&mut self, page_id: PageId, new_value: &str) -> bool {
            self.record("update_destination", page_id, new_value)
        }
    }

    impl RecordingRepository {
        fn record(&mut self, op: &str, page_id: PageId, value: &str) -> bool {
            self.calls.push((op.into(), page_id, value.into()));
            !self.failing_pages.contains(&page_id)
        }
    }

    fn request(channel: Channel, payload: Value) -> Request {
        Request { id: 1, channel, payload: Some(payload) }
    }

    fn ok_value(reply: Reply) -> Value {
        match reply.body {
            ReplyBody::Ok(value) => value,
            ReplyBody::Err(message) => panic!("unexpected error reply: {}", message),
        }
    }

    #[test]
    fn test_returns_existing_devices() {
        let mut api = Api::new(RecordingRepository::default(), Capabilities::new());
        let reply = api.handle(&Request { id: 3, channel: Channel::DevicesGet, payload: None });
        assert_eq!(reply.id, 3);
        assert_eq!(ok_value(reply), json!([{ "id": 1, "name": "Device 1" }]));
    }

    #[test]
    fn test_adds_new_devices() {
        let mut api = Api::new(RecordingRepository::default(), Capabilities::new());
        let reply = api.handle(&request(Channel::DevicesAdd, json!({ "name": "any" })));

        assert_eq!(ok_value(reply), json!(true));
        assert_eq!(api.data().calls, vec![("new_device".to_string(), 0, "any".to_string())]);
    }

    #[test]
    fn test_delete_device_reports_repository_result() {
        for exists in [true, false] {
            let repository = RecordingRepository { exists, ..Default::default() };
            let mut api = Api::new(repository, Capabilities::new());
            let reply = api.handle(&request(Channel::DevicesDelete, json!(4)));

            assert_eq!(ok_value(reply), json!(exists));
            assert_eq!(api.data().calls.len(), 1);
            assert_eq!(api.data().calls[0].1, 4);
        }
    }

    #[test]
    fn test_update_device_passes_id_and_value() {
        let mut api = Api::new(RecordingRepository::default(), Capabilities::new());
        let reply = api.handle(&request(Channel::DevicesUpdate, json!({ "id": 1000, "newValue": "don't care" })));

        assert_eq!(ok_value(reply), json!(false));
        assert_eq!(
            api.data().calls,
            vec![("update_device_name".to_string(), 1000, "don't care".to_string())]
        );
    }

    #[test]
    fn test_capabilities_come_from_catalog() {
        let capabilities = Capabilities::new();
        let expected = capabilities.get_capabilities(CapabilityKind::PageSize);
        let mut api = Api::new(RecordingRepository::default(), capabilities);

        let reply = api.handle(&request(Channel::DevicesCapabilities, json!("pageSize")));
        let options: Vec<SelectableOption> = serde_json::from_value(ok_value(reply)).unwrap();
        assert_eq!(options, expected);
    }

    #[test]
    fn test_page_update_touches_every_page() {
        let mut api = Api::new(RecordingRepository::default(), Capabilities::new());
        let reply = api.handle(&request(
            Channel::PagesUpdate,
            json!({ "field": "destination", "pages": [1, 2, 3, 4], "newValue": "basket" }),
        ));

        assert_eq!(ok_value(reply), json!(true));
        let calls = &api.data().calls;
        assert_eq!(calls.len(), 4);
        for (call, page_id) in calls.iter().zip([1, 2, 3, 4]) {
            assert_eq!(call, &("update_destination".to_string(), page_id, "basket".to_string()));
        }
    }

    #[test]
    fn test_page_update_is_false_if_any_page_fails() {
        let repository = RecordingRepository { failing_pages: vec![2], ..Default::default() };
        let mut api = Api::new(repository, Capabilities::new());
        let reply = api.handle(&request(
            Channel::PagesUpdate,
            json!({ "field": "destination", "pages": [1, 2, 3, 4], "newValue": "basket" }),
        ));

        assert_eq!(ok_value(reply), json!(false));
        assert_eq!(api.data().calls.len(), 4);
    }

    #[test]
    fn test_missing_payload_is_rejected() {
        let mut api = Api::new(Data::new(), Capabilities::new());
        let reply = api.handle(&Request { id: 9, channel: Channel::PagesAdd, payload: None });
        assert!(matches!(reply.body, ReplyBody::Err(_)));
        assert!(api.data().get_pages().is_empty());
    }

    #[test]
    fn test_add_page_for_unknown_device_is_false() {
        let mut api = Api::new(Data::seeded(), Capabilities::new());
        assert_eq!(ok_value(api.handle(&request(Channel::PagesAdd, json!(1000)))), json!(false));
        assert_eq!(ok_value(api.handle(&request(Channel::PagesAdd, json!(2)))), json!(true));
    }
}
