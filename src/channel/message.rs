//! 消息通道的线上信封
//!
//! 每个请求带一个单调递增的 id，回复带回同一个 id；
//! 监听表按 id 而不是通道名索引，同名通道的并发请求不会串线

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub type RequestId = u64;

/// 通道目录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "devices:get")]
    DevicesGet,
    #[serde(rename = "devices:add")]
    DevicesAdd,
    #[serde(rename = "devices:delete")]
    DevicesDelete,
    #[serde(rename = "devices:update")]
    DevicesUpdate,
    #[serde(rename = "devices:capabilities")]
    DevicesCapabilities,
    #[serde(rename = "pages:get")]
    PagesGet,
    #[serde(rename = "pages:add")]
    PagesAdd,
    #[serde(rename = "pages:delete")]
    PagesDelete,
    #[serde(rename = "pages:update")]
    PagesUpdate,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::DevicesGet => "devices:get",
            Channel::DevicesAdd => "devices:add",
            Channel::DevicesDelete => "devices:delete",
            Channel::DevicesUpdate => "devices:update",
            Channel::DevicesCapabilities => "devices:capabilities",
            Channel::PagesGet => "pages:get",
            Channel::PagesAdd => "pages:add",
            Channel::PagesDelete => "pages:delete",
            Channel::PagesUpdate => "pages:update",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub channel: Channel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// 回复体：`Ok` 携带响应负载，`Err` 表示后端无法处理该请求
///
/// 业务层面的失败（目标 id 不存在）仍然是 `Ok(false)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplyBody {
    Ok(Value),
    Err(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: RequestId,
    pub channel: Channel,
    pub body: ReplyBody,
}

impl Reply {
    pub fn ok(request: &Request, payload: Value) -> Self {
        Self {
            id: request.id,
            channel: request.channel,
            body: ReplyBody::Ok(payload),
        }
    }

    pub fn err(request: &Request, message: impl Into<String>) -> Self {
        Self {
            id: request.id,
            channel: request.channel,
            body: ReplyBody::Err(message.into()),
        }
    }
}
