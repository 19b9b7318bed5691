pub mod client;
pub mod local;
pub mod message;
pub mod ws;

pub use client::{ChannelClient, Dispatcher, Outbound};
pub use message::{Channel, Reply, ReplyBody, Request, RequestId};
