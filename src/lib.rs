//! printdeck：打印设备与打印页配置器
//!
//! 后端持有内存仓库，前端通过关联 id 的消息通道访问，并在本地缓存数据、
//! 能力选项，破坏性操作先经过确认对话框。

pub mod backend;
pub mod cache;
pub mod channel;
pub mod error;
pub mod localization;
pub mod modal;
pub mod model;
pub mod repository;
pub mod server;
pub mod utils;
pub mod workbench;

pub use error::{DeckError, Result};
