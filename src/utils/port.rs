//! 端口工具模块 - HTTP 监听端口被占用时自动向后寻找

use std::net::{SocketAddr, TcpListener};
use crate::error::{Result, DeckError};
use tracing::{debug, info};

/// 检查端口在给定地址上是否可用
pub fn is_port_available(host: [u8; 4], port: u16) -> bool {
    TcpListener::bind(SocketAddr::from((host, port))).is_ok()
}

/// 从指定端口开始，寻找第一个可用端口
///
/// # Arguments
/// * `host` - 监听地址（127.0.0.1 或 0.0.0.0）
/// * `start_port` - 起始端口
/// * `max_attempts` - 最大尝试次数（向后搜索的范围）
///
/// # Returns
/// * `Ok(port)` - 找到的可用端口
/// * `Err` - 在范围内未找到可用端口
pub fn find_available_port(host: [u8; 4], start_port: u16, max_attempts: u16) -> Result<u16> {
    // 端口 0 交给操作系统分配，不需要探测
    if start_port == 0 {
        return Ok(0);
    }

    let end_port = start_port.saturating_add(max_attempts);

    for port in start_port..=end_port {
        if is_port_available(host, port) {
            if port != start_port {
                info!("📌 Port {} is occupied, using port {} instead", start_port, port);
            }
            return Ok(port);
        }
        debug!("Port {} is occupied, trying next...", port);
    }

    Err(DeckError::NoAvailablePort(start_port, end_port))
}
