pub mod ipc;
pub mod rest;

use crate::backend::BackendHandle;
use crate::error::{DeckError, Result};
use crate::utils::find_available_port;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::info;

/// HTTP 服务器：`/ipc` 消息通道、`/REST` 接口、静态文件
pub struct HttpServer {
    port: u16,
    actual_port: u16,  // 实际使用的端口（可能与请求的端口不同）
    public: bool,      // 是否监听所有接口（局域网可访问）
    static_dir: PathBuf,
    backend: BackendHandle,
}

impl HttpServer {
    /// 创建服务器（端口被占用时自动向后寻找）
    ///
    /// # Arguments
    /// * `port` - 期望的端口号，0 表示由系统分配
    /// * `public` - 是否监听所有接口（true: 0.0.0.0，false: 127.0.0.1）
    pub fn new(port: u16, public: bool, static_dir: PathBuf, backend: BackendHandle) -> Result<Self> {
        let actual_port = find_available_port(Self::host(public), port, 100)?;
        Ok(Self { port, actual_port, public, static_dir, backend })
    }

    fn host(public: bool) -> [u8; 4] {
        if public {
            [0, 0, 0, 0]
        } else {
            [127, 0, 0, 1]
        }
    }

    pub fn requested_port(&self) -> u16 {
        self.port
    }

    /// 获取实际使用的端口
    pub fn get_actual_port(&self) -> u16 {
        self.actual_port
    }

    pub fn router(&self) -> Router {
        let backend = self.backend.clone();
        Router::new()
            .route("/ipc", get(move |ws| ipc::handle_socket(ws, backend)))
            .nest("/REST", rest::router(self.backend.clone()))
            .fallback_service(ServeDir::new(&self.static_dir))
    }

    pub async fn listen(&self) -> Result<TcpListener> {
        let addr = SocketAddr::from((Self::host(self.public), self.actual_port));
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DeckError::Network(format!("Failed to bind: {}", e)))?;

        let local = listener.local_addr()?;
        info!("✅ Message channel ready at ws://{}/ipc", local);
        info!("📡 REST API ready at http://{}/REST", local);
        Ok(listener)
    }

    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!("📂 Serving static files from {:?}", self.static_dir);
        axum::serve(listener, self.router())
            .await
            .map_err(|e| DeckError::Network(format!("Server error: {}", e)))
    }

    /// 启动服务器
    pub async fn start(self) -> Result<()> {
        let listener = self.listen().await?;
        self.serve(listener).await
    }
}
