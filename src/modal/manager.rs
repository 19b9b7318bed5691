use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// 确认对话框，参数 `{message}`
pub const CONFIRMATION: &str = "confirmation";
/// 设置对话框，参数 `{language}`
pub const SETTINGS: &str = "settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backdrop {
    /// 点击遮罩不会关闭
    Static,
    Dismissible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalSize {
    Sm,
    Lg,
    Xl,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalSettings {
    pub size: Option<ModalSize>,
    pub backdrop: Option<Backdrop>,
    pub keyboard: Option<bool>,
}

impl ModalSettings {
    /// 每个对话框至少带上的设置：静态遮罩、禁用 Esc、小尺寸
    pub fn minimum() -> Self {
        Self {
            size: Some(ModalSize::Sm),
            backdrop: Some(Backdrop::Static),
            keyboard: Some(false),
        }
    }

    /// 以 `base` 为底，用自身已设置的字段覆盖
    pub fn merged_over(&self, base: &ModalSettings) -> ModalSettings {
        ModalSettings {
            size: self.size.or(base.size),
            backdrop: self.backdrop.or(base.backdrop),
            keyboard: self.keyboard.or(base.keyboard),
        }
    }
}

/// 注册的对话框：内容标识 + 设置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalDescription {
    pub content: String,
    pub settings: ModalSettings,
}

/// 宿主报告的对话框结果
#[derive(Debug, Clone, PartialEq)]
pub enum DialogOutcome {
    Accepted(Value),
    Rejected(Value),
}

/// `push` 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum DialogResult {
    /// 用户确认，携带对话框返回值
    Accepted(Value),
    /// 用户取消/关闭，或对话框被强制关闭（`Value::Null`）
    Rejected(Value),
    /// 种类未注册，没有打开任何对话框
    Unregistered,
}

impl DialogResult {
    /// 只有确认才放行被保护的操作
    pub fn accepted(self) -> Option<Value> {
        match self {
            DialogResult::Accepted(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, DialogResult::Accepted(_))
    }
}

/// 已打开对话框的句柄
pub struct ModalRef {
    result: oneshot::Receiver<DialogOutcome>,
    close: Box<dyn FnOnce() + Send>,
}

impl ModalRef {
    /// `close` 必须让对话框消失；之后不再产生结果时视为拒绝
    pub fn new(result: oneshot::Receiver<DialogOutcome>, close: impl FnOnce() + Send + 'static) -> Self {
        Self { result, close: Box::new(close) }
    }
}

/// 真正显示对话框的一方（控制台、GUI、测试替身）
pub trait ModalHost: Send + Sync {
    fn open(&self, content: &str, settings: &ModalSettings, params: Value) -> ModalRef;
}

struct OpenDialog {
    seq: u64,
    kind: String,
    close: Box<dyn FnOnce() + Send>,
}

type Current = Arc<Mutex<Option<OpenDialog>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 对话框管理：注册种类、打开（同一时间最多一个）、强制关闭
pub struct ModalManager {
    host: Arc<dyn ModalHost>,
    registry: Mutex<HashMap<String, ModalDescription>>,
    current: Current,
    next_seq: AtomicU64,
}

impl ModalManager {
    pub fn new(host: Arc<dyn ModalHost>) -> Self {
        Self {
            host,
            registry: Mutex::new(HashMap::new()),
            current: Arc::new(Mutex::new(None)),
            next_seq: AtomicU64::new(1),
        }
    }

    /// 注册一个对话框种类；已注册时返回 false 且不覆盖
    pub fn register(&self, kind: &str, description: ModalDescription) -> bool {
        let mut registry = lock(&self.registry);
        if registry.contains_key(kind) {
            debug!("Dialog {} is already registered", kind);
            return false;
        }
        registry.insert(kind.to_string(), description);
        true
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        lock(&self.registry).contains_key(kind)
    }

    pub fn is_open(&self) -> bool {
        lock(&self.current).is_some()
    }

    /// 打开对话框并返回其结果
    ///
    /// 未注册的种类立即得到 `Unregistered`。已有对话框打开时先把它关掉。
    /// 必须在 tokio 运行时中调用。
    pub fn push(&self, kind: &str, params: Value) -> PendingDialog {
        let (tx, rx) = oneshot::channel();

        let Some(description) = lock(&self.registry).get(kind).cloned() else {
            warn!("Dialog {} is not registered", kind);
            let _ = tx.send(DialogResult::Unregistered);
            return PendingDialog { rx };
        };

        let previous = lock(&self.current).take();
        if let Some(previous) = previous {
            warn!("Dialog {} is still open, closing it before {}", previous.kind, kind);
            (previous.close)();
        }

        let settings = description.settings.merged_over(&ModalSettings::minimum());
        let ModalRef { result, close } = self.host.open(&description.content, &settings, params);

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        *lock(&self.current) = Some(OpenDialog { seq, kind: kind.to_string(), close });
        info!("💬 Dialog {} opened", kind);

        let current = self.current.clone();
        let kind = kind.to_string();
        tokio::spawn(async move {
            let outcome = result.await;

            // Open -> Idle，只清除自己那一个
            {
                let mut slot = lock(&current);
                if slot.as_ref().map(|open| open.seq) == Some(seq) {
                    *slot = None;
                }
            }

            let result = match outcome {
                Ok(DialogOutcome::Accepted(value)) => {
                    debug!("Dialog {} accepted", kind);
                    DialogResult::Accepted(value)
                }
                Ok(DialogOutcome::Rejected(reason)) => {
                    debug!("Dialog {} rejected", kind);
                    DialogResult::Rejected(reason)
                }
                Err(_) => {
                    debug!("Dialog {} closed without an answer", kind);
                    DialogResult::Rejected(Value::Null)
                }
            };
            let _ = tx.send(result);
        });

        PendingDialog { rx }
    }

    /// 强制关闭当前对话框；没有打开的对话框时什么都不做
    pub fn pop(&self) {
        let open = lock(&self.current).take();
        if let Some(open) = open {
            info!("Dialog {} closed", open.kind);
            (open.close)();
        }
    }
}

/// 对话框结果的 future
pub struct PendingDialog {
    rx: oneshot::Receiver<DialogResult>,
}

impl Future for PendingDialog {
    type Output = DialogResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(DialogResult::Rejected(Value::Null)),
            Poll::Pending => Poll::Pending,
        }
    }
}
