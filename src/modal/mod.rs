//! 确认门：破坏性或影响较大的操作必须先经过对话框确认

pub mod console;
pub mod manager;

pub use console::ConsoleModalHost;
pub use manager::{
    Backdrop, DialogOutcome, DialogResult, ModalDescription, ModalHost, ModalManager, ModalRef,
    ModalSettings, ModalSize, PendingDialog, CONFIRMATION, SETTINGS,
};
