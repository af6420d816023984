//! 任务生命周期控制
//!
//! `Controller` 是唯一修改 `JobRegistry` 的组件，按到达顺序逐条处理
//! 启动、停止、重启命令。其他组件只通过 `ControllerHandle` 与它通信。

pub mod controller;
pub mod registry;

pub use controller::{Controller, ControllerHandle};
pub use registry::{JobRegistry, WorkerHandle};
