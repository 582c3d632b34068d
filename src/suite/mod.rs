//! # 测试套件生命周期
//!
//! `SuiteContext` 由测试框架驱动：按需启动 Web 服务器和浏览器驱动，分发客户端，
//! 测试失败时截图，并在测试之间回收或完全关闭资源。

pub mod context;
pub mod screenshot;

#[cfg(test)]
mod tests;

pub use context::{LifecycleMode, SuiteContext};
pub use screenshot::ErrorScreenshots;
