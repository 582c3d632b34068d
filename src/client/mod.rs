//! # 会话客户端
//!
//! 在单个远程浏览器会话之上提供 browser-kit 风格的 API。相对 URI 基于配置的基础 URI 解析。
//!
//! ## 主要功能
//! - **导航**: 请求、点击链接、历史前进后退与刷新
//! - **表单**: 按按钮提交并覆盖字段值
//! - **Cookie**: 读取、设置、删除和清空
//! - **脚本与截图**: 同步/异步脚本执行，PNG 截图
//! - **等待**: 有界轮询元素出现、可见、文本和属性等条件
//!
//! ## 使用示例
//! ```ignore
//! let client = Client::new(manager, ClientOptions::default().with_base_uri("http://127.0.0.1:9080"));
//! let crawler = client.get("/login").await?;
//! client.submit_form("Sign in", &[("user".to_string(), "ada".into())]).await?;
//! client.wait_for_visibility("#welcome", None).await?;
//! ```

#[allow(clippy::module_inception)]
pub mod client;
pub mod request;
pub mod wait;

#[cfg(test)]
mod tests;

pub use client::{Client, ClientOptions};
pub use request::Request;
pub use wait::{ConditionKind, WaitCondition, DEFAULT_WAIT_INTERVAL, DEFAULT_WAIT_TIMEOUT};
