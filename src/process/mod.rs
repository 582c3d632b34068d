//! # 进程生命周期层
//!
//! 启动、探测并停止测试运行所依赖的外部进程：一个浏览器驱动和一个开发 Web 服务器。
//!
//! ## 主要功能
//! - **端口检查**: 启动前确认 host:port 未被占用
//! - **就绪探测**: 带超时地轮询 HTTP 端点，进程提前退出时立即报错
//! - **驱动管理**: 同一驱动进程可打开多个会话
//! - **Web 服务器管理**: 构造时解析解释器，停止后等待端口释放
//!
//! ## 模块结构
//! - `probe`: 端口检查与就绪轮询
//! - `managed`: 单个子进程及其生命周期状态
//! - `traits`: 驱动管理器共享的 `BrowserManager` trait
//! - `browser`: 各浏览器家族的选项与 capabilities
//! - `driver`: 本地驱动二进制管理器
//! - `remote`: 已运行的 WebDriver 端点管理器
//! - `web_server`: Web 服务器管理器
//!
//! ## 使用示例
//! ```rust,no_run
//! use browserkit_oxide::config::Config;
//! use browserkit_oxide::process::{BrowserManager, LocalDriverManager};
//! use browserkit_oxide::webdriver::WebDriverConnector;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let mut driver = LocalDriverManager::from_config(&config, Arc::new(WebDriverConnector::new()))?;
//! let session = driver.start().await?;
//! session.goto("https://example.com").await?;
//! driver.quit().await?;
//! # Ok(())
//! # }
//! ```

pub mod probe;
pub mod managed;
pub mod traits;
pub mod browser;
pub mod driver;
pub mod remote;
pub mod web_server;


pub use traits::{shared, BrowserManager, SharedBrowserManager};
pub use managed::{ManagedProcess, ProcessCommand, ProcessState};
pub use browser::{BrowserFamily, ChromeOptions, FirefoxOptions};
pub use driver::{DriverOptions, LocalDriverManager};
pub use remote::RemoteDriverManager;
pub use web_server::{WebServerManager, WebServerOptions};
