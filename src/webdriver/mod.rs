//! # WebDriver 边界层
//!
//! 远程会话与元素的抽象 trait、基于 fantoccini 的实现，以及测试用的内存 Mock。
//!
//! ## 模块结构
//! - `traits`: `RemoteSession`、`RemoteElement` 和 `SessionConnector`
//! - `types`: 定位器、Cookie 与 capabilities
//! - `session`: 基于 fantoccini 客户端的会话和元素
//! - `connector`: 向 WebDriver URL 打开 fantoccini 会话
//! - `mock`: 从内存提供页面的 Mock 驱动

pub mod traits;
pub mod types;
pub mod session;
pub mod connector;
pub mod mock;

pub use traits::{RemoteElement, RemoteSession, SessionConnector};
pub use types::{Capabilities, Cookie, Locator};

pub use session::{RemoteElementImpl, RemoteSessionImpl};
pub use connector::WebDriverConnector;

// Re-export mock for development/testing
pub use mock::{MockDriverManager, MockRequest, MockResponse, MockSite, MockWebDriver};
