//! # DOM 视图层
//!
//! 基于实时元素的 Crawler、带类型的表单字段，以及客户端分派所用的 `Link`/`Form` 和类型。
//!
//! ## 模块结构
//! - `crawler`: 支持过滤和遍历的不可变元素列表
//! - `field`: 文本、选择和文件字段
//! - `form`: 远程表单与静态表单
//! - `link`: 远程链接与静态链接
//! - `static_page`: 用 `scraper` 从 HTML 解析链接和表单

pub mod crawler;
pub mod field;
pub mod form;
pub mod link;
pub mod static_page;

#[cfg(test)]
mod tests;

pub use crawler::Crawler;
pub use field::{ChoiceField, ChoiceKind, FileField, FormField, FormValue, TextField};
pub use form::{Form, RemoteForm};
pub use link::{Link, RemoteLink};
pub use static_page::{StaticForm, StaticLink, StaticPage};
