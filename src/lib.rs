//! ReceiptPal 客户端核心
//!
//! 与平台无关的部分：路由守卫、等待工具、身份缓存、身份客户端契约及其
//! Cognito 实现、后端 REST 客户端、各页面的业务流程。
//!
//! 所有外部依赖（HTTP、时钟、键值存储、浏览器历史）都以 trait 注入，
//! 浏览器实现位于 `receiptpal-frontend`，测试实现位于各模块的 `tests` 中。

pub mod account;
pub mod api;
pub mod clock;
pub mod cognito;
pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod location;
pub mod nav;
pub mod receipts;
pub mod request;
pub mod route;
pub mod session;
pub mod wait;

pub use error::{ErrorKind, PalError, PalResult};
