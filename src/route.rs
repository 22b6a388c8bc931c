//! 路由定义模块 - 领域模型
//!
//! 纯业务逻辑，不依赖 DOM。定义应用的所有路由及其访问属性。

use std::fmt::Display;

/// 应用路由枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppRoute {
    #[default]
    Home,
    About,
    Register,
    Login,
    /// 注册验证码确认
    Confirm,
    /// 找回密码
    Reset,
    /// 上传收据 (需要认证)
    Upload,
    /// 支出统计 (需要认证)
    Expenses,
    /// 账户设置 (需要认证)
    Settings,
    NotFound,
}

impl AppRoute {
    /// 将 URL path 解析为路由枚举（忽略末尾的 `/`）
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Self::Home,
            "/about" => Self::About,
            "/register" => Self::Register,
            "/login" => Self::Login,
            "/confirm" => Self::Confirm,
            "/reset" => Self::Reset,
            "/upload" => Self::Upload,
            "/expenses" => Self::Expenses,
            "/settings" => Self::Settings,
            _ => Self::NotFound,
        }
    }

    pub fn to_path(&self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::About => "/about",
            Self::Register => "/register",
            Self::Login => "/login",
            Self::Confirm => "/confirm",
            Self::Reset => "/reset",
            Self::Upload => "/upload",
            Self::Expenses => "/expenses",
            Self::Settings => "/settings",
            Self::NotFound => "/404",
        }
    }

    /// **核心守卫属性：该路由是否需要会话**
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::Upload | Self::Expenses | Self::Settings)
    }

    /// 守卫拒绝时的重定向目标
    pub fn auth_failure_redirect() -> Self {
        Self::Login
    }

    /// 登录成功后的落地页
    pub fn auth_success_redirect() -> Self {
        Self::Upload
    }
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}
