//! 导航抽象
//!
//! 将 `window.history` / `window.location` 的三种操作抽象为 trait，
//! 核心流程（守卫重定向、登出、联合登录跳转）只依赖这个接口。

/// 浏览器导航接口
pub trait Navigator {
    /// pushState：新增一条历史记录
    fn push(&self, path: &str);
    /// replaceState：替换当前历史记录（守卫重定向使用）
    fn replace(&self, path: &str);
    /// 整页跳转到外部 URL（身份提供方的登录/登出页）
    fn assign(&self, url: &str);
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum NavEvent {
        Push(String),
        Replace(String),
        Assign(String),
    }

    /// 记录所有导航请求的 Navigator
    #[derive(Default)]
    pub struct RecordingNavigator {
        pub events: RefCell<Vec<NavEvent>>,
    }

    impl RecordingNavigator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<NavEvent> {
            self.events.borrow().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn push(&self, path: &str) {
            self.events.borrow_mut().push(NavEvent::Push(path.to_string()));
        }

        fn replace(&self, path: &str) {
            self.events
                .borrow_mut()
                .push(NavEvent::Replace(path.to_string()));
        }

        fn assign(&self, url: &str) {
            self.events
                .borrow_mut()
                .push(NavEvent::Assign(url.to_string()));
        }
    }
}
