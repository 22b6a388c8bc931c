//! 时钟抽象
//!
//! 守卫的重试循环与令牌过期判断都依赖时间。浏览器端由 `gloo-timers`
//! 与 `Date.now()` 实现，测试中由 tokio 的虚拟时间实现。

use std::time::Duration;

use async_trait::async_trait;

/// 异步时钟接口
#[async_trait(?Send)]
pub trait Clock {
    /// 墙上时间（Unix 纪元以来的毫秒数）
    fn now_ms(&self) -> u64;

    /// 挂起当前任务指定时长
    async fn sleep(&self, duration: Duration);

    /// 墙上时间（秒），用于与 JWT `exp` 比较
    fn now_secs(&self) -> u64 {
        self.now_ms() / 1000
    }
}
