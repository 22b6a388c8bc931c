//! 浏览器时钟
//!
//! `Date.now()` 提供墙上时间，`gloo-timers` 的 `setTimeout` future 提供休眠。

use std::time::Duration;

use receiptpal::clock::Clock;

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserClock;

#[async_trait::async_trait(?Send)]
impl Clock for BrowserClock {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    async fn sleep(&self, duration: Duration) {
        gloo_timers::future::sleep(duration).await;
    }
}
