//! 有界重试与取消
//!
//! `await_condition` 把“等待身份客户端就绪”的轮询抽象为一个通用工具：
//! 严格串行的尝试、固定间隔、总体截止时间。配合 `cancellable` /
//! `CancelOnDrop` 在组件卸载时丢弃仍在进行的尝试与等待。

use std::future::Future;
use std::time::Duration;

use futures::future::{self, AbortHandle, Abortable, Either};

use crate::clock::Clock;

pub use futures::future::Aborted;

// =========================================================
// 重试策略
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_attempts: u32,
    /// 每次失败后的等待（包括最后一次失败之后）
    pub interval: Duration,
    /// 总体预算，超出即结束
    pub deadline: Duration,
}

impl WaitPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 8;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(150);
    pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(2000);

    pub fn new(max_attempts: u32, interval: Duration, deadline: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            deadline,
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_ATTEMPTS,
            Self::DEFAULT_INTERVAL,
            Self::DEFAULT_DEADLINE,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    Satisfied { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

impl<T> WaitOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            WaitOutcome::Satisfied { attempts, .. } | WaitOutcome::Exhausted { attempts } => {
                *attempts
            }
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied { .. })
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            WaitOutcome::Satisfied { value, .. } => Some(value),
            WaitOutcome::Exhausted { .. } => None,
        }
    }
}

/// 反复调用 `probe(attempt)`（attempt 从 1 开始）直到返回 `Some`。
///
/// 单次尝试本身也受总体预算约束：预算耗尽时该尝试被丢弃并计入次数。
pub async fn await_condition<C, F, Fut, T>(
    clock: &C,
    policy: &WaitPolicy,
    mut probe: F,
) -> WaitOutcome<T>
where
    C: Clock + ?Sized,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = clock.now_ms();
    let remaining = |now: u64| {
        let spent = Duration::from_millis(now.saturating_sub(started));
        policy.deadline.saturating_sub(spent)
    };

    let mut attempts = 0;
    while attempts < policy.max_attempts {
        let budget = remaining(clock.now_ms());
        if budget.is_zero() {
            break;
        }

        attempts += 1;
        let attempt = Box::pin(probe(attempts));
        match future::select(attempt, clock.sleep(budget)).await {
            Either::Left((Some(value), _)) => {
                return WaitOutcome::Satisfied { value, attempts };
            }
            Either::Left((None, _)) => {}
            Either::Right(_) => break,
        }

        let pause = policy.interval.min(remaining(clock.now_ms()));
        if !pause.is_zero() {
            clock.sleep(pause).await;
        }
    }

    WaitOutcome::Exhausted { attempts }
}

// =========================================================
// 取消
// =========================================================

/// 可取消任务的句柄；clone 后共享同一个取消状态
#[derive(Debug, Clone)]
pub struct CancelHandle {
    inner: AbortHandle,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.inner.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_aborted()
    }

    /// 转为随作用域结束自动取消的守卫
    pub fn on_drop(self) -> CancelOnDrop {
        CancelOnDrop { handle: self }
    }
}

/// 包装 future，返回取消句柄与可被中止的 future。
///
/// 取消后 future 在下一次被 poll 时立即以 `Err(Aborted)` 结束，
/// 其内部状态（进行中的请求、未到期的 sleep）随之被 drop。
pub fn cancellable<F: Future>(fut: F) -> (CancelHandle, Abortable<F>) {
    let (inner, registration) = AbortHandle::new_pair();
    (CancelHandle { inner }, Abortable::new(fut, registration))
}

/// Drop 时取消关联的任务
#[derive(Debug)]
pub struct CancelOnDrop {
    handle: CancelHandle,
}

impl CancelOnDrop {
    pub fn handle(&self) -> &CancelHandle {
        &self.handle
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::tests::TokioClock;
    use std::cell::Cell;

    fn policy(attempts: u32, interval_ms: u64, deadline_ms: u64) -> WaitPolicy {
        WaitPolicy::new(
            attempts,
            Duration::from_millis(interval_ms),
            Duration::from_millis(deadline_ms),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_satisfied_on_third_attempt() {
        let clock = TokioClock::new();
        let calls = Cell::new(0);

        let outcome = await_condition(&clock, &policy(8, 150, 2000), |attempt| {
            calls.set(calls.get() + 1);
            async move { (attempt == 3).then_some("ready") }
        })
        .await;

        assert_eq!(
            outcome,
            WaitOutcome::Satisfied {
                value: "ready",
                attempts: 3
            }
        );
        assert_eq!(calls.get(), 3);
        assert_eq!(clock.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_waits_after_every_failure() {
        let clock = TokioClock::new();

        let outcome: WaitOutcome<()> =
            await_condition(&clock, &policy(8, 150, 2000), |_| async { None }).await;

        assert_eq!(outcome, WaitOutcome::Exhausted { attempts: 8 });
        assert_eq!(clock.elapsed(), Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cuts_loop_short() {
        let clock = TokioClock::new();

        let outcome: WaitOutcome<()> =
            await_condition(&clock, &policy(10, 300, 1000), |_| async { None }).await;

        // 0, 300, 600, 900 四次尝试，最后一次等待被截到 100ms
        assert_eq!(outcome.attempts(), 4);
        assert_eq!(clock.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_bounded_by_deadline() {
        let clock = TokioClock::new();

        let outcome: WaitOutcome<()> = await_condition(&clock, &policy(8, 150, 2000), |_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Some(())
        })
        .await;

        assert_eq!(outcome, WaitOutcome::Exhausted { attempts: 1 });
        assert_eq!(clock.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_is_immediately_exhausted() {
        let clock = TokioClock::new();
        let calls = Cell::new(0);

        let outcome: WaitOutcome<()> = await_condition(&clock, &policy(0, 150, 2000), |_| {
            calls.set(calls.get() + 1);
            async { None }
        })
        .await;

        assert_eq!(outcome, WaitOutcome::Exhausted { attempts: 0 });
        assert_eq!(calls.get(), 0);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_sleep() {
        let clock = TokioClock::new();
        let calls = Cell::new(0);
        let wait_policy = policy(8, 150, 2000);

        let (handle, task) = cancellable(await_condition(&clock, &wait_policy, |_| {
            calls.set(calls.get() + 1);
            async { None::<()> }
        }));

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            handle.cancel();
        };
        let (result, ()) = futures::join!(task, canceller);

        assert_eq!(result, Err(Aborted));
        assert!(handle.is_cancelled());
        // 0ms 与 150ms 两次尝试之后被取消
        assert_eq!(calls.get(), 2);
        assert_eq!(clock.elapsed(), Duration::from_millis(200));
    }

    #[test]
    fn test_cancel_on_drop() {
        let (handle, _task) = cancellable(async {});
        {
            let _guard = handle.clone().on_drop();
            assert!(!handle.is_cancelled());
        }
        assert!(handle.is_cancelled());
    }
}
