use super::*;
use crate::clock::tests::TokioClock;
use crate::nav::tests::{NavEvent, RecordingNavigator};
use crate::session::tests::ScriptedAuth;
use crate::wait::{Aborted, cancellable};
use std::time::Duration;

// =========================================================
// 辅助函数
// =========================================================

fn create_guard<'a>(
    auth: &'a ScriptedAuth,
    clock: &'a TokioClock,
) -> RouteGuard<'a, ScriptedAuth, TokioClock> {
    RouteGuard::new(auth, clock, GuardConfig::default())
}

fn redirect_to_login() -> GuardState {
    GuardState::Redirecting {
        to: AppRoute::Login,
        replace: true,
    }
}

// =========================================================
// evaluate
// =========================================================

#[test]
fn test_evaluate_table() {
    use LocationMarker::*;
    use SessionProbe::*;

    assert_eq!(evaluate(OAuthCallback, Unknown), Decision::Allow);
    assert_eq!(evaluate(OAuthCallback, Absent), Decision::Allow);
    assert_eq!(evaluate(None, Unknown), Decision::Pending);
    assert_eq!(evaluate(None, Verified), Decision::Allow);
    assert_eq!(evaluate(None, Absent), Decision::Deny);
}

#[test]
fn test_config_from_settings() {
    let settings = GuardSettings {
        policy: WaitPolicy::new(3, Duration::from_millis(10), Duration::from_millis(100)),
        check: SessionCheck::CurrentUser,
    };
    let config = GuardConfig::from(&settings);
    assert_eq!(config.policy.max_attempts, 3);
    assert_eq!(config.check, SessionCheck::CurrentUser);
    assert_eq!(config.redirect_to, AppRoute::Login);
}

// =========================================================
// resolve
// =========================================================

#[tokio::test(start_paused = true)]
async fn test_existing_session_allowed_on_first_attempt() {
    let auth = ScriptedAuth::signed_in("ada@example.com");
    let clock = TokioClock::new();

    let outcome = create_guard(&auth, &clock)
        .resolve(&Location::parse("/upload"))
        .await;

    assert_eq!(outcome.state, GuardState::Allowed);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(clock.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_session_hydrates_on_third_attempt() {
    let auth = ScriptedAuth::hydrating_after(2, "ada@example.com");
    let clock = TokioClock::new();

    let outcome = create_guard(&auth, &clock)
        .resolve(&Location::parse("/expenses"))
        .await;

    assert_eq!(outcome.state, GuardState::Allowed);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(auth.count("fetch_session"), 3);

    // 放行之后不再有检查
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(auth.count("fetch_session"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_no_session_denies_after_full_budget() {
    let auth = ScriptedAuth::new();
    let clock = TokioClock::new();
    let nav = RecordingNavigator::new();
    let mount = GuardMount::new();

    let state = create_guard(&auth, &clock)
        .run(&mount, &Location::parse("/upload"), &nav)
        .await;

    assert_eq!(state, Some(redirect_to_login()));
    assert_eq!(mount.state(), redirect_to_login());
    assert_eq!(auth.count("fetch_session"), 8);
    assert!(clock.elapsed() >= Duration::from_millis(1200));
    assert!(clock.elapsed() <= Duration::from_millis(2000));
    assert_eq!(nav.events(), vec![NavEvent::Replace("/login".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_callback_code_in_query_skips_checks() {
    let auth = ScriptedAuth::new();
    let clock = TokioClock::new();

    let outcome = create_guard(&auth, &clock)
        .resolve(&Location::parse("/upload?code=abc123"))
        .await;

    assert_eq!(outcome, GuardOutcome { state: GuardState::Allowed, attempts: 0 });
    assert!(auth.ops().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_callback_code_in_fragment_skips_checks() {
    let auth = ScriptedAuth::new();
    let clock = TokioClock::new();

    let outcome = create_guard(&auth, &clock)
        .resolve(&Location::parse("/settings#code=abc123&state=xyz"))
        .await;

    assert_eq!(outcome.state, GuardState::Allowed);
    assert_eq!(auth.count("fetch_session"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_lookalike_param_is_not_a_callback() {
    let auth = ScriptedAuth::new();
    let clock = TokioClock::new();

    let outcome = create_guard(&auth, &clock)
        .resolve(&Location::parse("/upload?error_code=access_denied"))
        .await;

    assert_eq!(outcome.state, redirect_to_login());
    assert_eq!(outcome.attempts, 8);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_check_bounded_by_deadline() {
    let auth = ScriptedAuth::signed_in("ada@example.com");
    auth.fetch_delay.set(Duration::from_secs(30));
    let clock = TokioClock::new();

    let outcome = create_guard(&auth, &clock)
        .resolve(&Location::parse("/upload"))
        .await;

    assert_eq!(outcome.state, redirect_to_login());
    assert_eq!(outcome.attempts, 1);
    assert_eq!(clock.elapsed(), Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_current_user_check() {
    let auth = ScriptedAuth::signed_in("ada@example.com");
    let clock = TokioClock::new();
    let config = GuardConfig {
        check: SessionCheck::CurrentUser,
        ..Default::default()
    };

    let outcome = RouteGuard::new(&auth, &clock, config)
        .resolve(&Location::parse("/upload"))
        .await;

    assert_eq!(outcome.state, GuardState::Allowed);
    assert_eq!(auth.count("get_current_user"), 1);
    assert_eq!(auth.count("fetch_session"), 0);
}

// =========================================================
// 卸载与重新评估
// =========================================================

#[tokio::test(start_paused = true)]
async fn test_unmount_cancels_pending_attempts() {
    let auth = ScriptedAuth::new();
    let clock = TokioClock::new();
    let nav = RecordingNavigator::new();
    let mount = GuardMount::new();
    let guard = create_guard(&auth, &clock);
    let location = Location::parse("/upload");

    let (handle, task) = cancellable(guard.run(&mount, &location, &nav));
    let unmount = async {
        tokio::time::sleep(Duration::from_millis(400)).await;
        mount.dispose();
        handle.cancel();
    };
    let (result, ()) = futures::join!(task, unmount);

    assert_eq!(result, Err(Aborted));
    tokio::time::sleep(Duration::from_secs(5)).await;
    // 0ms / 150ms / 300ms 三次，之后没有任何检查
    assert_eq!(auth.count("fetch_session"), 3);
    assert!(nav.events().is_empty());
    assert_eq!(mount.state(), GuardState::Checking);
}

#[tokio::test(start_paused = true)]
async fn test_result_after_dispose_is_discarded() {
    let auth = ScriptedAuth::new();
    let clock = TokioClock::new();
    let nav = RecordingNavigator::new();
    let mount = GuardMount::new();
    let guard = create_guard(&auth, &clock);
    let location = Location::parse("/upload");

    let unmount = async {
        tokio::time::sleep(Duration::from_millis(400)).await;
        mount.dispose();
    };
    let (state, ()) = futures::join!(guard.run(&mount, &location, &nav), unmount);

    assert_eq!(state, None);
    assert!(nav.events().is_empty());
    assert_eq!(mount.state(), GuardState::Checking);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_evaluation_never_applies() {
    let auth = ScriptedAuth::new();
    let clock = TokioClock::new();
    let nav = RecordingNavigator::new();
    let mount = GuardMount::new();
    let guard = create_guard(&auth, &clock);
    let plain = Location::parse("/upload");
    let callback = Location::parse("/upload?code=abc123");

    let (first, second) = futures::join!(
        guard.run(&mount, &plain, &nav),
        guard.run(&mount, &callback, &nav)
    );

    assert_eq!(first, None);
    assert_eq!(second, Some(GuardState::Allowed));
    assert_eq!(mount.state(), GuardState::Allowed);
    assert!(nav.events().is_empty());
}

#[test]
fn test_mount_generations() {
    let mount = GuardMount::new();
    let first = mount.begin();
    let second = mount.begin();

    assert!(!mount.complete(first, GuardState::Allowed));
    assert_eq!(mount.state(), GuardState::Checking);
    assert!(mount.complete(second, redirect_to_login()));
    assert!(mount.state().is_terminal());

    let third = mount.begin();
    assert_eq!(mount.state(), GuardState::Checking);
    mount.dispose();
    assert!(mount.is_disposed());
    assert!(!mount.complete(third, GuardState::Allowed));
}
