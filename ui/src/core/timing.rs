//! Timers and the debounce bookkeeping for automatic snapshots.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use futures::future::{self, Either, LocalBoxFuture};
use futures::FutureExt;

/// Source of delays. The platform implementation wraps `gloo-timers` on the
/// web and `tokio::time` on desktop; tests swap in instant timers.
pub trait Sleeper {
    fn sleep(&self, ms: u64) -> LocalBoxFuture<'static, ()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformSleeper;

impl Sleeper for PlatformSleeper {
    fn sleep(&self, ms: u64) -> LocalBoxFuture<'static, ()> {
        sleep_ms(ms).boxed_local()
    }
}

pub async fn sleep_ms(ms: u64) {
    #[cfg(target_arch = "wasm32")]
    {
        let clamped = ms.min(u64::from(u32::MAX)) as u32;
        gloo_timers::future::TimeoutFuture::new(clamped).await;
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}

/// Runs `task` against a deadline; `None` when the deadline fires first.
pub async fn with_timeout<F>(sleeper: &dyn Sleeper, ms: u64, task: F) -> Option<F::Output>
where
    F: Future,
{
    let task = std::pin::pin!(task);
    match future::select(task, sleeper.sleep(ms)).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(((), _)) => None,
    }
}

/// Generation counter for the debounced auto-snapshot. Each `schedule`
/// supersedes every earlier ticket.
#[derive(Debug, Clone, Default)]
pub struct AutoCapture {
    generation: Rc<Cell<u64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTicket(u64);

impl AutoCapture {
    pub fn schedule(&self) -> CaptureTicket {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        CaptureTicket(next)
    }

    /// True when no newer schedule (or cancel) happened since `ticket`.
    pub fn is_current(&self, ticket: CaptureTicket) -> bool {
        self.generation.get() == ticket.0
    }

    pub fn cancel(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Every delay completes immediately.
    #[derive(Debug, Default)]
    pub struct InstantSleeper;

    impl Sleeper for InstantSleeper {
        fn sleep(&self, _ms: u64) -> LocalBoxFuture<'static, ()> {
            future::ready(()).boxed_local()
        }
    }

    /// No delay ever completes.
    #[derive(Debug, Default)]
    pub struct FrozenSleeper;

    impl Sleeper for FrozenSleeper {
        fn sleep(&self, _ms: u64) -> LocalBoxFuture<'static, ()> {
            future::pending().boxed_local()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FrozenSleeper, InstantSleeper};
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn newest_ticket_wins() {
        let debounce = AutoCapture::default();
        let first = debounce.schedule();
        let second = debounce.schedule();
        assert!(!debounce.is_current(first));
        assert!(debounce.is_current(second));
        debounce.cancel();
        assert!(!debounce.is_current(second));
    }

    #[test]
    fn timeout_prefers_ready_task() {
        let out = block_on(with_timeout(&FrozenSleeper, 900, async { 7 }));
        assert_eq!(out, Some(7));
    }

    #[test]
    fn timeout_fires_for_stuck_task() {
        let out = block_on(with_timeout(&InstantSleeper, 900, future::pending::<u8>()));
        assert_eq!(out, None);
    }
}
