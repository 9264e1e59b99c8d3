//! Race a natural completion against a safety timeout.
//!
//! Both sides are futures. Whichever resolves first wins and the other is
//! dropped, so event subscriptions and timers must unregister on drop.

use std::cell::Cell;
use std::future::Future;

use futures::future::{self, Either};

/// Result of [`race_with_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceOutcome<T> {
    Completed(T),
    TimedOut,
}

impl<T> RaceOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, RaceOutcome::Completed(_))
    }
}

/// Await `event`, giving up once `timeout` fires. The loser is dropped.
pub async fn race_with_timeout<F, T>(event: F, timeout: T) -> RaceOutcome<F::Output>
where
    F: Future,
    T: Future<Output = ()>,
{
    let event = std::pin::pin!(event);
    let timeout = std::pin::pin!(timeout);
    match future::select(event, timeout).await {
        Either::Left((value, _)) => RaceOutcome::Completed(value),
        Either::Right(((), _)) => RaceOutcome::TimedOut,
    }
}

/// Await whichever of two signals arrives first, discarding the other.
pub async fn first_of<A, B>(a: A, b: B)
where
    A: Future,
    B: Future,
{
    let a = std::pin::pin!(a);
    let b = std::pin::pin!(b);
    future::select(a, b).await;
}

/// One-shot latch: `fire` returns true only on its first call.
#[derive(Debug, Default)]
pub struct Latch {
    fired: Cell<bool>,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) -> bool {
        !self.fired.replace(true)
    }

    pub fn has_fired(&self) -> bool {
        self.fired.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::block_on;

    #[test]
    fn test_event_wins() {
        let out = block_on(race_with_timeout(
            future::ready(7),
            future::pending::<()>(),
        ));
        assert_eq!(out, RaceOutcome::Completed(7));
    }

    #[test]
    fn test_timeout_wins() {
        let out = block_on(race_with_timeout(
            future::pending::<u8>(),
            future::ready(()),
        ));
        assert_eq!(out, RaceOutcome::TimedOut);
        assert!(!out.is_completed());
    }

    #[test]
    fn test_loser_is_dropped() {
        let (tx, rx) = oneshot::channel::<()>();
        let (_keep, never) = oneshot::channel::<()>();
        let loser = async move {
            let _ = never.await;
            drop(tx);
        };
        // `tx` lives inside the losing future; dropping it cancels `rx`.
        block_on(race_with_timeout(loser, future::ready(())));
        assert!(block_on(rx).is_err());
    }

    #[test]
    fn test_first_of_returns_on_either_side() {
        block_on(first_of(future::pending::<()>(), future::ready(())));
        block_on(first_of(future::ready(()), future::pending::<()>()));
    }

    #[test]
    fn test_latch_fires_once() {
        let latch = Latch::new();
        assert!(!latch.has_fired());
        assert!(latch.fire());
        assert!(!latch.fire());
        assert!(latch.has_fired());
    }
}
