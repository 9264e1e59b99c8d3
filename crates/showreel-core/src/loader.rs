//! Memoized loader for the remote player library.
//!
//! The fetch-and-attach happens at most once per page lifetime. Concurrent
//! callers share the same pending future, and a failure reaches every one of
//! them. A failed load stays memoized until [`PlayerAssetLoader::retry`].

use std::cell::{Cell, RefCell};

use futures::future::{self, FutureExt, LocalBoxFuture, Shared};

use crate::ShowreelResult;

/// The shared future every caller of [`PlayerAssetLoader::load`] receives.
pub type LoadFuture = Shared<LocalBoxFuture<'static, ShowreelResult<()>>>;

/// Fetches and attaches the player library's script and stylesheet.
pub trait AssetFetcher {
    /// True when the library's global is already installed on the page.
    fn is_present(&self) -> bool;

    /// Start fetching. Resolves once the script has loaded.
    fn fetch(&self) -> LocalBoxFuture<'static, ShowreelResult<()>>;
}

pub struct PlayerAssetLoader<F> {
    fetcher: F,
    pending: RefCell<Option<LoadFuture>>,
    fetches: Cell<u32>,
}

impl<F: AssetFetcher> PlayerAssetLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            pending: RefCell::new(None),
            fetches: Cell::new(0),
        }
    }

    /// Return the shared load future, starting the fetch on first use.
    pub fn load(&self) -> LoadFuture {
        if let Some(pending) = self.pending.borrow().as_ref() {
            return pending.clone();
        }
        let fut = if self.fetcher.is_present() {
            future::ready(Ok(())).boxed_local().shared()
        } else {
            self.fetches.set(self.fetches.get() + 1);
            tracing::debug!(attempt = self.fetches.get(), "fetching player library");
            self.fetcher.fetch().shared()
        };
        *self.pending.borrow_mut() = Some(fut.clone());
        fut
    }

    /// True once the library is usable.
    pub fn is_loaded(&self) -> bool {
        if self.fetcher.is_present() {
            return true;
        }
        matches!(
            self.pending.borrow().as_ref().and_then(|f| f.peek()),
            Some(Ok(()))
        )
    }

    /// True when the last load finished with an error.
    pub fn has_failed(&self) -> bool {
        matches!(
            self.pending.borrow().as_ref().and_then(|f| f.peek()),
            Some(Err(_))
        )
    }

    /// Forget a failed load so the next [`load`](Self::load) fetches again.
    /// Returns false and keeps state when the last load did not fail.
    pub fn retry(&self) -> bool {
        if !self.has_failed() {
            return false;
        }
        tracing::debug!("clearing failed player library load");
        self.pending.borrow_mut().take();
        true
    }

    /// Number of fetches actually started.
    pub fn fetch_count(&self) -> u32 {
        self.fetches.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShowreelError;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use std::rc::Rc;

    struct Fetcher {
        present: Cell<bool>,
        outcome: Rc<RefCell<Option<oneshot::Receiver<ShowreelResult<()>>>>>,
        fail_now: Cell<bool>,
    }

    impl Fetcher {
        fn new() -> Self {
            Self {
                present: Cell::new(false),
                outcome: Rc::new(RefCell::new(None)),
                fail_now: Cell::new(false),
            }
        }
    }

    impl AssetFetcher for Fetcher {
        fn is_present(&self) -> bool {
            self.present.get()
        }

        fn fetch(&self) -> LocalBoxFuture<'static, ShowreelResult<()>> {
            if self.fail_now.get() {
                return future::ready(Err(ShowreelError::asset_load("offline", "player.js")))
                    .boxed_local();
            }
            match self.outcome.borrow_mut().take() {
                Some(rx) => async move {
                    rx.await
                        .unwrap_or_else(|_| Err(ShowreelError::asset_load("dropped", "player.js")))
                }
                .boxed_local(),
                None => future::ready(Ok(())).boxed_local(),
            }
        }
    }

    #[test]
    fn test_present_global_resolves_without_fetch() {
        let fetcher = Fetcher::new();
        fetcher.present.set(true);
        let loader = PlayerAssetLoader::new(fetcher);
        assert!(block_on(loader.load()).is_ok());
        assert_eq!(loader.fetch_count(), 0);
        assert!(loader.is_loaded());
    }

    #[test]
    fn test_concurrent_callers_share_one_fetch() {
        let fetcher = Fetcher::new();
        let (tx, rx) = oneshot::channel();
        *fetcher.outcome.borrow_mut() = Some(rx);
        let loader = PlayerAssetLoader::new(fetcher);

        let a = loader.load();
        let b = loader.load();
        assert!(!loader.is_loaded());
        tx.send(Ok(())).unwrap();
        assert!(block_on(a).is_ok());
        assert!(block_on(b).is_ok());
        assert!(block_on(loader.load()).is_ok());
        assert_eq!(loader.fetch_count(), 1);
        assert!(loader.is_loaded());
    }

    #[test]
    fn test_failure_reaches_every_caller() {
        let fetcher = Fetcher::new();
        let (tx, rx) = oneshot::channel();
        *fetcher.outcome.borrow_mut() = Some(rx);
        let loader = PlayerAssetLoader::new(fetcher);

        let a = loader.load();
        let b = loader.load();
        tx.send(Err(ShowreelError::asset_load("404", "player.js")))
            .unwrap();
        let expected = Err(ShowreelError::asset_load("404", "player.js"));
        assert_eq!(block_on(a), expected);
        assert_eq!(block_on(b), expected);
        assert!(loader.has_failed());
        assert_eq!(block_on(loader.load()), expected);
        assert_eq!(loader.fetch_count(), 1);
    }

    #[test]
    fn test_retry_only_clears_failures() {
        let fetcher = Fetcher::new();
        fetcher.fail_now.set(true);
        let loader = PlayerAssetLoader::new(fetcher);
        assert!(!loader.retry());
        assert!(block_on(loader.load()).is_err());
        assert!(loader.retry());
        loader.fetcher.fail_now.set(false);
        assert!(block_on(loader.load()).is_ok());
        assert_eq!(loader.fetch_count(), 2);
        assert!(!loader.retry());
    }
}
