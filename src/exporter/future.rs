//! Completion tracking for one scrape cycle
//!
//! Every unit of per-instance work is registered with [`ScrapeFuture::add`]
//! before it starts and reported exactly once with [`ScrapeFuture::done`].
//! Units may be added while others are still running; [`ScrapeFuture::wait`]
//! returns once the outstanding count drops to zero.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::discovery::Instance;
use crate::utils::ScrapeError;

/// Identity of one instance's pipeline within a cycle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FutureKey {
    pub addr: String,
    pub alias: String,
}

impl FutureKey {
    pub fn new(addr: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            alias: alias.into(),
        }
    }
}

impl From<&Instance> for FutureKey {
    fn from(instance: &Instance) -> Self {
        Self::new(instance.addr.as_str(), instance.alias.as_str())
    }
}

#[derive(Default)]
struct State {
    outstanding: usize,
    results: HashMap<FutureKey, Option<ScrapeError>>,
}

/// Clonable handle; all clones share one counter and result table
#[derive(Clone, Default)]
pub struct ScrapeFuture {
    inner: Arc<(Mutex<State>, Condvar)>,
}

impl ScrapeFuture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one outstanding unit
    pub fn add(&self) {
        self.inner.0.lock().outstanding += 1;
    }

    /// Report one unit. Failures for the same key are merged.
    pub fn done(&self, key: FutureKey, result: Result<(), ScrapeError>) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock();

        let slot = state.results.entry(key).or_insert(None);
        *slot = match (slot.take(), result) {
            (None, Ok(())) => None,
            (None, Err(e)) | (Some(e), Ok(())) => Some(e),
            (Some(prev), Err(e)) => Some(prev.merge(e)),
        };

        state.outstanding = state.outstanding.saturating_sub(1);
        if state.outstanding == 0 {
            cvar.notify_all();
        }
    }

    /// Block until every registered unit is reported, then take the results
    pub fn wait(&self) -> HashMap<FutureKey, Option<ScrapeError>> {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock();
        while state.outstanding > 0 {
            cvar.wait(&mut state);
        }
        mem::take(&mut state.results)
    }
}

/// The units one instance still owes a [`ScrapeFuture`].
///
/// Dropping the handle with units outstanding (a panicking scrape) reports
/// them as failed, so `wait` never blocks on a unit that cannot finish.
pub struct InstanceUnits<'a> {
    future: &'a ScrapeFuture,
    key: FutureKey,
    remaining: usize,
}

impl<'a> InstanceUnits<'a> {
    /// Take over one unit already registered with `future.add()`
    pub fn adopt(future: &'a ScrapeFuture, key: FutureKey) -> Self {
        Self {
            future,
            key,
            remaining: 1,
        }
    }

    pub fn add(&mut self) {
        self.future.add();
        self.remaining += 1;
    }

    pub fn done(&mut self, result: Result<(), ScrapeError>) {
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        self.future.done(self.key.clone(), result);
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Fail every outstanding unit with one error
    pub fn abandon(&mut self, error: ScrapeError) {
        if self.remaining == 0 {
            return;
        }
        self.done(Err(error));
        while self.remaining > 0 {
            self.done(Ok(()));
        }
    }
}

impl Drop for InstanceUnits<'_> {
    fn drop(&mut self) {
        self.abandon(ScrapeError::Panicked("scrape aborted".to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{ClientError, ConnectionError};
    use std::thread;
    use std::time::Duration;

    fn server_error(msg: &str) -> ScrapeError {
        ScrapeError::Client(ClientError::Server(msg.to_string()))
    }

    #[test]
    fn test_dropped_units_are_reported_failed() {
        let fut = ScrapeFuture::new();
        let key = FutureKey::new("10.0.0.1:9221", "a");
        fut.add();

        let worker = fut.clone();
        let worker_key = key.clone();
        let joined = thread::spawn(move || {
            let mut units = InstanceUnits::adopt(&worker, worker_key);
            units.add();
            units.add();
            units.done(Ok(()));
            panic!("collector bug");
        })
        .join();
        assert!(joined.is_err());

        let results = fut.wait();
        match &results[&key] {
            Some(ScrapeError::Panicked(msg)) => assert_eq!(msg, "scrape aborted"),
            other => panic!("expected Panicked, got {:?}", other),
        }
    }

    #[test]
    fn test_abandon_reports_one_error() {
        let fut = ScrapeFuture::new();
        let key = FutureKey::new("10.0.0.1:9221", "a");
        fut.add();
        let mut units = InstanceUnits::adopt(&fut, key.clone());
        units.add();
        units.abandon(ScrapeError::Panicked("boom".to_string()));
        assert_eq!(units.remaining(), 0);
        drop(units);

        let results = fut.wait();
        assert!(matches!(&results[&key], Some(ScrapeError::Panicked(msg)) if msg == "boom"));
    }

    #[test]
    fn test_wait_without_units_returns_immediately() {
        assert!(ScrapeFuture::new().wait().is_empty());
    }

    #[test]
    fn test_results_merge_per_key() {
        let fut = ScrapeFuture::new();
        let a = FutureKey::new("10.0.0.1:9221", "a");
        let b = FutureKey::new("10.0.0.2:9221", "b");
        let c = FutureKey::new("10.0.0.3:9221", "c");

        for _ in 0..6 {
            fut.add();
        }
        fut.done(a.clone(), Ok(()));
        fut.done(a.clone(), Ok(()));
        fut.done(b.clone(), Ok(()));
        fut.done(b.clone(), Err(server_error("ERR one")));
        fut.done(c.clone(), Err(server_error("ERR one")));
        fut.done(c.clone(), Err(server_error("ERR two")));

        let results = fut.wait();
        assert_eq!(results.len(), 3);
        assert!(results[&a].is_none());
        assert!(matches!(results[&b], Some(ScrapeError::Client(_))));
        match &results[&c] {
            Some(ScrapeError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected Multiple, got {:?}", other),
        }
    }

    #[test]
    fn test_units_added_while_running() {
        let fut = ScrapeFuture::new();
        fut.add();

        let worker = {
            let fut = fut.clone();
            thread::spawn(move || {
                let key = FutureKey::new("127.0.0.1:9221", "main");
                // register follow-up work before finishing the first unit
                fut.add();
                fut.add();
                fut.done(key.clone(), Ok(()));
                thread::sleep(Duration::from_millis(20));
                fut.done(key.clone(), Ok(()));
                fut.done(
                    key,
                    Err(ScrapeError::Connect(ConnectionError::InvalidAddress("x".into()))),
                );
            })
        };

        let results = fut.wait();
        worker.join().unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.values().all(|r| r.is_some()));
    }

    #[test]
    fn test_wait_drains_results() {
        let fut = ScrapeFuture::new();
        fut.add();
        fut.done(FutureKey::new("a", ""), Ok(()));
        assert_eq!(fut.wait().len(), 1);
        assert!(fut.wait().is_empty());
    }
}
