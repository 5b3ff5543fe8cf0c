//! The pending-request registry shared by both channels.
//!
//! Callers register an id before writing their frame; the dispatcher
//! resolves the matching entry when the reply arrives, regardless of order.
//! An entry lives until it is resolved or its handle is dropped, whichever
//! comes first, so a timed-out caller cleans up after itself and a late
//! reply for a cancelled id finds nothing to resolve.
//!
//! Id generation differs per channel on purpose: websocket req_ids count up
//! from the wall-clock second (a restarted process starts far from its
//! predecessor's range), while BLCP correlation ids are drawn at random
//! (stale ids surviving a reconnect cannot collide with a resettable
//! counter).

use crate::{Error, Result, TransportError};
use log::*;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::oneshot;

type PendingMap<T> = Mutex<BTreeMap<u64, oneshot::Sender<T>>>;

const DEFAULT_CAPACITY: usize = 1024;

/// Milliseconds since the unix epoch
pub(crate) fn unix_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// A 63-bit random correlation id for the BLCP channel
pub(crate) fn random_correlation_id() -> u64 {
    rand::thread_rng().gen::<u64>() >> 1
}

/// Monotone websocket req_id source, seeded from wall-clock seconds
pub(crate) struct ReqIdGen {
    next: AtomicU64,
}

impl ReqIdGen {
    pub(crate) fn new() -> Self {
        let seed = time::OffsetDateTime::now_utc().unix_timestamp() as u64;
        Self {
            next: AtomicU64::new(seed),
        }
    }

    pub(crate) fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// The registry itself. Cheap to share; the map lock is held only for
/// insert/remove so the dispatcher is never blocked behind a slow caller.
pub(crate) struct Correlator<T> {
    pending: Arc<PendingMap<T>>,
    capacity: usize,
}

impl<T> Correlator<T> {
    pub(crate) fn new() -> Self {
        Self {
            pending: Default::default(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Registers `id` and returns the handle the caller awaits.
    ///
    /// A stale entry whose waiter has gone away is displaced; a live
    /// duplicate is refused.
    pub(crate) fn register(&self, id: u64) -> Result<PendingReply<T>> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().unwrap();
        if pending.len() >= self.capacity {
            return Err(Error::Transport(TransportError::Saturated));
        }
        match pending.entry(id) {
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(tx);
            }
            std::collections::btree_map::Entry::Occupied(mut entry) => {
                if entry.get().is_closed() {
                    entry.insert(tx);
                } else {
                    return Err(Error::Protocol(crate::ProtocolError::UnexpectedReply(
                        "correlation id already in flight",
                    )));
                }
            }
        }
        drop(pending);
        Ok(PendingReply {
            id,
            rx,
            pending: Arc::downgrade(&self.pending),
        })
    }

    /// Resolves `id` with `value`.
    ///
    /// Returns the value back when no entry matched (an unsolicited or
    /// server-pushed frame); duplicate, late and cancelled ids are a no-op.
    pub(crate) fn set_done(&self, id: u64, value: T) -> Option<T> {
        let tx = self.pending.lock().unwrap().remove(&id);
        match tx {
            Some(tx) => {
                if tx.send(value).is_err() {
                    // Waiter raced us to cancellation; the reply is dropped
                    trace!("Reply for {} arrived after its waiter left", id);
                }
                None
            }
            None => Some(value),
        }
    }

    /// Drops every pending entry; their waiters observe a closed connection
    pub(crate) fn release_all(&self) {
        let dropped = std::mem::take(&mut *self.pending.lock().unwrap());
        if !dropped.is_empty() {
            debug!("Releasing {} pending requests", dropped.len());
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

/// The caller's half of a registered request.
///
/// Dropping the handle (on timeout or cancellation) removes the entry,
/// and only this entry; the shared connection is untouched.
pub(crate) struct PendingReply<T> {
    id: u64,
    rx: oneshot::Receiver<T>,
    pending: Weak<PendingMap<T>>,
}

impl<T> PendingReply<T> {
    /// Waits for the reply up to `read_timeout`
    pub(crate) async fn read(mut self, read_timeout: Duration) -> Result<T> {
        match tokio::time::timeout(read_timeout, &mut self.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(Error::Transport(TransportError::ConnectionClosed)),
            Err(_) => Err(Error::Timeout),
        }
    }
}

impl<T> Drop for PendingReply<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.upgrade() {
            pending.lock().unwrap().remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_register_and_resolve() {
        let correlator: Correlator<u32> = Correlator::new();
        let reply = correlator.register(7).unwrap();
        assert_eq!(correlator.set_done(7, 99), None);
        assert_eq!(reply.read(Duration::from_secs(1)).await.unwrap(), 99);
        assert_eq!(correlator.len(), 0);
    }

    #[tokio::test]
    async fn test_set_done_unknown_id_is_noop() {
        let correlator: Correlator<u32> = Correlator::new();
        // Hands the value back instead of raising
        assert_eq!(correlator.set_done(1234, 5), Some(5));
    }

    #[tokio::test]
    async fn test_cancelled_entry_is_not_resolved_late() {
        let correlator: Correlator<u32> = Correlator::new();
        let reply = correlator.register(8).unwrap();
        drop(reply);
        assert_eq!(correlator.len(), 0);
        // The late reply must not resolve anything
        assert_eq!(correlator.set_done(8, 1), Some(1));
    }

    #[tokio::test]
    async fn test_timeout_removes_only_own_entry() {
        let correlator: Correlator<u32> = Correlator::new();
        let fast = correlator.register(1).unwrap();
        let slow = correlator.register(2).unwrap();
        assert_matches!(
            slow.read(Duration::from_millis(10)).await,
            Err(Error::Timeout)
        );
        assert_eq!(correlator.len(), 1);
        correlator.set_done(1, 10);
        assert_eq!(fast.read(Duration::from_secs(1)).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_release_all_cancels_waiters() {
        let correlator: Correlator<u32> = Correlator::new();
        let reply = correlator.register(3).unwrap();
        correlator.release_all();
        assert_matches!(
            reply.read(Duration::from_secs(1)).await,
            Err(Error::Transport(TransportError::ConnectionClosed))
        );
    }

    #[tokio::test]
    async fn test_duplicate_live_id_is_refused() {
        let correlator: Correlator<u32> = Correlator::new();
        let _held = correlator.register(4).unwrap();
        assert!(correlator.register(4).is_err());
    }

    #[test]
    fn test_req_id_gen_is_monotone() {
        let ids = ReqIdGen::new();
        let first = ids.next();
        assert_eq!(ids.next(), first + 1);
        // Seeded from the clock, not from zero
        assert!(first > 1_600_000_000);
    }

    #[test]
    fn test_correlation_id_fits_63_bits() {
        for _ in 0..1000 {
            assert!(random_correlation_id() <= i64::MAX as u64);
        }
    }
}
