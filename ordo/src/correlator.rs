//! Correlation of asynchronous replies with outstanding requests.
//!
//! A [`RequestCorrelator`] keeps one pending [`Promise`] per request
//! identifier. Whoever receives the reply settles it by identifier; an
//! optional per-request timer fails it with [`Error::Timeout`] if no reply
//! arrives in time. Completion, failure, cancellation and expiry all go
//! through a single removal under the table lock, so exactly one of them
//! settles a given registration.

use crate::error::{Error, Result};
use crate::promise::{self, Promise, Resolver};
use crate::time::{Timer, TimerHandle};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

/// Table of pending requests keyed by identifier.
///
/// # Examples
///
/// ```rust
/// use ordo::RequestCorrelator;
/// use std::time::Duration;
///
/// let correlator = RequestCorrelator::<u32, String>::new(Some(Duration::from_secs(5)));
///
/// let reply = correlator.register(7).unwrap();
/// assert!(correlator.complete(&7, "pong".to_string()));
///
/// assert_eq!(reply.wait().unwrap(), "pong");
/// ```
pub struct RequestCorrelator<K, V> {
    table: Arc<Mutex<Table<K, V>>>,
    timer: Arc<Timer>,

    /// Timeout applied by [`register`](Self::register).
    default_timeout: Option<Duration>,
}

struct Table<K, V> {
    entries: HashMap<K, Entry<V>>,

    /// Stamped on each registration so that a timer armed for an earlier
    /// registration of the same identifier never removes a later one.
    generation: u64,
}

struct Entry<V> {
    generation: u64,
    resolver: Resolver<V>,
    timer: Option<TimerHandle>,
}

impl<V> Entry<V> {
    /// Disarms the timer, then hands back the resolver.
    fn into_resolver(self) -> Resolver<V> {
        if let Some(timer) = self.timer {
            timer.cancel();
        }
        self.resolver
    }
}

impl<K, V> RequestCorrelator<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: Send + 'static,
{
    /// Creates a correlator using the global timer.
    ///
    /// `default_timeout` applies to [`register`](Self::register); `None`
    /// lets requests wait forever.
    pub fn new(default_timeout: Option<Duration>) -> Self {
        Self::with_timer(Timer::global(), default_timeout)
    }

    /// Creates a correlator arming its timeouts on `timer`.
    pub fn with_timer(timer: Arc<Timer>, default_timeout: Option<Duration>) -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                entries: HashMap::new(),
                generation: 0,
            })),
            timer,
            default_timeout,
        }
    }

    /// Registers `id` with the default timeout.
    pub fn register(&self, id: K) -> Result<Promise<V>> {
        self.register_with_timeout(id, self.default_timeout)
    }

    /// Registers `id` and returns the promise its reply will settle.
    ///
    /// With `Some(timeout)`, the promise fails with [`Error::Timeout`] if
    /// it is still pending once `timeout` has elapsed. Fails with
    /// [`Error::DuplicateRequest`] while `id` is already pending.
    pub fn register_with_timeout(&self, id: K, timeout: Option<Duration>) -> Result<Promise<V>> {
        let (resolver, promise) = promise::pair();

        let generation = {
            let mut table = self.table.lock();

            if table.entries.contains_key(&id) {
                return Err(Error::DuplicateRequest(format!("{id:?}")));
            }

            table.generation += 1;
            let generation = table.generation;

            table.entries.insert(
                id.clone(),
                Entry {
                    generation,
                    resolver,
                    timer: None,
                },
            );

            generation
        };

        if let Some(timeout) = timeout {
            self.arm(id, generation, timeout);
        }

        Ok(promise)
    }

    /// Arms the timeout of a registration, with the table lock released.
    fn arm(&self, id: K, generation: u64, timeout: Duration) {
        let table = Arc::downgrade(&self.table);
        let key = id.clone();

        let handle = self
            .timer
            .schedule(timeout, move || expire(&table, key, generation, timeout));

        let stale = {
            let mut table = self.table.lock();

            match table.entries.get_mut(&id) {
                Some(entry) if entry.generation == generation => {
                    entry.timer = Some(handle);
                    None
                }

                // Settled before the timer could be attached.
                _ => Some(handle),
            }
        };

        if let Some(handle) = stale {
            handle.cancel();
        }
    }

    /// Settles the request `id` with `value`.
    ///
    /// Returns `false` if no such request is pending, typically because it
    /// already timed out.
    pub fn complete(&self, id: &K, value: V) -> bool {
        match self.take(id) {
            Some(resolver) => resolver.succeed(value),
            None => {
                warn!(id = ?id, "completion for an unknown request");
                false
            }
        }
    }

    /// Fails the request `id` with `error`.
    pub fn fail(&self, id: &K, error: Error) -> bool {
        match self.take(id) {
            Some(resolver) => resolver.fail(error),
            None => {
                warn!(id = ?id, %error, "failure for an unknown request");
                false
            }
        }
    }

    /// Cancels the request `id`.
    pub fn cancel(&self, id: &K) -> bool {
        self.take(id).is_some_and(|resolver| resolver.cancel())
    }

    /// Cancels every pending request and returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let entries: Vec<_> = self.table.lock().entries.drain().collect();
        let count = entries.len();

        for (_, entry) in entries {
            entry.into_resolver().cancel();
        }

        if count > 0 {
            debug!(count, "cancelled pending requests");
        }

        count
    }

    /// Snapshot of the pending identifiers, in no particular order.
    pub fn pending(&self) -> Vec<K> {
        self.table.lock().entries.keys().cloned().collect()
    }

    /// Returns `true` if `id` is pending.
    pub fn contains(&self, id: &K) -> bool {
        self.table.lock().entries.contains_key(id)
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    /// Returns `true` if no request is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, id: &K) -> Option<Resolver<V>> {
        let entry = self.table.lock().entries.remove(id)?;
        Some(entry.into_resolver())
    }
}

/// Timer callback of a registration.
fn expire<K, V>(table: &Weak<Mutex<Table<K, V>>>, id: K, generation: u64, timeout: Duration)
where
    K: Eq + Hash + Debug,
{
    let Some(table) = table.upgrade() else {
        return;
    };

    let entry = {
        let mut table = table.lock();
        let current = table
            .entries
            .get(&id)
            .is_some_and(|entry| entry.generation == generation);

        if current { table.entries.remove(&id) } else { None }
    };

    if let Some(entry) = entry {
        debug!(id = ?id, ?timeout, "request expired");

        entry
            .resolver
            .fail(Error::Timeout(format!("request {id:?} timed out after {timeout:?}")));
    }
}

impl<K, V> Default for RequestCorrelator<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: Send + 'static,
{
    fn default() -> Self {
        Self::new(None)
    }
}

impl<K, V> fmt::Debug for RequestCorrelator<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCorrelator")
            .field("pending", &self.table.lock().entries.len())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
