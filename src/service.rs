//! Service-side replay defense.
//!
//! An acceptor records every authenticator it accepts, keyed by client
//! principal and the client's microsecond timestamp. Presenting the same
//! `(cname, ctime+cusec, sname)` tuple again within the cache window is a
//! replay. A background task sweeps entries older than the window.

use crate::crypto::KrbKey;
use crate::proto::{Authenticator, Name};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct ReplayEntry {
    presented_time: SystemTime,
    sname: Name,
    #[allow(dead_code)]
    client_time: SystemTime,
}

#[derive(Debug, Default)]
struct ClientEntries {
    replay: HashMap<SystemTime, ReplayEntry>,
    seq_number: Option<u32>,
    sub_key: Option<KrbKey>,
}

/// The replay cache. Cheap to clone; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct ReplayCache {
    entries: Arc<RwLock<HashMap<String, ClientEntries>>>,
}

impl ReplayCache {
    pub fn new() -> Self {
        ReplayCache::default()
    }

    /// Record an accepted authenticator for its client principal,
    /// stamping the present time and refreshing the client's last sequence
    /// number and sub-session key.
    pub fn add_entry(&self, sname: &Name, authenticator: &Authenticator) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Self::insert_locked(&mut entries, sname, authenticator);
    }

    fn insert_locked(
        entries: &mut HashMap<String, ClientEntries>,
        sname: &Name,
        authenticator: &Authenticator,
    ) {
        let client_time = authenticator.client_time();
        let client = entries
            .entry(authenticator.cname.principal_string())
            .or_default();
        client.replay.insert(
            client_time,
            ReplayEntry {
                presented_time: SystemTime::now(),
                sname: sname.clone(),
                client_time,
            },
        );
        client.seq_number = authenticator.seq_number;
        client.sub_key = authenticator.subkey.clone();
    }

    /// Replay test: true when an authenticator with the same client name,
    /// client time and service name has been seen already. Otherwise the
    /// authenticator is recorded (within the same exclusive section, so a
    /// racing identical call observes it) and false is returned.
    pub fn is_replay(&self, sname: &Name, authenticator: &Authenticator) -> bool {
        let client_time = authenticator.client_time();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        let seen = entries
            .get(&authenticator.cname.principal_string())
            .and_then(|client| client.replay.get(&client_time))
            .is_some_and(|entry| entry.sname == *sname);
        if seen {
            debug!(cname = %authenticator.cname, "authenticator replay detected");
            return true;
        }

        Self::insert_locked(&mut entries, sname, authenticator);
        false
    }

    /// Drop entries presented longer than `window` ago, and client records
    /// that became empty.
    pub fn clear_old(&self, window: Duration) {
        let now = SystemTime::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, client| {
            client.replay.retain(|_, entry| {
                now.duration_since(entry.presented_time)
                    .map(|age| age <= window)
                    .unwrap_or(true)
            });
            !client.replay.is_empty()
        });
        trace!(clients = entries.len(), "replay cache swept");
    }

    /// Spawn the periodic eviction task, sweeping at the window cadence.
    /// The task stops when the returned handle is stopped or dropped.
    pub fn spawn_eviction(&self, window: Duration) -> EvictionTask {
        let cache = self.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = std::thread::spawn(move || {
            // Wake in small steps so teardown is prompt even with long
            // windows.
            let tick = window.min(Duration::from_millis(250));
            let mut elapsed = Duration::ZERO;
            loop {
                std::thread::sleep(tick);
                if stop_flag.load(Ordering::Relaxed) {
                    return;
                }
                elapsed += tick;
                if elapsed >= window {
                    cache.clear_old(window);
                    elapsed = Duration::ZERO;
                }
            }
        });

        EvictionTask {
            stop,
            handle: Some(handle),
        }
    }
}

/// Owns the background eviction thread of a [`ReplayCache`].
#[derive(Debug)]
pub struct EvictionTask {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EvictionTask {
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EvictionTask {
    fn drop(&mut self) {
        self.stop_inner();
    }
}

/// The process-wide replay cache, created on first use together with its
/// eviction task. Every call returns the same instance; the window only
/// takes effect on the first call. Services that want an owned lifecycle
/// construct a [`ReplayCache`] directly instead.
pub fn shared_replay_cache(window: Duration) -> &'static ReplayCache {
    static CACHE: OnceLock<ReplayCache> = OnceLock::new();
    CACHE.get_or_init(|| {
        let cache = ReplayCache::new();
        let task = cache.spawn_eviction(window);
        // The shared cache lives for the process; so does its sweeper.
        std::mem::forget(task);
        cache
    })
}
