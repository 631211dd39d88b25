//! Shared RS-485 bus access coordination.
//!
//! Several sensor units hang off one two-wire bus behind a single serial
//! adapter, so only one Modbus transaction may be in flight per port at a
//! time, and the bus needs a short quiet period between transactions for the
//! transceivers to settle. [`BusRegistry`] hands out per-port guards that
//! enforce both.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::trace;

/// State of one bus, protected by the bus mutex.
#[derive(Debug, Default)]
struct BusSlot {
    /// When the bus was last released, if it has been held before.
    last_release: Option<Instant>,
}

/// Registry of shared serial buses, keyed by port path.
///
/// Buses are created lazily on first acquisition; two sensors configured for
/// the same port path always resolve to the same bus.
#[derive(Debug, Default)]
pub struct BusRegistry {
    buses: Mutex<HashMap<String, Arc<AsyncMutex<BusSlot>>>>,
}

impl BusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire exclusive access to the bus serving `port`.
    ///
    /// Waits until the current holder (if any) releases, then enforces the
    /// minimum spacing since the previous release before returning. The bus
    /// is held until the returned guard is dropped. Acquisition never fails;
    /// it can only block.
    pub async fn acquire(&self, port: &str, pre_delay: Duration) -> BusGuard {
        let bus = self.bus(port);
        let slot = bus.lock_owned().await;

        if let Some(last) = slot.last_release {
            let since = last.elapsed();
            if since < pre_delay {
                let wait = pre_delay - since;
                trace!(port, ?wait, "waiting for bus to settle");
                tokio::time::sleep(wait).await;
            }
        }

        BusGuard { slot }
    }

    /// Resolve the slot for `port`, creating it on first use.
    fn bus(&self, port: &str) -> Arc<AsyncMutex<BusSlot>> {
        let mut buses = self.buses.lock().unwrap_or_else(|e| e.into_inner());
        buses.entry(port.to_string()).or_default().clone()
    }
}

/// Exclusive hold on one bus.
///
/// Dropping the guard records the release time and frees the bus, so the
/// spacing clock starts on every exit path, panics included.
#[derive(Debug)]
pub struct BusGuard {
    slot: OwnedMutexGuard<BusSlot>,
}

impl Drop for BusGuard {
    fn drop(&mut self) {
        // Stamp before the mutex releases so the next holder sees it.
        self.slot.last_release = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const PORT: &str = "/dev/ttyUSB0";

    #[tokio::test(start_paused = true)]
    async fn test_exclusive_access() {
        let registry = Arc::new(BusRegistry::new());
        let active = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let registry = registry.clone();
            let active = active.clone();
            let overlapped = overlapped.clone();

            handles.push(tokio::spawn(async move {
                for _ in 0..3 {
                    let _guard = registry.acquire(PORT, Duration::from_millis(30)).await;
                    if active.fetch_add(1, Ordering::SeqCst) != 0 {
                        overlapped.store(true, Ordering::SeqCst);
                    }
                    // Simulate a transaction while holding the bus.
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(!overlapped.load(Ordering::SeqCst), "two holders overlapped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_minimum_spacing_between_transactions() {
        let registry = BusRegistry::new();
        let pre_delay = Duration::from_millis(30);

        drop(registry.acquire(PORT, pre_delay).await);
        let released = Instant::now();

        let _guard = registry.acquire(PORT, pre_delay).await;
        assert_eq!(released.elapsed(), pre_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_acquisition_has_no_delay() {
        let registry = BusRegistry::new();

        let start = Instant::now();
        let _guard = registry.acquire(PORT, Duration::from_millis(30)).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_measured_from_release() {
        let registry = BusRegistry::new();
        let pre_delay = Duration::from_millis(30);

        let start = Instant::now();
        {
            let _guard = registry.acquire(PORT, pre_delay).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let _guard = registry.acquire(PORT, pre_delay).await;
        // 50ms hold, then the full quiet period counted from the release.
        assert_eq!(start.elapsed(), Duration::from_millis(80));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_bus_needs_no_wait() {
        let registry = BusRegistry::new();
        let pre_delay = Duration::from_millis(30);

        drop(registry.acquire(PORT, pre_delay).await);
        tokio::time::sleep(Duration::from_millis(40)).await;

        let start = Instant::now();
        let _guard = registry.acquire(PORT, pre_delay).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ports_are_independent() {
        let registry = BusRegistry::new();

        let _first = registry.acquire("/dev/ttyUSB0", Duration::from_millis(30)).await;

        // A different port is a different bus; no blocking, no spacing.
        let start = Instant::now();
        let _second = registry.acquire("/dev/ttyUSB1", Duration::from_millis(30)).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_proceeds_after_release() {
        let registry = Arc::new(BusRegistry::new());
        let guard = registry.acquire(PORT, Duration::ZERO).await;

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _guard = registry.acquire(PORT, Duration::ZERO).await;
            })
        };

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!waiter.is_finished(), "waiter ran while the bus was held");

        drop(guard);
        waiter.await.unwrap();
    }
}
