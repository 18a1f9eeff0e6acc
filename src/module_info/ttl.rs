//! Idle expiry
//!
//! One background task per entry sleeps until the entry's deadline. On wake
//! it re-reads the deadline: lookups push it forward, so the task goes back
//! to sleep until the entry has really been idle for a full TTL.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Stand-in for "never" when a TTL is too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// The instant `ttl` from now, capped at roughly thirty years out.
pub(crate) fn deadline_after(ttl: Duration) -> Instant {
    Instant::now() + ttl.min(FAR_FUTURE)
}

/// Something that expires once its deadline passes without being pushed back.
pub trait Expiring: Send + Sync + 'static {
    fn deadline(&self) -> Instant;

    fn expire(&self);
}

/// Spawns the expiry task for `target`.
///
/// The task ends when `target` expires, when `cancel` fires, or when the
/// target has been dropped.
pub fn spawn_expiry<T: Expiring>(
    runtime: &Handle,
    target: Weak<T>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        loop {
            let deadline = match target.upgrade() {
                Some(target) => target.deadline(),
                None => return,
            };

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep_until(deadline) => {}
            }

            let Some(entry) = target.upgrade() else {
                return;
            };
            if entry.deadline() <= Instant::now() {
                entry.expire();
                return;
            }
        }
    })
}
