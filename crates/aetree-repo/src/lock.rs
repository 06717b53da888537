//! The commit lock.
//!
//! Advancing the head is guarded by [`LOCK_REF`], a reference distinct from
//! the head itself. Acquiring means creating it exclusively; while another
//! writer holds it, acquisition sleeps and retries per [`LockPolicy`]. The
//! guard deletes the ref when dropped, on every exit path.

use std::sync::Arc;
use std::time::Instant;

use aetree_refs::{Ref, RefError, RefStore, LOCK_REF};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::LockPolicy;
use crate::error::{RepoError, RepoResult};

/// Proof that this writer holds the commit lock.
pub struct HeadLock {
    refs: Arc<dyn RefStore>,
    token: String,
    released: bool,
}

impl std::fmt::Debug for HeadLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadLock")
            .field("token", &self.token)
            .field("released", &self.released)
            .finish()
    }
}

impl HeadLock {
    /// Create the lock ref, retrying per `policy` while someone else holds it.
    pub fn acquire(refs: Arc<dyn RefStore>, policy: &LockPolicy) -> RepoResult<Self> {
        let token = Uuid::now_v7().to_string();
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match refs.create_ref(LOCK_REF, &Ref::lock(token.clone())) {
                Ok(()) => {
                    debug!(token = %token, attempts, "acquired commit lock");
                    return Ok(Self {
                        refs,
                        token,
                        released: false,
                    });
                }
                Err(RefError::AlreadyExists { .. }) => {}
                Err(e) => return Err(e.into()),
            }

            let out_of_attempts = policy.max_attempts.is_some_and(|max| attempts >= max);
            let out_of_time = policy.timeout().is_some_and(|t| started.elapsed() >= t);
            if out_of_attempts || out_of_time {
                warn!(attempts, "gave up waiting for commit lock");
                return Err(RepoError::LockTimeout { attempts });
            }
            debug!(attempts, "commit lock busy, retrying");
            std::thread::sleep(policy.next_delay());
        }
    }

    /// Unique holder id stored in the lock ref.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Release now and report failures; dropping the guard releases silently.
    pub fn release(mut self) -> RepoResult<()> {
        self.released = true;
        Self::delete_if_held(self.refs.as_ref(), &self.token)
    }

    /// Delete the lock ref if it still names `token`.
    ///
    /// The check and the delete are two separate ref operations. If the
    /// lock is force-removed and another writer acquires it between them,
    /// that writer's lock is deleted. Forced unlocks are therefore only
    /// safe while no writer is running.
    fn delete_if_held(refs: &dyn RefStore, token: &str) -> RepoResult<()> {
        match refs.read_ref(LOCK_REF)? {
            Some(current) if current.lock_holder() == Some(token) => {
                refs.delete_ref(LOCK_REF)?;
                debug!(token = %token, "released commit lock");
            }
            Some(_) => warn!(token = %token, "commit lock was taken over by another holder"),
            None => warn!(token = %token, "commit lock vanished before release"),
        }
        Ok(())
    }
}

impl Drop for HeadLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = Self::delete_if_held(self.refs.as_ref(), &self.token) {
            warn!(error = %e, "failed to release commit lock");
        }
    }
}
