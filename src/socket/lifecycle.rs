use std::{fmt, sync::Arc};

use log::debug;
use thiserror::Error;

use crate::pool::PoolEntry;

use super::Socket;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("attempting to reacquire a socket owned by {owner}")]
    AlreadyAcquired { owner: String },
    #[error("socket is not attached to a pool entry")]
    NotAcquired,
}

/// Who a socket belongs to right now.
#[derive(Default)]
pub(crate) enum Lifecycle {
    /// Sitting in a pool's cache, or detached.
    #[default]
    Idle,
    /// Handed out by `pool`; `im_done` returns it.
    Acquired(Arc<dyn PoolEntry>),
    /// Handed out by `pool` and pinned; only `recycle` returns it.
    Reserved(Arc<dyn PoolEntry>),
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Idle => write!(f, "Idle"),
            Lifecycle::Acquired(pool) => write!(f, "Acquired({})", pool.address()),
            Lifecycle::Reserved(pool) => write!(f, "Reserved({})", pool.address()),
        }
    }
}

impl Lifecycle {
    pub fn acquire(&mut self, pool: Arc<dyn PoolEntry>) -> Result<(), LifecycleError> {
        match self {
            Lifecycle::Idle => {
                *self = Lifecycle::Acquired(pool);
                Ok(())
            }
            Lifecycle::Acquired(owner) | Lifecycle::Reserved(owner) => {
                Err(LifecycleError::AlreadyAcquired {
                    owner: owner.address().to_string(),
                })
            }
        }
    }

    pub fn reserve(&mut self) -> Result<(), LifecycleError> {
        match std::mem::take(self) {
            Lifecycle::Idle => Err(LifecycleError::NotAcquired),
            Lifecycle::Acquired(pool) | Lifecycle::Reserved(pool) => {
                *self = Lifecycle::Reserved(pool);
                Ok(())
            }
        }
    }

    /// Detaches from the owner and returns it, unless the socket is reserved and
    /// `force` is unset, in which case nothing changes and `None` is returned.
    pub fn release(&mut self, force: bool) -> Result<Option<Arc<dyn PoolEntry>>, LifecycleError> {
        match std::mem::take(self) {
            Lifecycle::Idle => Err(LifecycleError::NotAcquired),
            Lifecycle::Reserved(pool) if !force => {
                *self = Lifecycle::Reserved(pool);
                Ok(None)
            }
            Lifecycle::Acquired(pool) | Lifecycle::Reserved(pool) => Ok(Some(pool)),
        }
    }
}

impl Socket {
    /// Attaches the socket to `pool`, right after connecting or when it is handed out
    /// again after being recycled.
    ///
    /// # Panics
    /// If the socket already has an owner. That means the pool handed out a socket it
    /// did not hold.
    pub fn acquired(&self, pool: Arc<dyn PoolEntry>) {
        if let Err(err) = self.try_acquired(pool) {
            panic!("{err}");
        }
    }

    /// Like [`Socket::acquired`], but reports a second acquisition instead of panicking.
    /// The existing owner is kept.
    pub fn try_acquired(&self, pool: Arc<dyn PoolEntry>) -> Result<(), LifecycleError> {
        self.state().lifecycle.acquire(pool)
    }

    /// Pins the socket so that [`Socket::im_done`] keeps it out of the pool's cache.
    pub fn reserve(&self) -> Result<(), LifecycleError> {
        self.state().lifecycle.reserve()
    }

    /// Returns the socket to its pool unless it is reserved.
    pub fn im_done(self: &Arc<Self>) -> Result<(), LifecycleError> {
        self.release(false)
    }

    /// Returns the socket to its pool, reserved or not.
    pub fn recycle(self: &Arc<Self>) -> Result<(), LifecycleError> {
        self.release(true)
    }

    pub fn is_acquired(&self) -> bool {
        !matches!(self.state().lifecycle, Lifecycle::Idle)
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self.state().lifecycle, Lifecycle::Reserved(_))
    }

    fn release(self: &Arc<Self>, force: bool) -> Result<(), LifecycleError> {
        let owner = self.state().lifecycle.release(force)?;
        if let Some(pool) = owner {
            debug!("recycling socket to {}", pool.address());
            pool.recycle_socket(Arc::clone(self));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::socket::testing::{RecordingPool, connected};

    use super::*;

    #[test]
    fn starts_acquired_by_creating_pool() {
        let pool = RecordingPool::new("a");
        let (socket, _server) = connected(pool.clone());

        assert!(socket.is_acquired());
        assert!(!socket.is_reserved());
        assert_eq!(pool.recycled(), 0);
    }

    #[test]
    fn im_done_returns_unreserved_socket() {
        let pool = RecordingPool::new("a");
        let (socket, _server) = connected(pool.clone());

        socket.im_done().unwrap();
        assert_eq!(pool.recycled(), 1);
        assert!(!socket.is_acquired());
    }

    #[test]
    fn im_done_keeps_reserved_socket() {
        let pool = RecordingPool::new("a");
        let (socket, _server) = connected(pool.clone());

        socket.reserve().unwrap();
        socket.im_done().unwrap();
        assert_eq!(pool.recycled(), 0);
        assert!(socket.is_reserved());

        socket.recycle().unwrap();
        assert_eq!(pool.recycled(), 1);
        assert!(!socket.is_reserved());
        assert!(!socket.is_acquired());
    }

    #[test]
    fn recycle_ignores_reservation_state() {
        let pool = RecordingPool::new("a");
        let (socket, _server) = connected(pool.clone());

        socket.recycle().unwrap();
        assert_eq!(pool.recycled(), 1);

        socket.acquired(pool.clone());
        socket.recycle().unwrap();
        assert_eq!(pool.recycled(), 2);
    }

    #[test]
    fn release_clears_reservation() {
        let pool = RecordingPool::new("a");
        let (socket, _server) = connected(pool.clone());

        socket.reserve().unwrap();
        socket.recycle().unwrap();
        socket.acquired(pool.clone());

        // a fresh acquisition is not pinned
        socket.im_done().unwrap();
        assert_eq!(pool.recycled(), 2);
    }

    #[test]
    fn reacquire_keeps_original_owner() {
        let first = RecordingPool::new("first");
        let second = RecordingPool::new("second");
        let (socket, _server) = connected(first.clone());

        let err = socket.try_acquired(second.clone()).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::AlreadyAcquired {
                owner: "first".into()
            }
        );

        socket.recycle().unwrap();
        assert_eq!(first.recycled(), 1);
        assert_eq!(second.recycled(), 0);
    }

    #[test]
    #[should_panic(expected = "attempting to reacquire a socket owned by a")]
    fn reacquire_panics() {
        let pool = RecordingPool::new("a");
        let (socket, _server) = connected(pool.clone());

        socket.acquired(pool);
    }

    #[test]
    fn idle_socket_cannot_be_released_or_reserved() {
        let pool = RecordingPool::new("a");
        let (socket, _server) = connected(pool.clone());
        socket.recycle().unwrap();

        assert_eq!(socket.im_done(), Err(LifecycleError::NotAcquired));
        assert_eq!(socket.recycle(), Err(LifecycleError::NotAcquired));
        assert_eq!(socket.reserve(), Err(LifecycleError::NotAcquired));
        assert_eq!(pool.recycled(), 1);
    }
}
