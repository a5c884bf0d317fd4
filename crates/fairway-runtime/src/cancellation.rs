//! Epoch-based cancellation for scheduled work.
//!
//! A [`CancellationScope`] hands out [`CancellationToken`]s stamped with the
//! current epoch. [`CancellationScope::cancel_all`] advances the epoch, which
//! invalidates every token issued before it in one step: queued directives,
//! delayed starts, and pacing pauses all observe the same signal without
//! being visited individually.
//!
//! Tokens issued after a cancel are live again; there is no way to
//! "uncancel" an old token.
//!
//! # Example
//!
//! ```
//! use fairway_runtime::cancellation::CancellationScope;
//!
//! let scope = CancellationScope::new();
//! let before = scope.token();
//! scope.cancel_all();
//! let after = scope.token();
//! assert!(before.is_cancelled());
//! assert!(!after.is_cancelled());
//! ```

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Issues tokens and cancels them en masse.
#[derive(Debug, Clone, Default)]
pub struct CancellationScope {
    epoch: Arc<AtomicU64>,
}

/// Observes whether the scope was cancelled after the token was issued.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    epoch: Arc<AtomicU64>,
    issued_at: u64,
}

impl CancellationScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token for work started now.
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            epoch: Arc::clone(&self.epoch),
            issued_at: self.epoch.load(Ordering::Acquire),
        }
    }

    /// Cancel every outstanding token. Returns the new epoch.
    pub fn cancel_all(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current epoch.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}

impl CancellationToken {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.epoch.load(Ordering::Acquire) != self.issued_at
    }

    /// Epoch the token was issued in.
    #[inline]
    pub fn issued_at(&self) -> u64 {
        self.issued_at
    }
}
