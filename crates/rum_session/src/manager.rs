//! The session manager.
//!
//! # Rotation protocol
//!
//! The identifier and its creation time live together in one atomic slot. A
//! caller that finds the session expired draws a new id and tries a single
//! compare-and-set from the slot it observed to the fresh one:
//!
//! ```text
//!   load slot ──► expired? ──no──────────────────────────┐
//!                   │ yes                                │
//!                   ▼                                    │
//!          CAS(observed → fresh) ──lost──► reload slot ──┤
//!                   │ won                                │
//!                   ▼                                    ▼
//!              reload slot ─────────────────────► bump inactivity timer
//!                                                        │
//!                                      won? ──yes──► notify listener(old, new)
//! ```
//!
//! Only the CAS winner reports a change, so the listener fires at most once per
//! rotation no matter how many threads race past the expiry boundary. Because
//! the creation time is swapped together with the id, no reader can see the
//! new id paired with the old creation time and rotate a second time.

use crate::clock::{nanos, Clock, SystemClock};
use crate::config::{InactivityPolicy, SessionConfig};
use crate::id::SessionId;
use crossbeam_utils::atomic::AtomicCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Callback invoked with `(old, new)` after a rotation.
pub type ChangeListener = dyn Fn(SessionId, SessionId) + Send + Sync;

/// Sentinel for "inactivity timer not running".
const NO_TIMEOUT: u64 = u64::MAX;

/// Id and creation time, swapped as a unit.
///
/// `#[repr(C)]` with three 8-byte-aligned words keeps the type free of padding,
/// which `AtomicCell::compare_exchange` relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
struct SessionSlot {
    id: SessionId,
    created_at_nanos: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpiryReason {
    Lifetime,
    Inactivity,
}

impl ExpiryReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Lifetime => "lifetime",
            Self::Inactivity => "inactivity",
        }
    }
}

/// Hands out the current session id and rotates it when it expires.
///
/// Safe to share between threads (`Arc<SessionManager>`); no operation blocks
/// on I/O or fails.
pub struct SessionManager<C: Clock = SystemClock> {
    config: SessionConfig,
    clock: C,
    slot: AtomicCell<SessionSlot>,
    /// Clock reading when the inactivity timer was armed, or `NO_TIMEOUT`.
    timeout_start_nanos: AtomicU64,
    listener: Mutex<Option<Arc<ChangeListener>>>,
}

impl SessionManager<SystemClock> {
    /// Creates a manager on the system monotonic clock.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl Default for SessionManager<SystemClock> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl<C: Clock> SessionManager<C> {
    /// Creates a manager reading time from `clock`. The first session starts now.
    pub fn with_clock(config: SessionConfig, clock: C) -> Self {
        let created_at_nanos = nanos(clock.now());
        Self {
            config,
            clock,
            slot: AtomicCell::new(SessionSlot {
                id: SessionId::random(),
                created_at_nanos,
            }),
            timeout_start_nanos: AtomicU64::new(NO_TIMEOUT),
            listener: Mutex::new(None),
        }
    }

    /// Returns the session id to attribute telemetry to right now.
    ///
    /// Rotates the id first if it outlived `max_lifetime` or sat idle past
    /// `inactivity_timeout` with the timer armed. Always re-arms (or, under
    /// [`InactivityPolicy::ExplicitArm`], disarms) the inactivity timer, and
    /// only then notifies the change listener, so telemetry the listener emits
    /// is attributed to the new session without triggering another rotation.
    ///
    /// # Panics
    ///
    /// A panicking change listener unwinds through this call.
    pub fn current(&self) -> SessionId {
        let now = self.now_nanos();
        let observed = self.slot.load();
        let mut result = observed.id;
        let mut rotated = false;

        if let Some(reason) = self.expiry_reason(observed, now) {
            let fresh = SessionSlot {
                id: SessionId::random_excluding(observed.id),
                created_at_nanos: now,
            };
            // Losing the CAS means another caller already rotated.
            rotated = self.slot.compare_exchange(observed, fresh).is_ok();
            if rotated {
                debug!(
                    old = %observed.id,
                    new = %fresh.id,
                    reason = reason.as_str(),
                    "session rotated"
                );
            }
            result = self.slot.load().id;
        }

        self.bump_inactivity_timer(now);

        if rotated {
            if let Some(listener) = self.change_listener() {
                listener(observed.id, result);
            }
        }

        result
    }

    /// Returns the stored id without expiry checks or timer side effects.
    pub fn peek(&self) -> SessionId {
        self.slot.load().id
    }

    /// Arms the inactivity timer at the current time.
    ///
    /// Meant for [`InactivityPolicy::ExplicitArm`], where the host decides when
    /// idle time starts counting. Under `BumpOnAccess` this simply re-arms the
    /// timer early; under `Disabled` it has no effect.
    pub fn notify_activity_timeout_start(&self) {
        if self.config.inactivity_policy != InactivityPolicy::Disabled {
            self.timeout_start_nanos
                .store(self.now_nanos(), Ordering::Release);
        }
    }

    /// Replaces the change listener.
    pub fn set_change_listener<F>(&self, listener: F)
    where
        F: Fn(SessionId, SessionId) + Send + Sync + 'static,
    {
        *self.listener.lock().unwrap() = Some(Arc::new(listener));
    }

    /// Removes the change listener, if any.
    pub fn clear_change_listener(&self) {
        *self.listener.lock().unwrap() = None;
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[inline]
    fn now_nanos(&self) -> u64 {
        nanos(self.clock.now())
    }

    fn expiry_reason(&self, slot: SessionSlot, now: u64) -> Option<ExpiryReason> {
        let max_lifetime = nanos(self.config.max_lifetime);
        if now.saturating_sub(slot.created_at_nanos) >= max_lifetime {
            return Some(ExpiryReason::Lifetime);
        }

        if self.config.inactivity_policy == InactivityPolicy::Disabled {
            return None;
        }
        let armed_at = self.timeout_start_nanos.load(Ordering::Acquire);
        if armed_at == NO_TIMEOUT {
            return None;
        }

        // A session cannot have been idle for longer than it has existed.
        let idle_since = armed_at.max(slot.created_at_nanos);
        let timeout = nanos(self.config.inactivity_timeout);
        (now.saturating_sub(idle_since) >= timeout).then_some(ExpiryReason::Inactivity)
    }

    fn bump_inactivity_timer(&self, now: u64) {
        match self.config.inactivity_policy {
            InactivityPolicy::BumpOnAccess => {
                self.timeout_start_nanos.store(now, Ordering::Release);
            }
            InactivityPolicy::ExplicitArm => {
                self.timeout_start_nanos.store(NO_TIMEOUT, Ordering::Release);
            }
            InactivityPolicy::Disabled => {}
        }
    }

    fn change_listener(&self) -> Option<Arc<ChangeListener>> {
        self.listener.lock().unwrap().clone()
    }
}

impl<C: Clock> fmt::Debug for SessionManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let armed = self.timeout_start_nanos.load(Ordering::Relaxed);
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("session_id", &self.peek())
            .field("inactivity_timer_armed", &(armed != NO_TIMEOUT))
            .finish_non_exhaustive()
    }
}

impl<C: Clock> fmt::Display for SessionManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.peek(), f)
    }
}
