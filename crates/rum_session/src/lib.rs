//! RUM Session Identity
//!
//! Time-bounded session identifiers for mobile real-user-monitoring telemetry.
//! A [`SessionManager`] hands out the id every span should be attributed to and
//! rotates it exactly once when it expires, even under concurrent callers.
//!
//! # Expiry
//!
//! A session expires when either
//!
//! - its absolute age reaches [`SessionConfig::max_lifetime`], or
//! - the inactivity timer is armed and has run for
//!   [`SessionConfig::inactivity_timeout`].
//!
//! When the inactivity timer is armed depends on the [`InactivityPolicy`]:
//! re-armed by every [`SessionManager::current`] call, or armed explicitly by
//! the host through [`SessionManager::notify_activity_timeout_start`].
//!
//! # Example
//!
//! ```
//! use rum_session::{SessionConfig, SessionManager};
//!
//! let sessions = SessionManager::new(SessionConfig::default());
//! sessions.set_change_listener(|old, new| {
//!     println!("session {old} ended, {new} started");
//! });
//!
//! let id = sessions.current();
//! assert_eq!(id.to_string().len(), 32);
//! assert_eq!(sessions.current(), id);
//! ```

pub mod clock;
pub mod config;
pub mod id;
pub mod manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{InactivityPolicy, SessionConfig};
pub use id::{ParseSessionIdError, SessionId, SESSION_ID_HEX_LEN};
pub use manager::{ChangeListener, SessionManager};
