//! Configuration for session lifetime and idle expiry.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the inactivity timer is armed.
///
/// The two policies measure idleness differently and are not interchangeable:
/// pick one per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InactivityPolicy {
    /// Every `current()` call re-arms the timer, so idle time is measured from
    /// the last time anyone asked for the session id.
    #[default]
    BumpOnAccess,
    /// The timer only runs after the host calls
    /// `notify_activity_timeout_start()` (e.g. when the app goes to the
    /// background); every `current()` call disarms it again.
    ExplicitArm,
    /// Sessions only expire by age.
    Disabled,
}

/// Session expiry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum absolute age of a session, regardless of activity.
    ///
    /// Default: 4 hours
    pub max_lifetime: Duration,

    /// Maximum idle time while the inactivity timer is armed.
    ///
    /// Default: 15 minutes
    pub inactivity_timeout: Duration,

    /// Default: [`InactivityPolicy::BumpOnAccess`]
    pub inactivity_policy: InactivityPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_lifetime: Duration::from_secs(4 * 60 * 60),
            inactivity_timeout: Duration::from_secs(15 * 60),
            inactivity_policy: InactivityPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults with the timer armed explicitly by the host.
    pub fn explicit_arm() -> Self {
        Self::default().with_inactivity_policy(InactivityPolicy::ExplicitArm)
    }

    /// Sets the lifetime ceiling.
    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Sets the inactivity ceiling.
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    /// Sets the inactivity policy.
    pub fn with_inactivity_policy(mut self, policy: InactivityPolicy) -> Self {
        self.inactivity_policy = policy;
        self
    }
}
