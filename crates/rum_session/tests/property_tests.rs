//! Property-based tests for session rotation over arbitrary call schedules.

use proptest::prelude::*;
use rum_session::{InactivityPolicy, ManualClock, SessionConfig, SessionId, SessionManager};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const LIFETIME_SECS: u64 = 600;
const IDLE_SECS: u64 = 60;

#[derive(Debug, Clone)]
enum Step {
    Advance(u64),
    Current,
    Arm,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u64..120).prop_map(Step::Advance),
        Just(Step::Current),
        Just(Step::Arm),
    ]
}

fn policy() -> impl Strategy<Value = InactivityPolicy> {
    prop_oneof![
        Just(InactivityPolicy::BumpOnAccess),
        Just(InactivityPolicy::ExplicitArm),
        Just(InactivityPolicy::Disabled),
    ]
}

proptest! {
    /// Every observed change of id is reported exactly once, with the right
    /// pair, and a superseded id is never handed out again.
    #[test]
    fn prop_listener_matches_observed_rotations(
        policy in policy(),
        steps in prop::collection::vec(step(), 1..200),
    ) {
        let config = SessionConfig::default()
            .with_max_lifetime(Duration::from_secs(LIFETIME_SECS))
            .with_inactivity_timeout(Duration::from_secs(IDLE_SECS))
            .with_inactivity_policy(policy);
        let sessions = SessionManager::with_clock(config, Arc::new(ManualClock::new()));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        sessions.set_change_listener(move |old, new| sink.lock().unwrap().push((old, new)));

        let mut last = sessions.peek();
        let mut expected = Vec::new();
        let mut retired: HashSet<SessionId> = HashSet::new();

        for step in steps {
            match step {
                Step::Advance(secs) => sessions.clock().advance(Duration::from_secs(secs)),
                Step::Arm => sessions.notify_activity_timeout_start(),
                Step::Current => {
                    let id = sessions.current();
                    prop_assert!(!retired.contains(&id), "superseded id {} reused", id);
                    if id != last {
                        expected.push((last, id));
                        retired.insert(last);
                        last = id;
                    }
                    // An immediate second read never rotates.
                    prop_assert_eq!(sessions.current(), id);
                }
            }
        }

        prop_assert_eq!(&*events.lock().unwrap(), &expected);
    }

    /// With no time passing, the id never changes whatever the policy.
    #[test]
    fn prop_stable_without_elapsed_time(policy in policy(), calls in 1usize..50) {
        let config = SessionConfig::default().with_inactivity_policy(policy);
        let sessions = SessionManager::with_clock(config, ManualClock::new());
        let first = sessions.current();
        for _ in 0..calls {
            sessions.notify_activity_timeout_start();
            prop_assert_eq!(sessions.current(), first);
        }
    }
}
