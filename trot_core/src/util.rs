//! Bounded retry for bus reads.

use trot_traits::{ActuatorError, Clock};

use crate::config::RetryPolicy;

/// All attempts failed; `last` is the final error seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted {
    pub attempts: u8,
    pub last: ActuatorError,
}

/// Run `op` up to `policy.attempts` times, sleeping `policy.delay` between
/// tries. Non-transient errors (a missing capability) end the loop at once.
pub fn retry<T, F>(clock: &dyn Clock, policy: &RetryPolicy, mut op: F) -> Result<T, Exhausted>
where
    F: FnMut() -> Result<T, ActuatorError>,
{
    let attempts = policy.attempts.max(1);
    let mut n = 0;
    loop {
        n += 1;
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if !e.is_transient() || n >= attempts => {
                return Err(Exhausted {
                    attempts: n,
                    last: e,
                });
            }
            Err(e) => {
                tracing::debug!(attempt = n, error = %e, "read failed, retrying");
                clock.sleep(policy.delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use trot_traits::ActuatorId;
    use trot_traits::clock::test_clock::TestClock;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(20),
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let clock = TestClock::new();
        let mut calls = 0;
        let v = retry(&clock, &policy(), || {
            calls += 1;
            if calls < 3 {
                Err(ActuatorError::CommTimeout { id: ActuatorId(1) })
            } else {
                Ok(42)
            }
        });
        assert_eq!(v, Ok(42));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(20); 2]);
    }

    #[test]
    fn gives_up_after_the_last_attempt_without_a_trailing_sleep() {
        let clock = TestClock::new();
        let r: Result<(), _> = retry(&clock, &policy(), || {
            Err(ActuatorError::CommTimeout { id: ActuatorId(2) })
        });
        let e = r.unwrap_err();
        assert_eq!(e.attempts, 3);
        assert_eq!(e.last, ActuatorError::CommTimeout { id: ActuatorId(2) });
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[test]
    fn missing_capability_is_not_retried() {
        let clock = TestClock::new();
        let mut calls = 0;
        let r: Result<f32, _> = retry(&clock, &policy(), || {
            calls += 1;
            Err(ActuatorError::CapabilityMissing {
                id: ActuatorId(3),
                capability: "current sensing",
            })
        });
        assert_eq!(r.unwrap_err().attempts, 1);
        assert_eq!(calls, 1);
        assert!(clock.sleeps().is_empty());
    }
}
