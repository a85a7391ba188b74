//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Retry policies for connecting.
//!
//! [`RemotingEndpoint::connect_with_retry`](crate::RemotingEndpoint::connect_with_retry)
//! consults a [`ReconnectionStrategy`] after every failed attempt: whether to
//! try again, and how long to wait first. Only recoverable failures (see
//! [`EndpointError::is_recoverable`]) are retried; authentication failures,
//! invalid addresses and the like are returned immediately.

use std::time::Duration;

use crate::endpoint::EndpointError;

/// Decides whether and when a failed connect is retried.
pub trait ReconnectionStrategy: Send + Sync {
    /// Returns `true` to retry after failed attempt number `attempt`
    /// (starting at 0).
    fn should_reconnect(&self, attempt: u32, last_error: &EndpointError) -> bool;

    /// Delay before attempt number `attempt + 1`.
    fn next_delay(&self, attempt: u32) -> Duration;

    /// Name for logs.
    fn name(&self) -> &str;
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReconnect;

impl ReconnectionStrategy for NoReconnect {
    fn should_reconnect(&self, _attempt: u32, _last_error: &EndpointError) -> bool {
        false
    }

    fn next_delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }

    fn name(&self) -> &str {
        "NoReconnect"
    }
}

/// Retries with exponentially growing delays.
///
/// # Examples
///
/// ```rust
/// use remoting::reconnection::{ExponentialBackoff, ReconnectionStrategy};
/// use std::time::Duration;
///
/// let strategy = ExponentialBackoff::new(Duration::from_millis(100))
///     .with_max_delay(Duration::from_secs(1))
///     .with_max_attempts(5);
/// assert_eq!(strategy.next_delay(0), Duration::from_millis(100));
/// assert_eq!(strategy.next_delay(2), Duration::from_millis(400));
/// assert_eq!(strategy.next_delay(10), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    max_attempts: Option<u32>,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl ExponentialBackoff {
    /// Creates a backoff starting at `initial_delay`.
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            ..Self::default()
        }
    }

    /// Caps the delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the growth factor.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Limits the number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn should_reconnect(&self, attempt: u32, last_error: &EndpointError) -> bool {
        if !last_error.is_recoverable() {
            return false;
        }
        self.max_attempts.is_none_or(|max| attempt + 1 < max)
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(delay)
        }
    }

    fn name(&self) -> &str {
        "ExponentialBackoff"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable() -> EndpointError {
        EndpointError::NoSuchEndpoint {
            address: "memory://nobody".to_string(),
            reason: "no listener".to_string(),
        }
    }

    #[test]
    fn test_no_reconnect() {
        assert!(!NoReconnect.should_reconnect(0, &unreachable()));
    }

    #[test]
    fn test_backoff_attempt_limit() {
        let strategy = ExponentialBackoff::default().with_max_attempts(3);
        assert!(strategy.should_reconnect(0, &unreachable()));
        assert!(strategy.should_reconnect(1, &unreachable()));
        assert!(!strategy.should_reconnect(2, &unreachable()));
    }

    #[test]
    fn test_backoff_skips_unrecoverable_errors() {
        let strategy = ExponentialBackoff::default();
        let error = EndpointError::AuthenticationFailed {
            reason: "wrong secret".to_string(),
        };
        assert!(!strategy.should_reconnect(0, &error));
    }

    #[test]
    fn test_backoff_caps_delay() {
        let strategy = ExponentialBackoff::new(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5));
        assert_eq!(strategy.next_delay(1), Duration::from_secs(2));
        assert_eq!(strategy.next_delay(3), Duration::from_secs(5));
        assert_eq!(strategy.next_delay(u32::MAX), Duration::from_secs(5));
    }
}
