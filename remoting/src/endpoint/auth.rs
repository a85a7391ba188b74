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


//! Pluggable challenge/response authentication.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

/// Challenge/response authenticator used during the handshake.
///
/// The verifying side calls [`challenge`](Authenticator::challenge) and sends
/// the result; the proving side answers with
/// [`respond`](Authenticator::respond); the verifying side then checks the
/// answer with [`verify`](Authenticator::verify). Both sides must be
/// configured with compatible authenticators.
pub trait Authenticator: Send + Sync {
    /// Creates a fresh challenge.
    fn challenge(&self) -> String;

    /// Answers a challenge received from the peer.
    fn respond(&self, challenge: &str) -> String;

    /// Checks the peer's answer to `challenge`.
    fn verify(&self, challenge: &str, response: &str) -> bool;
}

/// Proves knowledge of a shared secret.
///
/// The response is a hash of the challenge and the secret. `DefaultHasher`
/// is not a cryptographic hash: this keeps honest peers apart but does not
/// stop an attacker who can observe the exchange.
///
/// # Examples
///
/// ```rust
/// use remoting::endpoint::{Authenticator, SharedSecretAuthenticator};
///
/// let server = SharedSecretAuthenticator::new("s3cret");
/// let client = SharedSecretAuthenticator::new("s3cret");
/// let challenge = server.challenge();
/// assert!(server.verify(&challenge, &client.respond(&challenge)));
/// ```
#[derive(Clone)]
pub struct SharedSecretAuthenticator {
    secret: String,
}

impl SharedSecretAuthenticator {
    /// Creates an authenticator for `secret`.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Authenticator for SharedSecretAuthenticator {
    fn challenge(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn respond(&self, challenge: &str) -> String {
        let mut hasher = DefaultHasher::new();
        challenge.hash(&mut hasher);
        self.secret.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    fn verify(&self, challenge: &str, response: &str) -> bool {
        self.respond(challenge) == response
    }
}

impl std::fmt::Debug for SharedSecretAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretAuthenticator")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_secrets_verify() {
        let a = SharedSecretAuthenticator::new("x");
        let b = SharedSecretAuthenticator::new("x");
        let challenge = a.challenge();
        assert!(a.verify(&challenge, &b.respond(&challenge)));
    }

    #[test]
    fn test_mismatched_secrets_fail() {
        let a = SharedSecretAuthenticator::new("x");
        let b = SharedSecretAuthenticator::new("y");
        let challenge = a.challenge();
        assert!(!a.verify(&challenge, &b.respond(&challenge)));
    }

    #[test]
    fn test_challenges_are_fresh() {
        let a = SharedSecretAuthenticator::new("x");
        assert_ne!(a.challenge(), a.challenge());
    }
}
