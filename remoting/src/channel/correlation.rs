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


//! Call correlation identifiers.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Identifies one in-flight call on a connection.
///
/// The caller allocates it and the callee echoes it in the response, so
/// responses may complete in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RpcId(i64);

impl RpcId {
    /// Wraps a raw id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc:{}", self.0)
    }
}

/// Thread-safe, monotonically increasing [`RpcId`] source.
///
/// Ids start at 1 and are never reused for the lifetime of the generator,
/// which lives as long as the endpoint.
#[derive(Debug)]
pub struct RpcIdGenerator {
    next_id: AtomicI64,
}

impl RpcIdGenerator {
    /// Creates a generator starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
        }
    }

    /// Allocates the next id.
    #[must_use]
    pub fn next(&self) -> RpcId {
        RpcId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for RpcIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_generator_starts_at_one() {
        let generator = RpcIdGenerator::new();
        assert_eq!(generator.next(), RpcId::new(1));
        assert_eq!(generator.next(), RpcId::new(2));
    }

    #[tokio::test]
    async fn test_generator_concurrent() {
        let generator = Arc::new(RpcIdGenerator::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let generator = generator.clone();
            handles.push(tokio::spawn(async move {
                (0..100).map(|_| generator.next()).collect::<Vec<_>>()
            }));
        }

        let mut all_ids = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(all_ids.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(all_ids.len(), 1000);
    }
}
