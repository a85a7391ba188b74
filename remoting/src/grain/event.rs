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


//! Multicast events that can be observed across an endpoint boundary.
//!
//! An [`Event`] keeps an ordered list of handlers. Raising it runs every
//! handler in subscription order, even when one of them fails, and then
//! reports the first failure to the raiser.
//!
//! On a proxy the event is backed by a remote subscription: the first local
//! handler subscribes at the servant (synthetic method `+{event}`), the last
//! one to leave unsubscribes (`-{event}`). The servant side attaches an
//! [`EventForwarder`] to the subject's event, which pushes raised values to
//! the peer while a remote subscription exists.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use remoting::{Event, RemotingError};
//!
//! # async fn example() -> Result<(), RemotingError> {
//! let event = Event::<i32>::new();
//! let seen = Arc::new(AtomicI32::new(0));
//! let sink = Arc::clone(&seen);
//! event
//!     .subscribe(move |value: i32| {
//!         sink.store(value, Ordering::SeqCst);
//!         Ok(())
//!     })
//!     .await?;
//! event.raise(42).await?;
//! assert_eq!(seen.load(Ordering::SeqCst), 42);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
#[cfg(feature = "tracing")]
use tracing::debug;

use super::Grain;
use crate::error::RemotingError;
use crate::types::Remotable;

/// Receives the values of an [`Event`].
#[async_trait]
pub trait EventHandler<T: Send + 'static>: Send + Sync {
    /// Handles one raised value.
    async fn handle(&self, value: T) -> Result<(), RemotingError>;
}

#[async_trait]
impl<T, F> EventHandler<T> for F
where
    T: Send + 'static,
    F: Fn(T) -> Result<(), RemotingError> + Send + Sync,
{
    async fn handle(&self, value: T) -> Result<(), RemotingError> {
        self(value)
    }
}

/// Token returned by a subscription, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct RemoteSubscription {
    grain: Grain,
    interface: &'static str,
    name: &'static str,
}

/// An ordered list of handlers for values of type `T`.
pub struct Event<T: Send + 'static> {
    handlers: Mutex<Vec<(SubscriptionId, Arc<dyn EventHandler<T>>)>>,
    next_id: AtomicU64,
    remote: Option<RemoteSubscription>,
    subscription_lock: tokio::sync::Mutex<()>,
}

impl<T: Clone + Send + 'static> Event<T> {
    /// Creates an event without handlers.
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            remote: None,
            subscription_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates the proxy-side event `interface.name` of the object behind
    /// `grain`.
    #[doc(hidden)]
    pub fn remote(grain: Grain, interface: &'static str, name: &'static str) -> Self {
        Self {
            remote: Some(RemoteSubscription {
                grain,
                interface,
                name,
            }),
            ..Self::new()
        }
    }

    /// Adds a handler. On a proxy the first handler also subscribes at the
    /// peer; if that fails the handler is not added.
    pub async fn subscribe<H>(&self, handler: H) -> Result<SubscriptionId, RemotingError>
    where
        H: EventHandler<T> + 'static,
    {
        let _guard = self.subscription_lock.lock().await;
        let first = self.subscriber_count() == 0;
        if let (Some(remote), true) = (&self.remote, first) {
            remote.send('+').await?;
        }
        Ok(self.attach(Arc::new(handler)))
    }

    /// Removes a handler. On a proxy removing the last handler also
    /// unsubscribes at the peer. Returns whether the handler was present.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, RemotingError> {
        let _guard = self.subscription_lock.lock().await;
        if !self.detach(id) {
            return Ok(false);
        }
        let last = self.subscriber_count() == 0;
        if let (Some(remote), true) = (&self.remote, last) {
            remote.send('-').await?;
        }
        Ok(true)
    }

    /// Adds a handler locally, without any remote subscription.
    #[doc(hidden)]
    pub fn attach(&self, handler: Arc<dyn EventHandler<T>>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, handler));
        id
    }

    /// Removes a handler locally, without any remote unsubscription.
    #[doc(hidden)]
    pub fn detach(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(subscription, _)| *subscription != id);
        handlers.len() != before
    }

    /// Number of handlers.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Runs every handler on `value`, in subscription order.
    ///
    /// # Errors
    ///
    /// Returns the first handler error, after all handlers have run.
    pub async fn raise(&self, value: T) -> Result<(), RemotingError> {
        let snapshot: Vec<Arc<dyn EventHandler<T>>> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        let mut first_error = None;
        for handler in snapshot {
            if let Err(error) = handler.handle(value.clone()).await {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<T: Clone + Send + 'static> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("subscribers", &self.handlers.lock().len())
            .field("remote", &self.remote.as_ref().map(|remote| remote.name))
            .finish()
    }
}

impl RemoteSubscription {
    async fn send(&self, prefix: char) -> Result<(), RemotingError> {
        let method = format!("{prefix}{}", self.name);
        #[cfg(feature = "tracing")]
        debug!(
            object_id = %self.grain.object_id(),
            interface = self.interface,
            method = %method,
            "updating remote event subscription"
        );
        self.grain
            .call(self.interface, &method)
            .returning::<()>()
            .await
    }
}

/// Servant-side link between a subject's event and the peer.
///
/// The forwarder's handler stays attached for the servant's whole life and
/// only pushes values while the peer holds a subscription.
#[derive(Debug)]
pub struct EventForwarder {
    subscribed: Arc<AtomicBool>,
    subscription: SubscriptionId,
}

impl EventForwarder {
    /// Attaches a forwarding handler for `interface.name` to `event`.
    pub fn attach<T>(event: &Event<T>, grain: &Grain, interface: &'static str, name: &'static str) -> Self
    where
        T: Remotable + Clone,
    {
        let subscribed = Arc::new(AtomicBool::new(false));
        let thunk = ForwardingThunk {
            grain: grain.clone(),
            interface,
            name,
            subscribed: Arc::clone(&subscribed),
        };
        let subscription = event.attach(Arc::new(thunk));
        Self {
            subscribed,
            subscription,
        }
    }

    /// Records whether the peer holds a subscription.
    pub fn set_subscribed(&self, subscribed: bool) {
        self.subscribed.store(subscribed, Ordering::SeqCst);
    }

    /// Whether the peer holds a subscription.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    /// Removes the forwarding handler from `event`.
    pub fn detach<T: Clone + Send + 'static>(&self, event: &Event<T>) {
        event.detach(self.subscription);
    }
}

struct ForwardingThunk {
    grain: Grain,
    interface: &'static str,
    name: &'static str,
    subscribed: Arc<AtomicBool>,
}

#[async_trait]
impl<T: Remotable> EventHandler<T> for ForwardingThunk {
    async fn handle(&self, value: T) -> Result<(), RemotingError> {
        if !self.subscribed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.grain
            .call(self.interface, self.name)
            .argument(&value)?
            .returning::<()>()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn recorder(
        log: &Arc<StdMutex<Vec<(char, i32)>>>,
        tag: char,
        fail: bool,
    ) -> impl Fn(i32) -> Result<(), RemotingError> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |value| {
            log.lock().unwrap().push((tag, value));
            if fail {
                Err(RemotingError::Internal {
                    message: format!("handler {tag} failed"),
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_raise_runs_all_handlers_in_order() {
        let event = Event::<i32>::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        event.subscribe(recorder(&log, 'a', false)).await.unwrap();
        event.subscribe(recorder(&log, 'b', true)).await.unwrap();
        event.subscribe(recorder(&log, 'c', true)).await.unwrap();

        let error = event.raise(42).await.unwrap_err();
        assert_eq!(*log.lock().unwrap(), [('a', 42), ('b', 42), ('c', 42)]);
        assert!(error.to_string().contains("handler b failed"));
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let event = Event::<i32>::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let first = event.subscribe(recorder(&log, 'a', false)).await.unwrap();
        event.subscribe(recorder(&log, 'b', false)).await.unwrap();
        assert!(event.unsubscribe(first).await.unwrap());
        assert!(!event.unsubscribe(first).await.unwrap());
        assert_eq!(event.subscriber_count(), 1);

        event.raise(1).await.unwrap();
        assert_eq!(*log.lock().unwrap(), [('b', 1)]);
    }
}
