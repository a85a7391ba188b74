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


//! The remoting endpoint.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::connection::Connection;
use super::handshake::{self, Handshake};
use crate::channel::{CallFrame, ResponseFrame, ResponseStatus, RpcId, RpcIdGenerator};
use crate::endpoint::{ConnectionId, EndpointConfig, EndpointError, EndpointState};
use crate::error::RemotingError;
use crate::grain::{EndpointChannel, Grain, ObjectId, ProxyObject, RemoteInterface, Servant};
use crate::reconnection::ReconnectionStrategy;
use crate::serialization::fault::{decode_error, encode_error};
use crate::serialization::{
    BinaryReader, BinaryWriter, DecodeError, EncodeError, ObjectTable, Serializer,
};
use crate::transport::{Address, Listener, Transport, TransportError};
use crate::types::{BoxedValue, InterfaceHooks};

#[cfg(feature = "tracing")]
use tracing::{debug, info, instrument, warn};

/// Pause after a failed accept before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// One side of a remoting connection.
///
/// An endpoint hosts servants for local subjects and proxies for objects of
/// its peer, and carries calls between them over at most one connection at a
/// time. Either side may [`bind`](Self::bind) and wait for the peer, or
/// [`connect`](Self::connect) to a bound peer; once connected both sides can
/// call each other.
///
/// Servants survive disconnects; proxies do not. Cloning yields another
/// handle to the same endpoint.
///
/// # Examples
///
/// ```rust,no_run
/// use remoting::{EndpointConfig, ObjectId, RemotingEndpoint};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let server = RemotingEndpoint::new(EndpointConfig::new().with_name("server"))?;
/// let address = server.bind("tcp://127.0.0.1:0").await?;
///
/// let client = RemotingEndpoint::new(EndpointConfig::new().with_name("client"))?;
/// let connection_id = client
///     .connect(&address.to_string(), Duration::from_secs(5))
///     .await?;
/// println!("connected as {connection_id}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RemotingEndpoint {
    inner: Arc<EndpointInner>,
}

pub(crate) struct EndpointInner {
    config: EndpointConfig,
    serializer: Arc<Serializer>,
    channel: Arc<dyn EndpointChannel>,
    core: Mutex<Core>,
    state: watch::Sender<EndpointState>,
    objects: Mutex<Objects>,
    rpc_ids: RpcIdGenerator,
    next_object_id: AtomicU64,
}

struct Core {
    state: EndpointState,
    connection: Option<Arc<Connection>>,
    local_address: Option<Address>,
    dialled_address: Option<Address>,
    accept_task: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Objects {
    servants: HashMap<ObjectId, Arc<dyn Servant>>,
    identities: HashMap<(usize, &'static str), ObjectId>,
    proxies: HashMap<ObjectId, Weak<dyn ProxyObject>>,
}

impl Objects {
    fn is_free(&self, object_id: ObjectId) -> bool {
        !self.servants.contains_key(&object_id)
            && self
                .proxies
                .get(&object_id)
                .is_none_or(|proxy| proxy.strong_count() == 0)
    }

    fn live_proxy(&self, object_id: ObjectId) -> Option<Arc<dyn ProxyObject>> {
        self.proxies.get(&object_id).and_then(Weak::upgrade)
    }
}

/// The channel handed to grains. Holds the endpoint weakly so proxies and
/// servants do not keep it alive.
struct EndpointHandle(Weak<EndpointInner>);

#[async_trait]
impl EndpointChannel for EndpointHandle {
    async fn call_remote_method(
        &self,
        object_id: ObjectId,
        interface: &str,
        method: &str,
        arguments: Bytes,
    ) -> Result<Bytes, RemotingError> {
        let endpoint = self
            .0
            .upgrade()
            .ok_or(RemotingError::Endpoint(EndpointError::Disposed))?;
        endpoint.call(object_id, interface, method, arguments).await
    }
}

impl RemotingEndpoint {
    /// Creates a disconnected endpoint.
    pub fn new(config: EndpointConfig) -> Result<Self, EndpointError> {
        config.validate()?;
        let serializer = Arc::new(Serializer::new(Arc::clone(&config.type_model)));
        let (state, _) = watch::channel(EndpointState::Disconnected);
        // Automatic ids start at a random point in the upper half of the id
        // space so they do not collide with explicit ids or the peer's.
        let seed = Uuid::new_v4().as_u64_pair().0;

        let inner = Arc::new_cyclic(|weak: &Weak<EndpointInner>| {
            let table: Weak<dyn ObjectTable> = weak.clone();
            serializer.attach(table);
            EndpointInner {
                config,
                serializer,
                channel: Arc::new(EndpointHandle(weak.clone())),
                core: Mutex::new(Core {
                    state: EndpointState::Disconnected,
                    connection: None,
                    local_address: None,
                    dialled_address: None,
                    accept_task: None,
                }),
                state,
                objects: Mutex::new(Objects::default()),
                rpc_ids: RpcIdGenerator::new(),
                next_object_id: AtomicU64::new((seed >> 1) | (1 << 63)),
            }
        });

        #[cfg(feature = "tracing")]
        debug!(name = %inner.config.name, "Created endpoint");

        Ok(Self { inner })
    }

    /// The endpoint name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// The configuration the endpoint was created with.
    pub fn config(&self) -> &EndpointConfig {
        &self.inner.config
    }

    /// The serializer used for all calls on this endpoint.
    pub fn serializer(&self) -> &Arc<Serializer> {
        &self.inner.serializer
    }

    /// The current state.
    pub fn state(&self) -> EndpointState {
        self.inner.core.lock().state
    }

    /// Subscribes to state changes.
    pub fn watch_state(&self) -> watch::Receiver<EndpointState> {
        self.inner.state.subscribe()
    }

    /// Returns `true` while connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Id of the current connection.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.inner.current_connection().map(|connection| connection.id())
    }

    /// Name the connected peer reported during the handshake.
    pub fn peer_name(&self) -> Option<String> {
        self.inner
            .current_connection()
            .map(|connection| connection.peer_name().to_string())
    }

    /// Address the endpoint is bound to, if any.
    pub fn local_address(&self) -> Option<Address> {
        self.inner.core.lock().local_address.clone()
    }

    /// Address of the connected peer, if known.
    pub fn remote_address(&self) -> Option<Address> {
        let core = self.inner.core.lock();
        let connection = core.connection.as_ref()?;
        connection
            .remote_address()
            .cloned()
            .or_else(|| core.dialled_address.clone())
    }

    /// Exposes `subject` as object `object_id` implementing `I`.
    ///
    /// Fails if the id is already taken by a servant or a live proxy.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let servant = endpoint.create_servant::<dyn Calculator>(ObjectId::new(1), subject)?;
    /// assert_eq!(servant.interface_name(), "Calculator");
    /// ```
    pub fn create_servant<I>(
        &self,
        object_id: ObjectId,
        subject: Arc<I>,
    ) -> Result<Arc<dyn Servant>, EndpointError>
    where
        I: RemoteInterface + ?Sized,
    {
        self.inner.ensure_not_disposed()?;
        let identity = Arc::as_ptr(&subject) as *const () as usize;
        let servant = I::create_servant(subject, self.inner.grain(object_id));

        let mut objects = self.inner.objects.lock();
        if !objects.is_free(object_id) {
            return Err(EndpointError::DuplicateObjectId { object_id });
        }
        objects.servants.insert(object_id, Arc::clone(&servant));
        objects.identities.insert((identity, I::NAME), object_id);

        #[cfg(feature = "tracing")]
        debug!(%object_id, interface = I::NAME, "Created servant");

        Ok(servant)
    }

    /// Looks up the servant registered under `object_id`.
    pub fn servant(&self, object_id: ObjectId) -> Option<Arc<dyn Servant>> {
        self.inner.objects.lock().servants.get(&object_id).cloned()
    }

    /// Unregisters a servant. Returns `false` if there was none.
    pub fn remove_servant(&self, object_id: ObjectId) -> bool {
        let mut objects = self.inner.objects.lock();
        if objects.servants.remove(&object_id).is_none() {
            return false;
        }
        objects.identities.retain(|_, id| *id != object_id);
        true
    }

    /// Creates a proxy for the peer's object `object_id`.
    ///
    /// Fails if a servant or a live proxy already uses the id; see
    /// [`get_or_create_proxy`](Self::get_or_create_proxy) to share proxies.
    pub fn create_proxy<I>(&self, object_id: ObjectId) -> Result<Arc<I>, EndpointError>
    where
        I: RemoteInterface + ?Sized,
    {
        self.inner.ensure_not_disposed()?;
        let proxy = {
            let mut objects = self.inner.objects.lock();
            if !objects.is_free(object_id) {
                return Err(EndpointError::DuplicateObjectId { object_id });
            }
            let proxy = I::create_proxy(self.inner.grain(object_id));
            objects.proxies.insert(object_id, Arc::downgrade(&proxy));
            proxy
        };
        downcast::<I>(object_id, proxy)
    }

    /// Returns the live proxy for `object_id`, creating one if there is none.
    pub fn get_or_create_proxy<I>(&self, object_id: ObjectId) -> Result<Arc<I>, EndpointError>
    where
        I: RemoteInterface + ?Sized,
    {
        self.inner.ensure_not_disposed()?;
        let proxy = self
            .inner
            .proxy_object(object_id, I::NAME, I::create_proxy)
            .map_err(|_| EndpointError::DuplicateObjectId { object_id })?;
        downcast::<I>(object_id, proxy)
    }

    /// Starts accepting connections on `address`.
    ///
    /// Returns the address actually bound; for `tcp://host:0` it carries the
    /// port chosen by the OS. An endpoint can be bound only once. The
    /// observed state stays `Disconnected` until a peer connects, and the
    /// endpoint resumes accepting after each disconnect.
    #[cfg_attr(feature = "tracing", instrument(skip(self), fields(endpoint = %self.inner.config.name)))]
    pub async fn bind(&self, address: &str) -> Result<Address, EndpointError> {
        let address: Address = address.parse()?;
        {
            let core = self.inner.core.lock();
            if core.state == EndpointState::Disposed {
                return Err(EndpointError::Disposed);
            }
            if let Some(bound) = &core.local_address {
                return Err(EndpointError::AlreadyBound {
                    address: bound.to_string(),
                });
            }
        }

        let listener = address.bind(&self.inner.config.network).await?;
        let local_address = listener.local_address().clone();

        let mut core = self.inner.core.lock();
        if core.state == EndpointState::Disposed {
            return Err(EndpointError::Disposed);
        }
        if let Some(bound) = &core.local_address {
            return Err(EndpointError::AlreadyBound {
                address: bound.to_string(),
            });
        }
        core.local_address = Some(local_address.clone());
        core.accept_task = Some(tokio::spawn(accept_loop(
            Arc::downgrade(&self.inner),
            listener,
        )));

        #[cfg(feature = "tracing")]
        info!(address = %local_address, "Endpoint bound");

        Ok(local_address)
    }

    /// Connects to the endpoint bound at `address`.
    ///
    /// Valid only while `Disconnected`. On failure the endpoint is left
    /// `Disconnected` and the error tells whether the peer could not be
    /// reached, the handshake failed, or authentication was refused.
    #[cfg_attr(feature = "tracing", instrument(skip(self), fields(endpoint = %self.inner.config.name)))]
    pub async fn connect(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<ConnectionId, EndpointError> {
        if timeout.is_zero() {
            return Err(EndpointError::InvalidTimeout);
        }
        let address: Address = address.parse()?;
        {
            let mut core = self.inner.core.lock();
            match core.state {
                EndpointState::Disposed => return Err(EndpointError::Disposed),
                EndpointState::Disconnected => {}
                _ => return Err(EndpointError::AlreadyConnected),
            }
            if core.local_address.as_ref() == Some(&address) {
                return Err(EndpointError::ConnectToSelf {
                    address: address.to_string(),
                });
            }
            self.inner.set_state(&mut core, EndpointState::Connecting);
        }
        let mut attempt = Attempt {
            endpoint: &self.inner,
            armed: true,
        };

        let outcome = tokio::time::timeout(timeout, self.inner.dial(&address)).await;
        let (transport, handshake) = match outcome {
            Ok(Ok(established)) => established,
            Ok(Err(error)) => {
                #[cfg(feature = "tracing")]
                warn!(%address, "Connect failed: {}", error);
                return Err(error);
            }
            Err(_) => {
                let error = if self.state() == EndpointState::Connecting {
                    EndpointError::NoSuchEndpoint {
                        address: address.to_string(),
                        reason: format!("no answer within {timeout:?}"),
                    }
                } else {
                    EndpointError::HandshakeFailed {
                        reason: format!("timed out after {timeout:?}"),
                    }
                };
                #[cfg(feature = "tracing")]
                warn!(%address, "Connect failed: {}", error);
                return Err(error);
            }
        };

        attempt.armed = false;
        self.inner.install(transport, handshake, Some(address))
    }

    /// Like [`connect`](Self::connect), but retries failed attempts as long
    /// as `strategy` allows. Each attempt gets the full `timeout`.
    #[cfg_attr(feature = "tracing", instrument(skip(self, strategy), fields(endpoint = %self.inner.config.name, strategy = strategy.name())))]
    pub async fn connect_with_retry(
        &self,
        address: &str,
        timeout: Duration,
        strategy: &dyn ReconnectionStrategy,
    ) -> Result<ConnectionId, EndpointError> {
        let mut attempt = 0;
        loop {
            match self.connect(address, timeout).await {
                Ok(connection_id) => return Ok(connection_id),
                Err(error) if strategy.should_reconnect(attempt, &error) => {
                    let delay = strategy.next_delay(attempt);
                    #[cfg(feature = "tracing")]
                    debug!(attempt, ?delay, "Retrying connect after: {}", error);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Closes the current connection, if any.
    ///
    /// Pending calls fail with [`RemotingError::ConnectionLost`] and proxies
    /// are forgotten; servants are kept.
    pub async fn disconnect(&self) -> Result<(), EndpointError> {
        self.inner.ensure_not_disposed()?;
        self.inner.drop_connection(None, "disconnected locally").await;
        Ok(())
    }

    /// Disconnects, stops accepting, and releases every servant and proxy.
    ///
    /// Calling it again has no effect.
    pub async fn dispose(&self) {
        let (connection, accept_task) = {
            let mut core = self.inner.core.lock();
            if core.state == EndpointState::Disposed {
                return;
            }
            self.inner.set_state(&mut core, EndpointState::Disposed);
            core.local_address = None;
            core.dialled_address = None;
            (core.connection.take(), core.accept_task.take())
        };
        if let Some(task) = accept_task {
            task.abort();
        }
        if let Some(connection) = connection {
            connection.close("endpoint disposed").await;
        }
        let objects = std::mem::take(&mut *self.inner.objects.lock());
        drop(objects);

        #[cfg(feature = "tracing")]
        info!(name = %self.inner.config.name, "Endpoint disposed");
    }
}

fn downcast<I>(object_id: ObjectId, proxy: Arc<dyn ProxyObject>) -> Result<Arc<I>, EndpointError>
where
    I: RemoteInterface + ?Sized,
{
    let actual = proxy.interface_name();
    I::downcast_proxy(proxy).ok_or_else(|| EndpointError::InterfaceMismatch {
        object_id,
        expected: I::NAME.to_string(),
        actual: actual.to_string(),
    })
}

impl fmt::Debug for RemotingEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemotingEndpoint")
            .field("name", &self.inner.config.name)
            .field("state", &self.state())
            .field("local_address", &self.local_address())
            .finish_non_exhaustive()
    }
}

/// Resets the state when a connect attempt ends without a connection,
/// including when the caller drops the future.
struct Attempt<'a> {
    endpoint: &'a EndpointInner,
    armed: bool,
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut core = self.endpoint.core.lock();
            if matches!(
                core.state,
                EndpointState::Connecting | EndpointState::Handshaking
            ) {
                core.dialled_address = None;
                self.endpoint
                    .set_state(&mut core, EndpointState::Disconnected);
            }
        }
    }
}

impl EndpointInner {
    fn set_state(&self, core: &mut Core, state: EndpointState) {
        core.state = state;
        self.state.send_replace(state);
    }

    fn ensure_not_disposed(&self) -> Result<(), EndpointError> {
        if self.core.lock().state == EndpointState::Disposed {
            Err(EndpointError::Disposed)
        } else {
            Ok(())
        }
    }

    fn current_connection(&self) -> Option<Arc<Connection>> {
        self.core.lock().connection.clone()
    }

    fn grain(&self, object_id: ObjectId) -> Grain {
        Grain::new(
            object_id,
            Arc::clone(&self.channel),
            Arc::clone(&self.serializer),
        )
    }

    fn allocate_object_id(&self, objects: &Objects) -> ObjectId {
        loop {
            let candidate = ObjectId::new(self.next_object_id.fetch_add(1, Ordering::Relaxed));
            if objects.is_free(candidate) {
                return candidate;
            }
        }
    }

    /// Returns the live proxy for `object_id` or creates one. Fails if a
    /// servant owns the id.
    fn proxy_object(
        &self,
        object_id: ObjectId,
        interface: &'static str,
        create: fn(Grain) -> Arc<dyn ProxyObject>,
    ) -> Result<Arc<dyn ProxyObject>, ObjectId> {
        let mut objects = self.objects.lock();
        if let Some(proxy) = objects.live_proxy(object_id) {
            return Ok(proxy);
        }
        if objects.servants.contains_key(&object_id) {
            return Err(object_id);
        }
        let proxy = create(self.grain(object_id));
        objects.proxies.insert(object_id, Arc::downgrade(&proxy));

        #[cfg(feature = "tracing")]
        debug!(%object_id, interface, "Created proxy");
        #[cfg(not(feature = "tracing"))]
        let _ = interface;

        Ok(proxy)
    }

    /// Opens a transport to `address` and runs the outgoing handshake.
    async fn dial(
        &self,
        address: &Address,
    ) -> Result<(Box<dyn Transport>, Handshake), EndpointError> {
        let mut transport = address
            .connect(&self.config.network)
            .await
            .map_err(|error| EndpointError::NoSuchEndpoint {
                address: address.to_string(),
                reason: error.to_string(),
            })?;

        {
            let mut core = self.core.lock();
            if core.state != EndpointState::Connecting {
                return Err(EndpointError::Disposed);
            }
            self.set_state(&mut core, EndpointState::Handshaking);
        }

        let handshake = tokio::time::timeout(
            self.config.handshake_timeout,
            handshake::outgoing(&mut transport, &self.config),
        )
        .await
        .map_err(|_| EndpointError::HandshakeFailed {
            reason: format!("no answer within {:?}", self.config.handshake_timeout),
        })??;
        Ok((transport, handshake))
    }

    /// Runs the incoming handshake on an accepted transport.
    async fn accept(self: Arc<Self>, mut transport: Box<dyn Transport>) {
        let claimed = {
            let mut core = self.core.lock();
            let free = core.state == EndpointState::Disconnected;
            if free {
                self.set_state(&mut core, EndpointState::Handshaking);
            }
            free
        };
        let mut attempt = Attempt {
            endpoint: &self,
            armed: claimed,
        };

        let result = tokio::time::timeout(
            self.config.handshake_timeout,
            handshake::incoming(&mut transport, &self.config, !claimed),
        )
        .await;
        let handshake = match result {
            Ok(Ok(handshake)) if claimed => handshake,
            Ok(Ok(_)) => return,
            Ok(Err(_error)) => {
                #[cfg(feature = "tracing")]
                warn!(endpoint = %self.config.name, "Rejected incoming connection: {}", _error);
                return;
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                warn!(endpoint = %self.config.name, "Incoming handshake timed out");
                return;
            }
        };

        attempt.armed = false;
        drop(attempt);
        if let Err(_error) = self.install(transport, handshake, None) {
            #[cfg(feature = "tracing")]
            warn!(endpoint = %self.config.name, "Dropping incoming connection: {}", _error);
        }
    }

    /// Starts the connection tasks and publishes the connection.
    fn install(
        self: &Arc<Self>,
        transport: Box<dyn Transport>,
        handshake: Handshake,
        dialled: Option<Address>,
    ) -> Result<ConnectionId, EndpointError> {
        let remote_address = transport.metadata().peer_address.clone();
        let connection_id = handshake.connection_id;
        let connection = Connection::start(
            transport,
            connection_id,
            handshake.peer_name,
            remote_address,
            self.config.max_frame_size,
            self.config.queue_depth,
            Arc::downgrade(self),
        );

        let mut core = self.core.lock();
        if core.state != EndpointState::Handshaking {
            connection.abort_tasks();
            return Err(EndpointError::Disposed);
        }
        core.connection = Some(Arc::clone(&connection));
        core.dialled_address = dialled;
        self.set_state(&mut core, EndpointState::Connected);

        #[cfg(feature = "tracing")]
        info!(
            endpoint = %self.config.name,
            %connection_id,
            peer = %connection.peer_name(),
            "Connected"
        );

        Ok(connection_id)
    }

    /// Tears down the connection `id`, or whichever is current for `None`.
    pub(crate) async fn drop_connection(&self, id: Option<ConnectionId>, reason: &str) -> bool {
        let connection = {
            let mut core = self.core.lock();
            match &core.connection {
                Some(current) if id.is_none_or(|id| current.id() == id) => {}
                _ => return false,
            }
            let connection = core.connection.take();
            core.dialled_address = None;
            if core.state != EndpointState::Disposed {
                self.set_state(&mut core, EndpointState::Disconnected);
            }
            connection
        };
        if let Some(connection) = connection {
            connection.close(reason).await;
        }
        let servants: Vec<Arc<dyn Servant>> = {
            let mut objects = self.objects.lock();
            objects.proxies.clear();
            objects.servants.values().cloned().collect()
        };
        for servant in servants {
            servant.connection_closed();
        }

        #[cfg(feature = "tracing")]
        info!(endpoint = %self.config.name, "Disconnected: {}", reason);

        true
    }

    /// Sends a call on the current connection and decodes a failed response.
    async fn call(
        &self,
        object_id: ObjectId,
        interface: &str,
        method: &str,
        arguments: Bytes,
    ) -> Result<Bytes, RemotingError> {
        let connection = match self.current_connection() {
            Some(connection) => connection,
            None => {
                self.ensure_not_disposed()?;
                return Err(RemotingError::NotConnected);
            }
        };
        let call = CallFrame {
            rpc_id: self.rpc_ids.next(),
            object_id,
            interface: interface.to_string(),
            method: method.to_string(),
            payload: arguments,
        };
        let response = connection.call(call).await??;

        match response.status {
            ResponseStatus::Success => Ok(response.payload),
            ResponseStatus::Fault => {
                let mut reader = BinaryReader::new(&response.payload);
                Err(decode_error(&self.serializer, &mut reader)?)
            }
        }
    }

    /// Executes an inbound call and builds its response.
    pub(crate) async fn dispatch(&self, call: CallFrame) -> ResponseFrame {
        let rpc_id = call.rpc_id;
        match self.invoke(&call).await {
            Ok(payload) => ResponseFrame {
                rpc_id,
                status: ResponseStatus::Success,
                payload,
            },
            Err(error) => {
                #[cfg(feature = "tracing")]
                debug!(
                    %rpc_id,
                    object_id = %call.object_id,
                    interface = %call.interface,
                    method = %call.method,
                    "Call failed: {}",
                    error
                );
                self.fault_response(rpc_id, &error)
            }
        }
    }

    /// Encodes `error` as the fault response of `rpc_id`.
    pub(crate) fn fault_response(&self, rpc_id: RpcId, error: &RemotingError) -> ResponseFrame {
        let mut writer = BinaryWriter::new();
        if let Err(encode) = encode_error(&self.serializer, &mut writer, error) {
            writer = BinaryWriter::new();
            let fallback = RemotingError::Protocol {
                message: format!("{error} (fault could not be encoded: {encode})"),
            };
            if encode_error(&self.serializer, &mut writer, &fallback).is_err() {
                writer = BinaryWriter::new();
            }
        }
        ResponseFrame {
            rpc_id,
            status: ResponseStatus::Fault,
            payload: writer.into_bytes(),
        }
    }

    async fn invoke(&self, call: &CallFrame) -> Result<Bytes, RemotingError> {
        let mut arguments = BinaryReader::new(&call.payload);

        let servant = self.objects.lock().servants.get(&call.object_id).cloned();
        if let Some(servant) = servant {
            if servant.interface_name() != call.interface {
                return Err(RemotingError::TypeMismatch {
                    expected: call.interface.clone(),
                    actual: servant.interface_name().to_string(),
                });
            }
            let mut result = BinaryWriter::new();
            servant
                .invoke(&call.method, &mut arguments, &mut result)
                .await?;
            arguments.finish()?;
            return Ok(result.into_bytes());
        }

        let proxy = self.objects.lock().live_proxy(call.object_id);
        if let Some(proxy) = proxy {
            proxy.invoke_event(&call.method, &mut arguments).await?;
            arguments.finish()?;
            return Ok(Bytes::new());
        }

        Err(RemotingError::NoSuchObject {
            object_id: call.object_id,
        })
    }
}

impl ObjectTable for EndpointInner {
    fn servant_for(
        &self,
        value: &dyn Any,
        hooks: &InterfaceHooks,
    ) -> Result<ObjectId, EncodeError> {
        let mismatch = || EncodeError::TypeMismatch {
            expected: hooks.name().to_string(),
        };
        let identity = (hooks.identity)(value).ok_or_else(mismatch)?;
        if self.core.lock().state == EndpointState::Disposed {
            return Err(EncodeError::ServantUnavailable {
                interface: hooks.name().to_string(),
                reason: "endpoint has been disposed".to_string(),
            });
        }

        let mut objects = self.objects.lock();
        if let Some(object_id) = objects.identities.get(&(identity, hooks.name())) {
            return Ok(*object_id);
        }
        let object_id = self.allocate_object_id(&objects);
        let servant = (hooks.create_servant)(value, self.grain(object_id)).ok_or_else(mismatch)?;
        objects.servants.insert(object_id, servant);
        objects.identities.insert((identity, hooks.name()), object_id);

        #[cfg(feature = "tracing")]
        debug!(%object_id, interface = hooks.name(), "Exposed servant for by-reference value");

        Ok(object_id)
    }

    fn proxy_for(
        &self,
        object_id: ObjectId,
        hooks: &InterfaceHooks,
    ) -> Result<BoxedValue, DecodeError> {
        let proxy = self
            .proxy_object(object_id, hooks.name(), hooks.create_proxy)
            .map_err(|object_id| DecodeError::InvalidValue {
                type_name: hooks.name().to_string(),
                reason: format!("object id {object_id} belongs to a local servant"),
            })?;
        let actual = proxy.interface_name();
        (hooks.wrap_proxy)(proxy).ok_or_else(|| DecodeError::InterfaceMismatch {
            expected: hooks.name().to_string(),
            actual: actual.to_string(),
        })
    }
}

impl Drop for EndpointInner {
    fn drop(&mut self) {
        let core = self.core.get_mut();
        if let Some(task) = core.accept_task.take() {
            task.abort();
        }
        if let Some(connection) = core.connection.take() {
            connection.abort_tasks();
        }
    }
}

async fn accept_loop(endpoint: Weak<EndpointInner>, listener: Box<dyn Listener>) {
    loop {
        let transport = match listener.accept().await {
            Ok(transport) => transport,
            Err(TransportError::Closed) => break,
            Err(_error) => {
                #[cfg(feature = "tracing")]
                warn!("Accept failed: {}", _error);
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };
        let Some(endpoint) = endpoint.upgrade() else {
            break;
        };
        tokio::spawn(endpoint.accept(transport));
    }
}
