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


//! Integration tests for the endpoint life cycle.
//!
//! These tests verify connection management across two endpoints:
//! - Authentication success and failure
//! - Disconnects failing calls in flight and keeping servants
//! - A second client turned away while connected
//! - Event forwarding across disconnects
//! - Reconnection with a retry strategy
//! - Disposal

use std::sync::{Arc, Mutex};
use std::time::Duration;

use remoting::endpoint::SharedSecretAuthenticator;
use remoting::transport::MemoryNetwork;
use remoting::{
    EndpointConfig, EndpointError, EndpointState, Event, ExponentialBackoff, NoReconnect,
    ObjectId, RemotingEndpoint, RemotingError,
};

#[remoting::interface]
pub trait Sleeper {
    async fn nap(&self, millis: u64) -> Result<u64, RemotingError>;
}

struct Napper;

#[remoting::async_trait]
impl Sleeper for Napper {
    async fn nap(&self, millis: u64) -> Result<u64, RemotingError> {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(millis)
    }
}

#[remoting::interface]
pub trait Metronome {
    async fn tick(&self, beat: u32) -> Result<(), RemotingError>;
    fn ticked(&self) -> &Event<u32>;
}

#[derive(Default)]
struct TestMetronome {
    ticked: Event<u32>,
}

#[remoting::async_trait]
impl Metronome for TestMetronome {
    async fn tick(&self, beat: u32) -> Result<(), RemotingError> {
        self.ticked.raise(beat).await
    }

    fn ticked(&self) -> &Event<u32> {
        &self.ticked
    }
}

const SLEEPER: ObjectId = ObjectId::new(1);
const METRONOME: ObjectId = ObjectId::new(2);

fn endpoint(name: &str, network: &MemoryNetwork) -> RemotingEndpoint {
    RemotingEndpoint::new(
        EndpointConfig::new()
            .with_name(name)
            .with_network(network.clone()),
    )
    .unwrap()
}

fn server(network: &MemoryNetwork, config: EndpointConfig) -> RemotingEndpoint {
    let server = RemotingEndpoint::new(config.with_name("server").with_network(network.clone()))
        .unwrap();
    server
        .create_servant::<dyn Sleeper>(SLEEPER, Arc::new(Napper))
        .unwrap();
    server
}

async fn wait_for_state(endpoint: &RemotingEndpoint, wanted: EndpointState) {
    let mut state = endpoint.watch_state();
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|state| *state == wanted))
        .await
        .unwrap_or_else(|_| panic!("endpoint never reached {wanted}"))
        .unwrap();
}

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_authenticated_connect() {
    let network = MemoryNetwork::new();
    let server = server(
        &network,
        EndpointConfig::new()
            .with_client_authenticator(Arc::new(SharedSecretAuthenticator::new("s3cret"))),
    );
    let address = server.bind("memory://secure").await.unwrap();

    let client = RemotingEndpoint::new(
        EndpointConfig::new()
            .with_name("client")
            .with_network(network.clone())
            .with_client_authenticator(Arc::new(SharedSecretAuthenticator::new("s3cret"))),
    )
    .unwrap();
    client.connect(&address.to_string(), TIMEOUT).await.unwrap();
    assert_eq!(client.state(), EndpointState::Connected);
    assert_eq!(client.peer_name().as_deref(), Some("server"));

    let sleeper = client.create_proxy::<dyn Sleeper>(SLEEPER).unwrap();
    assert_eq!(sleeper.nap(1).await.unwrap(), 1);
}

#[tokio::test]
async fn test_failed_authentication_leaves_both_sides_disconnected() {
    let network = MemoryNetwork::new();
    let server = server(
        &network,
        EndpointConfig::new()
            .with_client_authenticator(Arc::new(SharedSecretAuthenticator::new("s3cret"))),
    );
    let address = server.bind("memory://secure").await.unwrap();

    let intruder = RemotingEndpoint::new(
        EndpointConfig::new()
            .with_name("intruder")
            .with_network(network.clone())
            .with_client_authenticator(Arc::new(SharedSecretAuthenticator::new("guess"))),
    )
    .unwrap();
    let error = intruder
        .connect(&address.to_string(), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(error, EndpointError::AuthenticationFailed { .. }));
    assert_eq!(intruder.state(), EndpointState::Disconnected);
    wait_for_state(&server, EndpointState::Disconnected).await;

    let anonymous = endpoint("anonymous", &network);
    let error = anonymous
        .connect(&address.to_string(), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(error, EndpointError::AuthenticationRequired { .. }));
    assert_eq!(anonymous.state(), EndpointState::Disconnected);
}

#[tokio::test]
async fn test_connect_to_nothing() {
    let network = MemoryNetwork::new();
    let client = endpoint("client", &network);
    let error = client
        .connect("memory://nobody", TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(error, EndpointError::NoSuchEndpoint { .. }));
    assert_eq!(client.state(), EndpointState::Disconnected);

    assert!(matches!(
        client.connect("memory://nobody", Duration::ZERO).await,
        Err(EndpointError::InvalidTimeout)
    ));
}

#[tokio::test]
async fn test_connect_to_self_is_refused() {
    let network = MemoryNetwork::new();
    let server = endpoint("server", &network);
    let address = server.bind("memory://mirror").await.unwrap();
    assert!(matches!(
        server.connect(&address.to_string(), TIMEOUT).await,
        Err(EndpointError::ConnectToSelf { .. })
    ));
}

#[tokio::test]
async fn test_disconnect_fails_calls_in_flight() {
    let network = MemoryNetwork::new();
    let server = server(&network, EndpointConfig::new());
    let address = server.bind("memory://sleepy").await.unwrap();
    let client = endpoint("client", &network);
    client.connect(&address.to_string(), TIMEOUT).await.unwrap();

    let sleeper = client.create_proxy::<dyn Sleeper>(SLEEPER).unwrap();
    let pending = tokio::spawn(async move { sleeper.nap(10_000).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.disconnect().await.unwrap();
    let error = pending.await.unwrap().unwrap_err();
    assert!(matches!(error, RemotingError::ConnectionLost { .. }));
    assert_eq!(client.state(), EndpointState::Disconnected);
    wait_for_state(&server, EndpointState::Disconnected).await;

    // The servant survives and the server accepts again.
    client.connect(&address.to_string(), TIMEOUT).await.unwrap();
    let sleeper = client.create_proxy::<dyn Sleeper>(SLEEPER).unwrap();
    assert_eq!(sleeper.nap(2).await.unwrap(), 2);
}

#[tokio::test]
async fn test_second_client_is_turned_away() {
    let network = MemoryNetwork::new();
    let server = server(&network, EndpointConfig::new());
    let address = server.bind("memory://exclusive").await.unwrap();

    let first = endpoint("first", &network);
    first.connect(&address.to_string(), TIMEOUT).await.unwrap();
    wait_for_state(&server, EndpointState::Connected).await;
    let connection_id = server.connection_id();

    let second = endpoint("second", &network);
    let error = second
        .connect(&address.to_string(), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(error, EndpointError::HandshakeFailed { .. }));
    assert_eq!(second.state(), EndpointState::Disconnected);

    assert_eq!(first.state(), EndpointState::Connected);
    assert_eq!(server.state(), EndpointState::Connected);
    assert_eq!(server.connection_id(), connection_id);
    let sleeper = first.create_proxy::<dyn Sleeper>(SLEEPER).unwrap();
    assert_eq!(sleeper.nap(1).await.unwrap(), 1);
}

#[tokio::test]
async fn test_event_subscription_ends_with_connection() {
    let network = MemoryNetwork::new();
    let server = server(&network, EndpointConfig::new());
    let metronome = Arc::new(TestMetronome::default());
    server
        .create_servant::<dyn Metronome>(METRONOME, metronome.clone())
        .unwrap();
    let address = server.bind("memory://metronome").await.unwrap();

    let client = endpoint("client", &network);
    client.connect(&address.to_string(), TIMEOUT).await.unwrap();
    let proxy = client.create_proxy::<dyn Metronome>(METRONOME).unwrap();
    let beats = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&beats);
    proxy
        .ticked()
        .subscribe(move |beat: u32| {
            recorded.lock().unwrap().push(beat);
            Ok(())
        })
        .await
        .unwrap();

    metronome.ticked.raise(1).await.unwrap();
    assert_eq!(*beats.lock().unwrap(), [1]);

    client.disconnect().await.unwrap();
    wait_for_state(&server, EndpointState::Disconnected).await;
    metronome.ticked.raise(2).await.unwrap();

    // A new peer without a subscription receives nothing either.
    let other = endpoint("other", &network);
    other.connect(&address.to_string(), TIMEOUT).await.unwrap();
    wait_for_state(&server, EndpointState::Connected).await;
    metronome.ticked.raise(3).await.unwrap();
    assert_eq!(*beats.lock().unwrap(), [1]);

    // Subscribing again on the new connection resumes forwarding.
    let proxy = other.create_proxy::<dyn Metronome>(METRONOME).unwrap();
    let recorded = Arc::clone(&beats);
    proxy
        .ticked()
        .subscribe(move |beat: u32| {
            recorded.lock().unwrap().push(beat);
            Ok(())
        })
        .await
        .unwrap();
    proxy.tick(4).await.unwrap();
    assert_eq!(*beats.lock().unwrap(), [1, 4]);
}

#[tokio::test]
async fn test_calls_without_connection() {
    let network = MemoryNetwork::new();
    let client = endpoint("client", &network);
    let sleeper = client.create_proxy::<dyn Sleeper>(SLEEPER).unwrap();
    assert!(matches!(
        sleeper.nap(1).await,
        Err(RemotingError::NotConnected)
    ));
}

#[tokio::test]
async fn test_connect_with_retry_waits_for_server() {
    let network = MemoryNetwork::new();
    let client = endpoint("client", &network);

    let late_network = network.clone();
    let binder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let server = server(&late_network, EndpointConfig::new());
        server.bind("memory://late").await.unwrap();
        server
    });

    let strategy = ExponentialBackoff::new(Duration::from_millis(20))
        .with_max_delay(Duration::from_millis(100))
        .with_max_attempts(50);
    client
        .connect_with_retry("memory://late", TIMEOUT, &strategy)
        .await
        .unwrap();
    let _server = binder.await.unwrap();

    let sleeper = client.create_proxy::<dyn Sleeper>(SLEEPER).unwrap();
    assert_eq!(sleeper.nap(3).await.unwrap(), 3);
}

#[tokio::test]
async fn test_connect_with_retry_gives_up() {
    let network = MemoryNetwork::new();
    let client = endpoint("client", &network);

    let error = client
        .connect_with_retry("memory://never", TIMEOUT, &NoReconnect)
        .await
        .unwrap_err();
    assert!(matches!(error, EndpointError::NoSuchEndpoint { .. }));

    let strategy = ExponentialBackoff::new(Duration::from_millis(1)).with_max_attempts(3);
    let error = client
        .connect_with_retry("memory://never", TIMEOUT, &strategy)
        .await
        .unwrap_err();
    assert!(matches!(error, EndpointError::NoSuchEndpoint { .. }));
    assert_eq!(client.state(), EndpointState::Disconnected);
}

#[tokio::test]
async fn test_dispose() {
    let network = MemoryNetwork::new();
    let server = server(&network, EndpointConfig::new());
    let address = server.bind("memory://doomed").await.unwrap();
    let client = endpoint("client", &network);
    client.connect(&address.to_string(), TIMEOUT).await.unwrap();

    client.dispose().await;
    assert_eq!(client.state(), EndpointState::Disposed);
    assert!(matches!(
        client.connect(&address.to_string(), TIMEOUT).await,
        Err(EndpointError::Disposed)
    ));
    assert!(matches!(
        client.create_proxy::<dyn Sleeper>(SLEEPER),
        Err(EndpointError::Disposed)
    ));
    wait_for_state(&server, EndpointState::Disconnected).await;

    // Disposing twice is harmless.
    client.dispose().await;
    server.dispose().await;
    assert!(server.servant(SLEEPER).is_none());
}
