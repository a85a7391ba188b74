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


//! Integration tests for calls between two connected endpoints.
//!
//! These tests verify that proxies and servants cooperate over a memory
//! network:
//! - Plain calls and many concurrent calls
//! - Remote faults, with and without a decodable value
//! - Started and unstarted tasks
//! - Remote event subscriptions
//! - By-reference arguments and their identity
//! - Calls that address the wrong object or interface

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use remoting::transport::MemoryNetwork;
use remoting::types::Remotable;
use remoting::{
    EndpointConfig, Event, ObjectId, RemoteInterface, RemotingEndpoint, RemotingError, Task,
};

#[derive(Debug, Clone, PartialEq, Remotable)]
struct DivideByZero {
    dividend: i32,
}

impl fmt::Display for DivideByZero {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot divide {} by zero", self.dividend)
    }
}

impl std::error::Error for DivideByZero {}

#[derive(Debug, Clone, PartialEq, Remotable)]
struct Overflow;

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("arithmetic overflow")
    }
}

impl std::error::Error for Overflow {}

#[remoting::interface]
pub trait Calculator {
    async fn add(&self, a: i32, b: i32) -> Result<i32, RemotingError>;
    async fn checked_add(&self, a: i32, b: i32) -> Result<i32, RemotingError>;
    async fn divide(&self, a: i32, b: i32) -> Result<i32, RemotingError>;
    async fn echo_after(&self, value: u32, delay_ms: u64) -> Result<u32, RemotingError>;
    async fn compute(&self, value: i32) -> Result<(), RemotingError>;
    fn sum_slowly(&self, values: Vec<i64>) -> Task<i64>;
    fn lazy(&self) -> Task<i64>;
    fn computed(&self) -> &Event<i32>;
}

#[remoting::interface]
pub trait Listener {
    async fn notify(&self, message: String) -> Result<(), RemotingError>;
}

#[remoting::interface]
pub trait Registry {
    async fn register(&self, listener: Arc<dyn Listener>) -> Result<u32, RemotingError>;
    async fn broadcast(&self, message: String) -> Result<u32, RemotingError>;
}

#[derive(Default)]
struct TestCalculator {
    computed: Event<i32>,
}

#[remoting::async_trait]
impl Calculator for TestCalculator {
    async fn add(&self, a: i32, b: i32) -> Result<i32, RemotingError> {
        Ok(a + b)
    }

    async fn checked_add(&self, a: i32, b: i32) -> Result<i32, RemotingError> {
        a.checked_add(b).ok_or_else(|| RemotingError::fault(Overflow))
    }

    async fn divide(&self, a: i32, b: i32) -> Result<i32, RemotingError> {
        if b == 0 {
            return Err(RemotingError::fault(DivideByZero { dividend: a }));
        }
        Ok(a / b)
    }

    async fn echo_after(&self, value: u32, delay_ms: u64) -> Result<u32, RemotingError> {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(value)
    }

    async fn compute(&self, value: i32) -> Result<(), RemotingError> {
        self.computed.raise(value).await
    }

    fn sum_slowly(&self, values: Vec<i64>) -> Task<i64> {
        Task::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(values.iter().sum())
        })
    }

    fn lazy(&self) -> Task<i64> {
        Task::new(async { Ok(0) })
    }

    fn computed(&self) -> &Event<i32> {
        &self.computed
    }
}

#[derive(Default)]
struct RecordingListener {
    messages: Mutex<Vec<String>>,
}

#[remoting::async_trait]
impl Listener for RecordingListener {
    async fn notify(&self, message: String) -> Result<(), RemotingError> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

#[derive(Default)]
struct TestRegistry {
    listeners: Mutex<Vec<Arc<dyn Listener>>>,
}

#[remoting::async_trait]
impl Registry for TestRegistry {
    async fn register(&self, listener: Arc<dyn Listener>) -> Result<u32, RemotingError> {
        let mut listeners = self.listeners.lock().unwrap();
        let known = listeners.iter().any(|known| {
            Arc::as_ptr(known) as *const () == Arc::as_ptr(&listener) as *const ()
        });
        if !known {
            listeners.push(listener);
        }
        Ok(listeners.len() as u32)
    }

    async fn broadcast(&self, message: String) -> Result<u32, RemotingError> {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in &listeners {
            listener.notify(message.clone()).await?;
        }
        Ok(listeners.len() as u32)
    }
}

const CALCULATOR: ObjectId = ObjectId::new(1);
const REGISTRY: ObjectId = ObjectId::new(2);

/// Binds a server hosting a calculator and a registry, and connects a client.
async fn connected_pair() -> (RemotingEndpoint, RemotingEndpoint) {
    let network = MemoryNetwork::new();
    let server = RemotingEndpoint::new(
        EndpointConfig::new()
            .with_name("server")
            .with_network(network.clone()),
    )
    .unwrap();
    server
        .create_servant::<dyn Calculator>(CALCULATOR, Arc::new(TestCalculator::default()))
        .unwrap();
    server
        .create_servant::<dyn Registry>(REGISTRY, Arc::new(TestRegistry::default()))
        .unwrap();
    let address = server.bind("memory://calculator").await.unwrap();

    let client = RemotingEndpoint::new(
        EndpointConfig::new()
            .with_name("client")
            .with_network(network),
    )
    .unwrap();
    client
        .connect(&address.to_string(), Duration::from_secs(5))
        .await
        .unwrap();

    let mut state = server.watch_state();
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|state| state.is_connected()))
        .await
        .expect("server never saw the connection")
        .unwrap();
    (server, client)
}

#[tokio::test]
async fn test_simple_call() {
    let (_server, client) = connected_pair().await;
    let calculator = client.create_proxy::<dyn Calculator>(CALCULATOR).unwrap();
    assert_eq!(calculator.add(40, 2).await.unwrap(), 42);
    assert_eq!(calculator.add(-7, 7).await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_calls_are_correlated() {
    let (server, client) = connected_pair().await;
    let spare = ObjectId::new(3);
    server
        .create_servant::<dyn Calculator>(spare, Arc::new(TestCalculator::default()))
        .unwrap();
    let first = client.create_proxy::<dyn Calculator>(CALCULATOR).unwrap();
    let second = client.create_proxy::<dyn Calculator>(spare).unwrap();

    // Later calls finish first, so responses arrive out of order and
    // alternate between the two objects.
    let handles: Vec<_> = (0..50u32)
        .map(|value| {
            let calculator = if value % 2 == 0 {
                Arc::clone(&first)
            } else {
                Arc::clone(&second)
            };
            tokio::spawn(async move {
                calculator
                    .echo_after(value, u64::from(50 - value) * 2)
                    .await
            })
        })
        .collect();

    for (value, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap().unwrap(), value as u32);
    }
}

#[tokio::test]
async fn test_fault_value_reaches_caller() {
    let (_server, client) = connected_pair().await;
    client.serializer().register::<DivideByZero>().unwrap();
    let calculator = client.create_proxy::<dyn Calculator>(CALCULATOR).unwrap();

    let error = calculator.divide(7, 0).await.unwrap_err();
    let RemotingError::Fault(fault) = error else {
        panic!("expected a fault, got {error:?}");
    };
    assert_eq!(fault.message(), "cannot divide 7 by zero");
    assert_eq!(
        fault.downcast_ref::<DivideByZero>(),
        Some(&DivideByZero { dividend: 7 })
    );
    assert_eq!(calculator.divide(7, 2).await.unwrap(), 3);
}

#[tokio::test]
async fn test_unregistered_fault_keeps_type_name_and_message() {
    let (_server, client) = connected_pair().await;
    let calculator = client.create_proxy::<dyn Calculator>(CALCULATOR).unwrap();

    let error = calculator.checked_add(i32::MAX, 1).await.unwrap_err();
    let RemotingError::Fault(fault) = error else {
        panic!("expected a fault, got {error:?}");
    };
    assert!(fault.is_unserializable());
    assert_eq!(fault.message(), "arithmetic overflow");
    assert_eq!(fault.type_name(), std::any::type_name::<Overflow>());
}

#[tokio::test]
async fn test_started_task_completes_remotely() {
    let (_server, client) = connected_pair().await;
    let calculator = client.create_proxy::<dyn Calculator>(CALCULATOR).unwrap();

    let task = calculator.sum_slowly(vec![1, 2, 3, i64::from(i32::MAX)]);
    assert!(task.is_started());
    assert_eq!(task.await.unwrap(), 6 + i64::from(i32::MAX));
}

#[tokio::test]
async fn test_unstarted_task_is_not_supported() {
    let (_server, client) = connected_pair().await;
    let calculator = client.create_proxy::<dyn Calculator>(CALCULATOR).unwrap();

    let error = calculator.lazy().await.unwrap_err();
    match error {
        RemotingError::NotSupported {
            interface,
            method,
            object_id,
        } => {
            assert_eq!(interface, "Calculator");
            assert_eq!(method, "lazy");
            assert_eq!(object_id, CALCULATOR);
        }
        other => panic!("expected NotSupported, got {other:?}"),
    }
}

#[tokio::test]
async fn test_remote_event_runs_handlers_in_order() {
    let (_server, client) = connected_pair().await;
    let calculator = client.create_proxy::<dyn Calculator>(CALCULATOR).unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut subscriptions = Vec::new();
    for tag in ['A', 'B', 'C'] {
        let log = Arc::clone(&log);
        let id = calculator
            .computed()
            .subscribe(move |value: i32| {
                log.lock().unwrap().push((tag, value));
                if tag == 'B' && value == 42 {
                    return Err(RemotingError::fault(Overflow));
                }
                Ok(())
            })
            .await
            .unwrap();
        subscriptions.push(id);
    }

    // B fails; A and C still run and B's error reaches the raiser last.
    let error = calculator.compute(42).await.unwrap_err();
    assert_eq!(*log.lock().unwrap(), [('A', 42), ('B', 42), ('C', 42)]);
    let RemotingError::Fault(fault) = error else {
        panic!("expected a fault, got {error:?}");
    };
    assert_eq!(fault.message(), "arithmetic overflow");

    calculator.compute(1).await.unwrap();
    assert_eq!(log.lock().unwrap().len(), 6);

    for id in subscriptions {
        assert!(calculator.computed().unsubscribe(id).await.unwrap());
    }
    calculator.compute(7).await.unwrap();
    assert_eq!(log.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn test_by_reference_argument_keeps_identity() {
    let (_server, client) = connected_pair().await;
    let registry = client.create_proxy::<dyn Registry>(REGISTRY).unwrap();

    let first = Arc::new(RecordingListener::default());
    let second = Arc::new(RecordingListener::default());
    let first_handle: Arc<dyn Listener> = first.clone();
    let second_handle: Arc<dyn Listener> = second.clone();

    assert_eq!(registry.register(Arc::clone(&first_handle)).await.unwrap(), 1);
    assert_eq!(registry.register(Arc::clone(&first_handle)).await.unwrap(), 1);
    assert_eq!(registry.register(second_handle).await.unwrap(), 2);

    assert_eq!(registry.broadcast("hello".to_string()).await.unwrap(), 2);
    assert_eq!(*first.messages.lock().unwrap(), ["hello"]);
    assert_eq!(*second.messages.lock().unwrap(), ["hello"]);
}

#[tokio::test]
async fn test_wrong_interface_is_a_type_mismatch() {
    let (_server, client) = connected_pair().await;
    let listener = client.create_proxy::<dyn Listener>(CALCULATOR).unwrap();

    let error = listener.notify("hi".to_string()).await.unwrap_err();
    match error {
        RemotingError::TypeMismatch { expected, actual } => {
            assert_eq!(expected, <dyn Listener as RemoteInterface>::NAME);
            assert_eq!(actual, <dyn Calculator as RemoteInterface>::NAME);
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_object() {
    let (_server, client) = connected_pair().await;
    let calculator = client
        .create_proxy::<dyn Calculator>(ObjectId::new(99))
        .unwrap();

    let error = calculator.add(1, 2).await.unwrap_err();
    assert!(matches!(
        error,
        RemotingError::NoSuchObject { object_id } if object_id == ObjectId::new(99)
    ));
}

#[tokio::test]
async fn test_proxies_are_shared_by_id() {
    let (_server, client) = connected_pair().await;
    let first = client.get_or_create_proxy::<dyn Calculator>(CALCULATOR).unwrap();
    let second = client.get_or_create_proxy::<dyn Calculator>(CALCULATOR).unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&first), Arc::as_ptr(&second)));
    assert!(client.create_proxy::<dyn Calculator>(CALCULATOR).is_err());
}
