//! Tests for macro expansion.
//!
//! These tests verify that `#[remoting::interface]` and `#[derive(Remotable)]`
//! produce descriptions and dispatch tables the runtime can use.

use std::sync::Arc;

use bytes::Bytes;
use remoting::serialization::{BinaryReader, BinaryWriter, Serializer};
use remoting::types::{MethodKind, Primitive, Remotable, SerializationKind, TypeModel, TypeShape};
use remoting::{
    EndpointChannel, Event, Grain, ObjectId, RemoteInterface, RemotingError, Servant, Task,
};

#[derive(Debug, PartialEq, Remotable)]
struct Point {
    y: f64,
    x: f64,
}

#[derive(Debug, Default, PartialEq, Remotable)]
#[remoting(name = "Acme.Session", after_deserialize = "Session::mark_received")]
struct Session {
    user: String,
    #[remoting(skip)]
    received: bool,
}

impl Session {
    fn mark_received(&mut self) {
        self.received = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Remotable)]
#[repr(u8)]
enum Color {
    Red = 1,
    Green = 2,
    Blue = 4,
}

#[derive(Debug, Remotable)]
#[remoting(singleton = "Clock::instance")]
struct Clock;

impl Clock {
    fn instance() -> Self {
        Clock
    }
}

#[remoting::interface]
pub trait Shape {
    async fn area(&self) -> Result<f64, RemotingError>;
    fn resized(&self) -> &Event<f64>;
}

#[remoting::interface(name = "Acme.Circle")]
pub trait Circle: Shape {
    async fn radius(&self) -> Result<f64, RemotingError>;
    async fn scale(&self, factor: f64, origin: Point) -> Result<Point, RemotingError>;
    fn warm_up(&self) -> Task<u32>;
}

struct Disc {
    radius: f64,
    resized: Event<f64>,
}

#[remoting::async_trait]
impl Shape for Disc {
    async fn area(&self) -> Result<f64, RemotingError> {
        Ok(std::f64::consts::PI * self.radius * self.radius)
    }

    fn resized(&self) -> &Event<f64> {
        &self.resized
    }
}

#[remoting::async_trait]
impl Circle for Disc {
    async fn radius(&self) -> Result<f64, RemotingError> {
        Ok(self.radius)
    }

    async fn scale(&self, factor: f64, origin: Point) -> Result<Point, RemotingError> {
        Ok(Point {
            x: origin.x * factor,
            y: origin.y * factor,
        })
    }

    fn warm_up(&self) -> Task<u32> {
        Task::new(async { Ok(1) })
    }
}

struct Unreachable;

#[remoting::async_trait]
impl EndpointChannel for Unreachable {
    async fn call_remote_method(
        &self,
        _object_id: ObjectId,
        _interface: &str,
        _method: &str,
        _arguments: Bytes,
    ) -> Result<Bytes, RemotingError> {
        Err(RemotingError::NotConnected)
    }
}

fn servant() -> (Arc<dyn Servant>, Arc<Serializer>) {
    let serializer = Arc::new(Serializer::new(Arc::new(TypeModel::new())));
    let grain = Grain::new(ObjectId::new(7), Arc::new(Unreachable), Arc::clone(&serializer));
    let subject: Arc<dyn Circle> = Arc::new(Disc {
        radius: 1.0,
        resized: Event::new(),
    });
    (<dyn Circle as RemoteInterface>::create_servant(subject, grain), serializer)
}

#[test]
fn test_derived_fields_are_sorted() {
    let description = Point::describe();
    assert_eq!(description.kind(), SerializationKind::DataContract);
    let names: Vec<_> = description.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, ["x", "y"]);
}

#[test]
fn test_skipped_field_and_callback() {
    let description = Session::describe();
    assert_eq!(description.name(), "Acme.Session");
    assert_eq!(description.fields().len(), 1);

    let serializer = Serializer::new(Arc::new(TypeModel::new()));
    let bytes = serializer
        .serialize(&Session {
            user: "ada".to_string(),
            received: false,
        })
        .unwrap();
    let session: Session = serializer.deserialize(&bytes).unwrap();
    assert_eq!(session.user, "ada");
    assert!(session.received);
}

#[test]
fn test_enum_storage_and_values() {
    let description = Color::describe();
    let TypeShape::Enum(shape) = description.shape() else {
        panic!("expected an enum shape");
    };
    assert_eq!(shape.storage(), Primitive::U8);
    let variants: Vec<_> = shape
        .variants()
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .collect();
    assert_eq!(variants, [("Red", 1), ("Green", 2), ("Blue", 4)]);

    let serializer = Serializer::new(Arc::new(TypeModel::new()));
    let bytes = serializer.serialize(&Color::Blue).unwrap();
    assert_eq!(serializer.deserialize::<Color>(&bytes).unwrap(), Color::Blue);
}

#[test]
fn test_singleton() {
    assert_eq!(Clock::describe().kind(), SerializationKind::Singleton);
}

#[test]
fn test_interface_descriptions() {
    assert_eq!(<dyn Shape as RemoteInterface>::NAME, "Shape");
    assert_eq!(<dyn Circle as RemoteInterface>::NAME, "Acme.Circle");

    let methods = <dyn Circle as RemoteInterface>::methods();
    let names: Vec<_> = methods.iter().map(|m| (m.name(), m.kind())).collect();
    assert_eq!(
        names,
        [
            ("area", MethodKind::Call),
            ("radius", MethodKind::Call),
            ("resized", MethodKind::Event),
            ("scale", MethodKind::Call),
            ("warm_up", MethodKind::Task),
        ]
    );
    let scale = methods.iter().find(|m| m.name() == "scale").unwrap();
    let parameters: Vec<_> = scale.parameters().iter().map(|p| p.name()).collect();
    assert_eq!(parameters, ["factor", "origin"]);
}

#[test]
fn test_servant_method_table_includes_inherited_methods() {
    let (servant, _) = servant();
    assert_eq!(servant.interface_name(), "Acme.Circle");
    assert_eq!(servant.object_id(), ObjectId::new(7));
    assert_eq!(servant.methods(), ["area", "radius", "scale", "warm_up"]);
}

#[tokio::test]
async fn test_servant_dispatches_own_and_inherited_methods() {
    let (servant, serializer) = servant();

    let mut result = BinaryWriter::new();
    servant
        .invoke("area", &mut BinaryReader::new(&[]), &mut result)
        .await
        .unwrap();
    let area: f64 = serializer.deserialize(result.as_slice()).unwrap();
    assert_eq!(area.to_bits(), std::f64::consts::PI.to_bits());

    let mut arguments = BinaryWriter::new();
    serializer.write(&mut arguments, &2.0f64).unwrap();
    serializer.write(&mut arguments, &Point { x: 1.0, y: -3.0 }).unwrap();
    let mut result = BinaryWriter::new();
    servant
        .invoke("scale", &mut BinaryReader::new(arguments.as_slice()), &mut result)
        .await
        .unwrap();
    let point: Point = serializer.deserialize(result.as_slice()).unwrap();
    assert_eq!(point, Point { x: 2.0, y: -6.0 });
}

#[tokio::test]
async fn test_servant_rejects_unknown_and_unstarted() {
    let (servant, _) = servant();

    let mut result = BinaryWriter::new();
    let error = servant
        .invoke("perimeter", &mut BinaryReader::new(&[]), &mut result)
        .await
        .unwrap_err();
    assert!(matches!(error, RemotingError::UnknownMethod { .. }));

    let error = servant
        .invoke("warm_up", &mut BinaryReader::new(&[]), &mut result)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        RemotingError::NotSupported { ref method, .. } if method == "warm_up"
    ));
}
