//! Procedural macros for the remoting runtime.
//!
//! This crate provides two macros, both re-exported by `remoting`:
//!
//! - `#[remoting::interface]` turns a trait into a remote interface,
//!   generating a proxy, a servant and the `RemoteInterface` glue,
//! - `#[derive(Remotable)]` describes a struct or field-less enum to the
//!   type model so it can be sent by value.
//!
//! # Example
//!
//! ```ignore
//! use remoting::{Event, RemotingError, Task};
//! use remoting::types::Remotable;
//!
//! #[derive(Remotable)]
//! struct Job {
//!     id: u64,
//!     command: String,
//! }
//!
//! #[remoting::interface]
//! pub trait Scheduler {
//!     async fn submit(&self, job: Job) -> Result<u64, RemotingError>;
//!     fn drain(&self) -> Task<u32>;
//!     fn finished(&self) -> &Event<u64>;
//! }
//! ```
//!
//! This will generate:
//! - `SchedulerProxy`, which implements `Scheduler` for an object on the peer
//! - `SchedulerServant`, which dispatches incoming calls onto a local `Arc<dyn Scheduler>`
//! - `impl RemoteInterface for dyn Scheduler`, which makes `Arc<dyn Scheduler>` remotable

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemTrait, parse_macro_input};

mod derive;
mod generate;
mod parse;

/// Declares a remote interface.
///
/// # Method shapes
///
/// Every method takes `&self` and owned [`Remotable`] arguments, and has one
/// of three shapes:
///
/// 1. **Calls**, answered once:
///    ```ignore
///    async fn method(&self, arg: String) -> Result<i32, MyError>;
///    ```
///    `MyError` must implement `From<RemotingError>` and `Into<RemotingError>`.
///
/// 2. **Tasks**, started work the caller may await later:
///    ```ignore
///    fn method(&self, arg: u32) -> Task<i32>;
///    ```
///    A servant whose subject returns a task that was not started answers
///    with `RemotingError::NotSupported`.
///
/// 3. **Events**, observable from the peer:
///    ```ignore
///    fn changed(&self) -> &Event<String>;
///    ```
///
/// # Inheritance
///
/// Supertraits that are themselves interfaces are inherited: the proxy
/// implements them and the servant dispatches their methods. Every interface
/// ancestor has to be listed directly, `Send`, `Sync` and `'static` are added
/// when missing.
///
/// # Attributes
///
/// - `name = "..."`: wire name of the interface, the trait name by default.
///
/// Implementations of the trait must be annotated with
/// `#[remoting::async_trait]`.
///
/// [`Remotable`]: derive@Remotable
#[proc_macro_attribute]
pub fn interface(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemTrait);

    let args = match parse::InterfaceArgs::parse(attr.into()) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error().into(),
    };

    let interface = match parse::parse_interface(&input, args) {
        Ok(interface) => interface,
        Err(err) => return err.to_compile_error().into(),
    };

    generate::expand(input, &interface).into()
}

/// Derives `remoting::types::Remotable`.
///
/// Structs become data contracts whose fields are sent sorted by name.
/// Field-less enums are sent as their discriminant, stored in the integer
/// type of their `#[repr]` (`i32` by default).
///
/// # Attributes
///
/// On the type:
/// - `#[remoting(name = "...")]`: type name, the Rust name by default
/// - `#[remoting(singleton = "path::to::factory")]`: never send members, the
///   receiver calls the factory instead
/// - `#[remoting(not_serializable)]`: refuse to send the type at all
/// - `#[remoting(after_deserialize = "path::to::fn")]`: run `fn(&mut Self)`
///   on every received value
///
/// On a field:
/// - `#[remoting(skip)]`: do not send the field, rebuild it with `Default`
#[proc_macro_derive(Remotable, attributes(remoting))]
pub fn derive_remotable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive::expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
