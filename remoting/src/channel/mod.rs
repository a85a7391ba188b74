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


//! Per-connection RPC plumbing.
//!
//! An outgoing call allocates an [`RpcId`], registers in [`PendingCalls`],
//! sends a [`CallFrame`] and waits for the [`ResponseFrame`] carrying the
//! same id. Inbound calls run concurrently, each tracked as a
//! [`MethodInvocation`] until its response has been queued.

mod correlation;
mod frame;
mod invocation;
mod pending;

pub use correlation::{RpcId, RpcIdGenerator};
pub use frame::{CallFrame, Frame, FrameKind, ResponseFrame, ResponseStatus};
pub use invocation::{InvocationTable, MethodInvocation};
pub use pending::{PendingCalls, PendingResult};
