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


//! Asynchronous results that may or may not have been started.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;

use tokio::task::JoinHandle;

use crate::error::RemotingError;

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, RemotingError>> + Send + 'static>>;

enum TaskState<T> {
    Created(BoxFuture<T>),
    Running(JoinHandle<Result<T, RemotingError>>),
}

/// The result of a task-returning interface method.
///
/// A task is either *created*, holding work that has not begun, or
/// *running* on the tokio runtime. Remote interfaces require running tasks:
/// a servant whose subject hands back a created task answers the call with
/// [`RemotingError::NotSupported`].
///
/// # Examples
///
/// ```rust
/// use remoting::Task;
///
/// # async fn example() -> Result<(), remoting::RemotingError> {
/// let task = Task::spawn(async { Ok(6 * 7) });
/// assert!(task.is_started());
/// assert_eq!(task.await?, 42);
///
/// let lazy = Task::new(async { Ok("later") });
/// assert!(!lazy.is_started());
/// assert_eq!(lazy.start().await?, "later");
/// # Ok(())
/// # }
/// ```
pub struct Task<T> {
    state: TaskState<T>,
}

impl<T: Send + 'static> Task<T> {
    /// Wraps work without starting it.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, RemotingError>> + Send + 'static,
    {
        Self {
            state: TaskState::Created(Box::pin(future)),
        }
    }

    /// Starts work on the current tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, RemotingError>> + Send + 'static,
    {
        Self {
            state: TaskState::Running(tokio::spawn(future)),
        }
    }

    /// A running task that is already complete.
    pub fn ready(value: T) -> Self {
        Self::spawn(async move { Ok(value) })
    }

    /// Starts a created task; running tasks are returned unchanged.
    pub fn start(self) -> Self {
        match self.state {
            TaskState::Created(future) => Self {
                state: TaskState::Running(tokio::spawn(future)),
            },
            running => Self { state: running },
        }
    }

    /// Whether the work has been started.
    pub fn is_started(&self) -> bool {
        matches!(self.state, TaskState::Running(_))
    }

    /// Waits for the result. A created task runs inline on the caller.
    pub async fn wait(self) -> Result<T, RemotingError> {
        match self.state {
            TaskState::Created(future) => future.await,
            TaskState::Running(handle) => handle.await.map_err(|error| RemotingError::Internal {
                message: format!("task did not complete: {error}"),
            })?,
        }
    }
}

impl<T: Send + 'static> IntoFuture for Task<T> {
    type Output = Result<T, RemotingError>;
    type IntoFuture = BoxFuture<T>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            TaskState::Created(_) => "created",
            TaskState::Running(_) => "running",
        };
        f.debug_struct("Task").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_created_task_is_not_started() {
        let task = Task::new(async { Ok(1) });
        assert!(!task.is_started());
        let task = task.start();
        assert!(task.is_started());
        assert_eq!(task.await.unwrap(), 1);
    }

    async fn explode() -> Result<i32, RemotingError> {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_panicking_task_reports_internal_error() {
        let task = Task::spawn(explode());
        assert!(matches!(task.await, Err(RemotingError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_ready() {
        assert_eq!(Task::ready("done").await.unwrap(), "done");
    }
}
