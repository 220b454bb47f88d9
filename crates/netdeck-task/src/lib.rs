//! netdeck task
//!
//! Client side of the remote task-execution API: connection parameters,
//! submission, and bounded-wait polling of task handles.

pub mod api;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod netpalm;
pub mod poller;

pub use api::TaskApi;
pub use connection::{ConnectionParams, Credentials};
pub use dispatcher::TaskDispatcher;
pub use error::{Result, TaskError};
pub use model::{PushSpec, TaskHandle, TaskSnapshot, TaskStatus};
pub use netpalm::{NetpalmClient, NetpalmConfig};
pub use poller::{PollPolicy, TaskPoller};
