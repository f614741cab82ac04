//! End-to-end actions for the Horusec auth and account services.
//!
//! Every action performs a single blocking round trip against a running
//! service and checks the status code and the `content` envelope of the
//! response. Actions are exposed on [`Client`]; [`Session`] threads the
//! bearer token and the created company ids between them and cleans up
//! after itself.
pub mod actions;
pub mod config;
pub mod error;
pub mod fake;
pub mod request;
pub mod response;
pub mod scenario;
pub mod session;

pub use actions::{Client, Operation};
pub use config::Settings;
pub use error::ActionError;
pub use session::Session;
