//! Publisher module for handing finished artifacts to remote storage.
//!
//! [`RemotePublisher`] streams the artifact as multipart form data to
//! `{endpoint}/upload`. The durable reference comes from the upload
//! response, else from one `GET {endpoint}/files/{file_id}` lookup, else it
//! is constructed as `<reference_scheme>://<file_id>`.
//!
//! When no [`Credentials`] are configured the publisher runs offline and
//! returns a `mock://` placeholder reference instead of failing.

mod config;
mod error;
mod remote;
mod traits;

pub use config::{Credentials, PublisherConfig};
pub use error::PublishError;
pub use remote::RemotePublisher;
pub use traits::Publisher;
