//! XMLA wire protocol: SOAP transport, discovery, execution, and the
//! streaming result parser family.
//!
//! Two calls exist: `Discover(requestType, restrictions)` returning a
//! tabular rowset, and `Execute(statement)` returning a
//! multidimensional tuple/axis/cell stream. Both are synchronous
//! request/response over HTTP POST. Cancellation is cooperative; see
//! [`cancel`].

pub mod cancel;
pub mod client;
pub mod discover;
pub mod parser;
pub mod soap;

pub use cancel::{CancelObservation, CancelToken};
pub use client::{CredentialSource, Credentials, NoCredentials, StaticCredentials, XmlaClient};

/// Result type for protocol operations.
pub type XmlaResult<T> = Result<T, XmlaError>;

/// Errors that can occur talking to the OLAP server.
///
/// None of these are retried internally; retry policy, if any, belongs
/// to the caller.
#[derive(Debug, thiserror::Error)]
pub enum XmlaError {
    /// Connection-level failure from the transport.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx HTTP response.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// SOAP fault in a response body.
    #[error("SOAP fault: {0}")]
    Fault(String),

    /// `<Error>` element with a non-empty description in a discover
    /// response.
    #[error("server error: {0}")]
    Server(String),

    /// Response structure the parser cannot follow.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The request's cancellation token was marked.
    #[error("request cancelled")]
    Cancelled,

    /// The named cube is not present on the server.
    #[error("unknown cube: {0}")]
    UnknownCube(String),

    #[error(transparent)]
    Cache(#[from] crate::cache::CacheError),

    #[error(transparent)]
    Mdx(#[from] crate::mdx::MdxError),
}

impl From<quick_xml::Error> for XmlaError {
    fn from(err: quick_xml::Error) -> Self {
        XmlaError::Malformed(err.to_string())
    }
}
