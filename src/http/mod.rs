//! HTTP request model and transport.
//!
//! # Data Flow
//! ```text
//! RequestConfig
//!     → request.rs (resolve URL, validate method/body)
//!     → serializer.rs (normalize + encode body)
//!     → transport.rs (RawRequest on the wire, RawResponse back)
//!     → response.rs (decode success / build TransportError)
//! ```
//!
//! # Design Decisions
//! - Body variants carry their own content kind, so a body can never
//!   disagree with its declared serialization
//! - The network boundary is a trait; everything above it is deterministic

pub mod request;
pub mod response;
pub mod serializer;
pub mod transport;

pub use request::{
    Body, ContentKind, Credentials, Method, ParamValue, RequestConfig, RequestOptions, ResponseTransform, Target,
};
pub use transport::{RawRequest, RawResponse, ReqwestTransport, Transport, TransportFailure};
