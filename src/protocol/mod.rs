//! Exchange wire protocol: operation catalog, request encoding and strict
//! response decoding.

pub mod encoder;
pub mod operation;
pub mod response;

pub use encoder::{build_pipe_params, EncodeError, SoapEncoder};
pub use operation::Operation;
pub use response::{fault_reason, parse_response, EnvelopeShape, ParseError, VendorResult};
