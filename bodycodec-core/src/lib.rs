//! Core types for body codecs.
//!
//! This crate provides the collaborator types the `bodycodec` crate drives:
//!
//! ## Modules
//!
//! - `error`: Error kinds surfaced by codecs and bodies
//! - `schema`: Element schemas
//! - `codec`: The binary codec trait and stream aliases
//! - `framing`: Stream framing and the frame decoder/encoder adapters
//! - `limits`: Message size limits
//! - `json`, `proto`: Built-in JSON and Protobuf codecs

mod codec;
mod error;
mod framing;
mod json;
mod limits;
mod proto;
mod schema;

pub use codec::*;
pub use error::*;
pub use framing::*;
pub use json::*;
pub use limits::*;
pub use proto::*;
pub use schema::*;
