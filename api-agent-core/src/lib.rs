//! Building blocks for the api-agent HTTP request builder.
//!
//! This crate holds the pieces of the agent that do not touch the network,
//! so they can be reused (or tested) without a transport.
//!
//! ## Contents
//!
//! - [`ContentType`]: The content-type tag table
//! - [`encode_form`], [`encode_json`], [`encode_xml`], [`encode_pb_json`]:
//!   Request body encoders, with [`decode_json`], [`decode_xml`] and
//!   [`decode_pb_json`] for responses
//! - [`Cipher`] and [`SharedCipher`]: The pluggable body cipher
//! - [`File`]: Multipart file attachments
//! - [`MultipartBody`]: `multipart/form-data` body encoding

mod body;
mod cipher;
mod content_type;
mod error;
mod file;
mod multipart;

pub use body::*;
pub use cipher::*;
pub use content_type::*;
pub use error::*;
pub use file::*;
pub use multipart::*;
