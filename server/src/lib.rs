//! Embedded TCP server for ISO-8583 traffic.
//!
//! Frames arrive length-prefixed, are reassembled whole by a pluggable
//! [`FrameReader`], and dispatch to the first registered handler whose
//! rule matches the frame's MTI. Every accepted connection is tracked in
//! a shared [`ConnectionRegistry`]; deactivated records are kept for
//! inspection and evicted stalest-first once a configured capacity is
//! reached.
//!
//! ```no_run
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use cardstream_codec::mti::VERSION_ISO8583_1993;
//! use cardstream_codec::Mti;
//! use cardstream_server::{Response, Server, ServerConfig};
//!
//! # async fn run() -> Result<(), cardstream_server::ServerError> {
//! let mut server = Server::bind(ServerConfig::default()).await?;
//!
//! server.add_top_priority_handler(
//!     Arc::new(|mut response: Response, message: Bytes| async move {
//!         response.write(&message);
//!         let _ = response.close().await;
//!     }),
//!     vec![Arc::new(|mti: &Mti| mti.version() == VERSION_ISO8583_1993)],
//! );
//!
//! server.start().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod framing;
pub mod server;

pub use config::{LogCategories, ServerConfig};
pub use connection::{Connection, ConnectionRegistry, Response};
pub use error::{ServerError, ServerResult};
pub use framing::{FrameReader, LengthPrefixReader};
pub use server::{
    read_mti, ConnectionIdGenerator, Handler, MtiExtractor, MtiRule, Server,
};
