//! Transports the server can be reached over.
//!
//! Only HTTP is provided: JSON-RPC requests arrive as `POST` bodies and are
//! answered synchronously, one envelope per response.

pub mod http;

pub use http::HttpServer;
