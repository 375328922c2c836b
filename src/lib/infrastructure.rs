//! Infrastructure layer: provider adapters and the HTTP API

pub mod email;
pub mod http;
