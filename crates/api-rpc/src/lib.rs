//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 server exposing the student, staff and admin queue
//! operations of CampusQ. Method names carry a `.v1` version suffix.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig};
