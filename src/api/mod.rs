//! HTTP API Module
//!
//! Provides the REST API for reads, writes, replication and
//! partition control.

mod http;

pub use http::{
    AppState, ErrorResponse, HttpServer, PartitionResponse, PutRequest, StatusResponse,
};
