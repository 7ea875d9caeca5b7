//! Data Transfer Objects for the poll endpoint
//!
//! Wire representations of the single request/response pair the client
//! exchanges with the server.

pub mod poll;
