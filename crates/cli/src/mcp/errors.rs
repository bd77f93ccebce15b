//! Error kinds raised by the protocol layer itself. Tool failures use
//! `ToolError::kind()` from the core crate.

pub const INVALID_INPUT: &str = "invalid_input";
pub const INTERNAL_ERROR: &str = "internal_error";

/// JSON-RPC code for a request naming a method the server does not serve.
pub const METHOD_NOT_FOUND: i64 = -32601;
