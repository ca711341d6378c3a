//! Python FFI boundary
//!
//! Exposes the game engine to the Python frontend. The boundary is kept
//! minimal and JSON-shaped: configs and actions come in as JSON strings,
//! views go out as JSON strings. Everything crossing it is serde-defined in
//! the core, so the Python side and the Rust side cannot drift apart.

pub mod engine;
