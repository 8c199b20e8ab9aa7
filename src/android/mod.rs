//! Android JNI bridge module
//!
//! Provides JNI bindings for communication between the Rust core
//! and the Android capture service.

pub mod bridge;

pub use bridge::*;
