//! Error types and error handling for the compiler.
//!
//! This module defines the error types used throughout the compilation
//! process. It includes:
//!
//! - Error structures with source position information
//! - One error variant per failure kind, shared by every phase
//! - Helpful error messages and suggestions

pub mod errors;
