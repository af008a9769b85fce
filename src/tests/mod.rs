//! Crate-level scenario tests
//!
//! These drive several modules together through their public surface,
//! with the HTTP transport replaced by `MockHttpClient`.
