//! Integration tests for the LogView360 console
//! These exercise the crate over real HTTP, against a mockito server
//! standing in for the authentication and analysis services.

pub mod harness;

pub mod auth_gateway_test;
pub mod shell_api_test;
pub mod vault_test;
