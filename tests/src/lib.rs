//! LiteSVM harness for the vault client.

pub mod common;
