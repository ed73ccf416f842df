//! Shared domain types, collaborator traits, errors and configuration for the
//! intentdb workspace.
#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod model_source;
pub mod traits;
pub mod types;
