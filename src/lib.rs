//! Static architecture mapping: detect the models, services, transports and
//! transforms of a codebase, infer how they relate, and trace workflows.

pub mod config;
pub mod core;
pub mod error;

pub use config::Config;
pub use crate::core::{Engine, ScanDocument};
pub use error::{Result, SysvistaError};
