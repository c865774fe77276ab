//! sonar core - foundation types and error handling
//!
//! This crate provides the value types shared by the sonar engine:
//! - `ScanTarget`: a validated host argument
//! - `ScanOptions`: explicit per-scan configuration
//! - `PortOutcome`, `ScanResult`, `TlsDescriptor`: what a scan hands back

pub mod error;
pub mod options;
pub mod result;
pub mod target;

pub use error::{Error, Result};
pub use options::ScanOptions;
pub use result::{PortOutcome, PortState, Protocol, ScanResult, TlsDescriptor};
pub use target::ScanTarget;
