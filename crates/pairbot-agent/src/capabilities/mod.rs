//! Capability modules for the Pairbot agent.

pub mod base;
pub mod registry;
pub mod filesystem;
pub mod shell;
pub mod web;

pub use base::{Capability, require_string, optional_string, optional_i64};
pub use registry::{CapabilityRegistry, RegistryError};
