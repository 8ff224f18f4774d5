// src/config/mod.rs

//! Build description loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a build description from disk (`loader.rs`).
//! - Validate task references and explicit ordering (`validate.rs`).
//! - Expose a task's `properties` table as a walkable bean (`bean.rs`).

pub mod bean;
pub mod loader;
pub mod model;
pub mod validate;

pub use bean::{TableBean, TaskOutput, TaskValue};
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
