//! # Appdeck Core
//!
//! Foundational types for the appdeck application platform.
//!
//! This crate provides the domain model shared by the apps service and its
//! clients:
//!
//! - **Configuration**: application configuration (identifier, title,
//!   description, categories, style)
//! - **Validation**: field validators and model asset-set naming rules
//! - **Model loading**: parsing a topology file and its weight shards into a
//!   loadable model, rejecting unsupported formats
//! - **Edit sessions**: validated in-memory mutation of a loaded
//!   configuration
//!
//! ## Modules
//!
//! - [`config`]: `AppConfig`, `Category`, `Style`, `Align`
//! - [`validate`]: field and asset-set validation with per-violation messages
//! - [`model`]: `ModelFile`, the `ModelLoader` trait and `TopologyLoader`
//! - [`edit`]: `EditSession` for the edit flow

pub mod config;
pub mod edit;
pub mod model;
pub mod validate;

pub use config::{Align, AppConfig, Category, Style};
pub use model::{ModelFile, ModelHandle, ModelLoader, TopologyLoader};
