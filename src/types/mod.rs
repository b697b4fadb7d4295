//! Shared type definitions
//!
//! This module contains the data types shared by the client, pipeline and presenter.

pub mod config;
pub mod model;

pub use config::Settings;
pub use model::{ModelDescriptor, ModelItem, TagDetails, TagEntry, TagList};
