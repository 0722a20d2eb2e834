// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for the Vigil scanning service.
//!
//! Compiled defaults, an optional `vigil.toml`, and the deployment
//! environment variables merge into a single [`model::VigilConfig`].

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_str};
pub use model::VigilConfig;
