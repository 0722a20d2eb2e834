// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Skylink parsing, canonical hashing and resolver-skylink resolution.

pub mod resolver;
pub mod skylink;

pub use resolver::SkylinkResolver;
pub use skylink::Skylink;
