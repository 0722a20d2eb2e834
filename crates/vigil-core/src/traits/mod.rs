// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits for the external collaborators of the scanning queue.

pub mod scanner;
pub mod store;

pub use scanner::{ByteStream, MalwareScanner};
pub use store::ScanStore;
