// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ClamAV client: clamd wire protocol plus the portal-streaming scanner
//! adapter used by the scan worker.

pub mod clamd;
pub mod client;

pub use clamd::Clamd;
pub use client::ClamAv;
