// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background workers of the Vigil scanning service: the single-flight
//! scan worker with adaptive backoff, the reporter that propagates
//! infected verdicts to the blocker, and the reaper that releases
//! expired scan leases.

pub mod reaper;
pub mod reporter;
pub mod shutdown;
pub mod worker;

pub use reporter::BlockerClient;
pub use shutdown::install_signal_handler;
pub use worker::Scanner;
