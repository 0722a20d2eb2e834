// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP ingress for the Vigil scanning service: skylink submission and
//! the component health probe.

pub mod handlers;
pub mod server;

pub use server::{start_server, GatewayState};
