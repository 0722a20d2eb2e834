// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of version-2 skylinks against the portal.
//!
//! The portal answers a HEAD request for a resolver skylink with a
//! `skynet-skylink` header naming the target, which may itself be a
//! resolver entry. Resolution follows the chain to a bounded depth and
//! never touches the store.

use tracing::debug;
use vigil_core::{Hash, VigilError};

use crate::skylink::Skylink;

/// Response header carrying the resolution target.
const RESOLVER_HEADER: &str = "skynet-skylink";

/// Maximum number of resolver hops before giving up.
const MAX_RESOLVE_DEPTH: usize = 3;

/// Resolves submitted skylinks to their canonical content hash.
#[derive(Debug, Clone)]
pub struct SkylinkResolver {
    client: reqwest::Client,
    portal: String,
}

impl SkylinkResolver {
    /// Creates a resolver backed by the given portal base URL.
    pub fn new(portal: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            portal,
        }
    }

    /// The portal base URL this resolver queries.
    pub fn portal(&self) -> &str {
        &self.portal
    }

    /// Validates `raw` and reduces it to its canonical content hash.
    ///
    /// Returns the identifier exactly as submitted together with the
    /// hash of the version-1 skylink it ultimately names. Version-1
    /// inputs never touch the network.
    pub async fn resolve(&self, raw: &str) -> Result<(String, Hash), VigilError> {
        let mut current = Skylink::parse(raw)?;
        let mut depth = 0;

        while current.is_resolver() {
            if depth >= MAX_RESOLVE_DEPTH {
                return Err(VigilError::Unresolvable("nested too deeply".into()));
            }
            depth += 1;

            let url = format!("{}/{}", self.portal, current.as_str());
            let response = self.client.head(&url).send().await.map_err(|e| {
                VigilError::Unresolvable(format!("portal HEAD request failed: {e}"))
            })?;
            let target = response
                .headers()
                .get(RESOLVER_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    VigilError::Unresolvable(format!(
                        "portal response carries no {RESOLVER_HEADER} header"
                    ))
                })?;
            debug!(from = current.as_str(), to = target, depth, "followed resolver skylink");

            current = Skylink::parse(target).map_err(|e| {
                VigilError::Unresolvable(format!("portal returned an invalid target: {e}"))
            })?;
        }

        Ok((raw.to_string(), current.hash()))
    }
}
