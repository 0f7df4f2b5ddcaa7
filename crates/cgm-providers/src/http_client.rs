// ABOUTME: Shared connection-pooled HTTP client for device-cloud and token endpoint calls
// ABOUTME: Timeouts are configured once at startup; later callers reuse the same pool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use reqwest::{Client, ClientBuilder};
use std::sync::OnceLock;
use std::time::Duration;

/// Timeouts applied to the shared client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpClientSettings {
    /// Whole-request timeout
    pub timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
}

impl Default for HttpClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

static CLIENT_SETTINGS: OnceLock<HttpClientSettings> = OnceLock::new();

static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// Record the timeouts the shared client is built with
///
/// Only the first call has an effect, and only if no request has been made yet.
/// Returns `false` when settings were already fixed.
pub fn initialize_shared_client(settings: HttpClientSettings) -> bool {
    CLIENT_SETTINGS.set(settings).is_ok()
}

/// Shared HTTP client, built lazily from the configured or default timeouts
pub fn shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(|| {
        let settings = CLIENT_SETTINGS.get().copied().unwrap_or_default();
        ClientBuilder::new()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}
