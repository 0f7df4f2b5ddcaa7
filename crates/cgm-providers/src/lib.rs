// ABOUTME: OAuth token handling and device-cloud access for CGM telemetry sync
// ABOUTME: Token source with rotation detection, refresh provider, and the HTTP device-cloud client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! Provider-side building blocks for CGM sync.
//!
//! The runner never talks HTTP itself. It hands a [`TokenSource`] to a
//! [`DeviceCloudClient`] and afterwards asks the source whether the token rotated.

/// Device-cloud capability, wire records, and HTTP implementation
pub mod device_cloud;
/// Shared HTTP client for provider API calls
pub mod http_client;
/// OAuth refresh provider and token source
pub mod oauth;

pub use cgm_core::errors::{ProviderError, ProviderResult};
pub use device_cloud::{
    DeviceCloudClient, DeviceCloudConfig, FetchWindow, HttpDeviceCloudClient,
};
pub use http_client::{initialize_shared_client, shared_client, HttpClientSettings};
pub use oauth::{
    AuthorizedClient, HttpOAuthProvider, OAuthProvider, OAuthProviderConfig, TokenSource,
};
