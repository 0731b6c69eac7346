//! ZPA API interaction module
//!
//! This module provides the core functionality for talking to the Zscaler
//! Private Access management API: sign-in, HTTP transport, URL building,
//! pagination and microtenant scoping.
//!
//! # Module Structure
//!
//! - [`auth`] - Bearer token acquisition via `POST /signin`
//! - [`client`] - Main ZPA client for making API requests
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use zpa_lookup::zpa::client::{ApiFamily, ZpaClient};
//!
//! async fn example(client: &ZpaClient) -> Result<(), zpa_lookup::zpa::http::ApiError> {
//!     let url = client.api_url(ApiFamily::MgmtconfigV1, "segmentGroup");
//!     let groups = client.get_all_pages(&url, &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;

pub use client::{ApiFamily, ZpaClient};
pub use http::ApiError;
