//! Core types and configuration for slipway.
//!
//! This crate defines the `slipway.toml` schema ([`SlipwayConfig`]), registry
//! credential handling, build-tag derivation, and the git helpers the
//! pipeline uses to identify the current checkout.

pub mod config;
pub mod credentials;
pub mod error;
pub mod git;
pub mod tag;

pub use config::{
    AppConfig, ImageConfig, PipelineConfig, PlatformConfig, SlipwayConfig, SmokeConfig,
};
pub use credentials::RegistryCredentials;
pub use error::{Error, Result};
pub use tag::{BuildTag, ImageRef};
