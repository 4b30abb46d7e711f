//! Pawcache - image caching and delivery for the pet adoption marketplace client.
//!
//! This crate downloads, transforms, persists, and evicts remote images, and picks
//! delivery quality from the current network class. UI code only ever talks to
//! [`infrastructure::image::CacheManager`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing pure policy services.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for the filesystem, network, and codecs.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "pawcache";
