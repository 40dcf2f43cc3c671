//! Core traits for the cfnat-sync system
//!
//! This module defines the abstract interfaces at the system's two
//! external seams:
//!
//! - [`RecordStore`]: read and mutate a DNS provider's record set
//! - [`DiscoverySource`]: the address-discovery subprocess boundary

pub mod discovery_source;
pub mod record_store;

pub use discovery_source::DiscoverySource;
pub use record_store::{RecordStore, RemoteRecord};
