//! Device-agnostic circular log engine
//!
//! A persistent, power-loss-tolerant append log on raw NOR-style flash,
//! for telemetry and event recording that must survive resets on devices
//! whose RAM cannot hold the full history.
//!
//! The engine is built from:
//!
//! - [`geometry::Geometry`] - page/block constants and ring arithmetic
//! - [`page::PageState`] - the per-page header state machine
//! - [`scan::BootScanner`] - head/tail recovery from on-media markers
//! - [`log::CircularLog`] - the append/consume protocol itself
//!
//! The raw medium stays behind the [`palimpsest_hal::FlashDevice`] trait,
//! so the whole engine runs unchanged against real SPI NOR or the
//! host-side simulator.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod error;
pub mod geometry;
pub mod log;
pub mod page;
pub mod scan;

pub use error::LogError;
pub use geometry::{Geometry, GeometryError};
pub use log::CircularLog;
pub use page::PageState;
pub use scan::{BootScanner, RecoveredLog};
