//! Palimpsest device capability layer
//!
//! This crate defines the minimal trait a raw flash device must implement
//! for the Palimpsest log core to drive it. Chip-specific drivers (SPI NOR
//! chips, on-package MCU flash, a host-side simulator) implement
//! [`FlashDevice`]; the core never touches hardware directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application firmware                   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  palimpsest-core (log engine)           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  palimpsest-hal (this crate - traits)   │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ SPI NOR chip  │       │ palimpsest-   │
//! │   driver      │       │     sim       │
//! └───────────────┘       └───────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod device;
#[cfg(feature = "embedded-storage")]
pub mod nor;

// Re-export key items at crate root for convenience
pub use device::{DeviceError, FlashDevice};
#[cfg(feature = "embedded-storage")]
pub use nor::NorDevice;
