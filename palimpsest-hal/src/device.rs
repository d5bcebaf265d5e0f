//! Raw flash device trait
//!
//! The log core needs very little from the medium: byte and byte-range
//! program/read, block-granular erase, a capacity report, and power
//! control. Everything else (bus bring-up, chip-select wiring, program
//! and erase timing) stays inside the implementation.

/// Errors reported by a flash device implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// Bus or transfer failure
    Bus,
    /// Address or range outside the device capacity
    OutOfRange,
    /// Operation attempted while the device is powered down
    PoweredDown,
}

/// Minimal capability surface of a raw NOR-style flash device
///
/// Addresses are byte offsets from the start of the device. Program
/// operations follow NOR semantics: they can clear bits but never set
/// them; only [`erase_sector`](FlashDevice::erase_sector) returns a
/// region to the erased (all-ones) state.
///
/// Implementations must not retry internally; the caller owns retry
/// policy.
pub trait FlashDevice {
    /// Prepare the device for use (bus setup, ID probe, etc.)
    fn initialize(&mut self) -> Result<(), DeviceError>;

    /// Total device capacity in bytes
    fn capacity(&self) -> u32;

    /// Power the device up
    fn power_up(&mut self) -> Result<(), DeviceError>;

    /// Power the device down
    ///
    /// Reads, writes and erases while powered down must fail with
    /// [`DeviceError::PoweredDown`] rather than returning stale data.
    fn power_down(&mut self) -> Result<(), DeviceError>;

    /// Read a single byte
    fn read_byte(&mut self, addr: u32) -> Result<u8, DeviceError>;

    /// Program a single byte
    fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), DeviceError>;

    /// Read `buf.len()` bytes starting at `addr`
    fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// Program `data.len()` bytes starting at `addr`
    fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), DeviceError>;

    /// Erase the whole sector containing `addr`
    ///
    /// Sector size is a property of the device; the log core only ever
    /// passes sector-aligned addresses matching its configured block
    /// size.
    fn erase_sector(&mut self, addr: u32) -> Result<(), DeviceError>;
}
