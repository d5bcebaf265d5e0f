//! Adapter for `embedded-storage` NOR flash drivers
//!
//! Lets any [`embedded_storage::nor_flash::NorFlash`] implementor (MCU
//! on-package flash, SPI NOR drivers) back the log without writing a
//! bespoke [`FlashDevice`] implementation.

use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind};

use crate::device::{DeviceError, FlashDevice};

/// Wraps an `embedded-storage` NOR flash as a [`FlashDevice`]
///
/// Requires single-byte program granularity (`F::WRITE_SIZE == 1`), which
/// the per-page header protocol depends on; most SPI NOR parts qualify.
/// Power control is a no-op: memory-mapped and on-package flash has no
/// caller-visible power rail.
pub struct NorDevice<F> {
    flash: F,
}

impl<F: NorFlash> NorDevice<F> {
    /// Wrap a NOR flash driver
    pub fn new(flash: F) -> Self {
        debug_assert!(F::WRITE_SIZE == 1, "header protocol needs byte program granularity");
        Self { flash }
    }

    /// Give the wrapped driver back
    pub fn release(self) -> F {
        self.flash
    }
}

fn map_err<E: NorFlashError>(e: E) -> DeviceError {
    match e.kind() {
        NorFlashErrorKind::OutOfBounds => DeviceError::OutOfRange,
        _ => DeviceError::Bus,
    }
}

impl<F: NorFlash> FlashDevice for NorDevice<F> {
    fn initialize(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn capacity(&self) -> u32 {
        self.flash.capacity() as u32
    }

    fn power_up(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn power_down(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn read_byte(&mut self, addr: u32) -> Result<u8, DeviceError> {
        let mut buf = [0u8; 1];
        self.flash.read(addr, &mut buf).map_err(map_err)?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), DeviceError> {
        self.flash.write(addr, &[value]).map_err(map_err)
    }

    fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), DeviceError> {
        self.flash.read(addr, buf).map_err(map_err)
    }

    fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), DeviceError> {
        self.flash.write(addr, data).map_err(map_err)
    }

    fn erase_sector(&mut self, addr: u32) -> Result<(), DeviceError> {
        let erase_size = F::ERASE_SIZE as u32;
        let start = addr - (addr % erase_size);
        self.flash.erase(start, start + erase_size).map_err(map_err)
    }
}
