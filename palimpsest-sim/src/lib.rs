//! In-memory NOR flash simulator
//!
//! Implements [`FlashDevice`] over a fixed array with real NOR
//! electrical semantics: erase sets a whole sector to 0xFF, programming
//! can clear bits but never set them. This is what makes the log's
//! recovery behavior testable on the host - a "previous session" is just
//! whatever byte pattern the simulator holds when a fresh log is opened
//! over it, including deliberately torn patterns.
//!
//! The simulator also journals every erase address and counts programmed
//! bytes so tests can assert *how* the medium was driven, not only what
//! ended up on it.

#![no_std]
#![deny(unsafe_code)]

use heapless::Vec;
use palimpsest_hal::{DeviceError, FlashDevice};

/// How many erase addresses the journal retains
pub const ERASE_JOURNAL_DEPTH: usize = 256;

/// Simulated NOR flash of `CAP` bytes
///
/// `CAP` must be a multiple of the sector size passed to [`SimFlash::new`];
/// the simulator does not check this, the log core's geometry validation
/// does.
#[derive(Debug)]
pub struct SimFlash<const CAP: usize> {
    mem: [u8; CAP],
    sector_size: u32,
    powered: bool,
    erases: Vec<u32, ERASE_JOURNAL_DEPTH>,
    bytes_programmed: u32,
}

impl<const CAP: usize> SimFlash<CAP> {
    /// Create a fully erased device with the given sector (erase unit) size
    pub fn new(sector_size: u32) -> Self {
        Self {
            mem: [0xFF; CAP],
            sector_size,
            powered: true,
            erases: Vec::new(),
            bytes_programmed: 0,
        }
    }

    /// Sector addresses erased so far, in order
    pub fn erases(&self) -> &[u32] {
        &self.erases
    }

    /// Total bytes programmed so far
    pub fn bytes_programmed(&self) -> u32 {
        self.bytes_programmed
    }

    /// Forget the recorded erase/program history
    pub fn clear_journal(&mut self) {
        self.erases.clear();
        self.bytes_programmed = 0;
    }

    /// Raw view of the media image
    pub fn image(&self) -> &[u8] {
        &self.mem
    }

    /// Overwrite raw bytes, bypassing NOR program semantics
    ///
    /// Test backdoor for fabricating a prior-session image (including
    /// torn ones) without replaying the writes that produced it.
    pub fn fill(&mut self, addr: u32, bytes: &[u8]) {
        let start = addr as usize;
        self.mem[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn check(&self, addr: u32, len: usize) -> Result<(), DeviceError> {
        if !self.powered {
            return Err(DeviceError::PoweredDown);
        }
        if addr as usize + len > CAP {
            return Err(DeviceError::OutOfRange);
        }
        Ok(())
    }

    fn program(&mut self, addr: u32, data: &[u8]) -> Result<(), DeviceError> {
        self.check(addr, data.len())?;
        for (i, &b) in data.iter().enumerate() {
            // NOR program: bits go to zero, never back to one
            self.mem[addr as usize + i] &= b;
        }
        self.bytes_programmed += data.len() as u32;
        Ok(())
    }
}

impl<const CAP: usize> FlashDevice for SimFlash<CAP> {
    fn initialize(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn capacity(&self) -> u32 {
        CAP as u32
    }

    fn power_up(&mut self) -> Result<(), DeviceError> {
        self.powered = true;
        Ok(())
    }

    fn power_down(&mut self) -> Result<(), DeviceError> {
        self.powered = false;
        Ok(())
    }

    fn read_byte(&mut self, addr: u32) -> Result<u8, DeviceError> {
        self.check(addr, 1)?;
        Ok(self.mem[addr as usize])
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), DeviceError> {
        self.program(addr, &[value])
    }

    fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), DeviceError> {
        self.check(addr, buf.len())?;
        let start = addr as usize;
        buf.copy_from_slice(&self.mem[start..start + buf.len()]);
        Ok(())
    }

    fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), DeviceError> {
        self.program(addr, data)
    }

    fn erase_sector(&mut self, addr: u32) -> Result<(), DeviceError> {
        self.check(addr, 1)?;
        let start = (addr - addr % self.sector_size) as usize;
        let end = start + self.sector_size as usize;
        if end > CAP {
            return Err(DeviceError::OutOfRange);
        }
        self.mem[start..end].fill(0xFF);
        // Journal is bounded; a test that overflows it asked for too much
        let _ = self.erases.push(start as u32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_clears_bits_only() {
        let mut flash = SimFlash::<64>::new(32);
        flash.write_byte(0, 0x3F).unwrap();
        // Attempting to set bits back leaves them cleared
        flash.write_byte(0, 0xFF).unwrap();
        assert_eq!(flash.read_byte(0).unwrap(), 0x3F);
        // Further clears still take effect
        flash.write_byte(0, 0x37).unwrap();
        assert_eq!(flash.read_byte(0).unwrap(), 0x37);
    }

    #[test]
    fn erase_restores_sector_to_ones() {
        let mut flash = SimFlash::<64>::new(32);
        flash.write_bytes(0, &[0x00; 32]).unwrap();
        flash.write_byte(40, 0x12).unwrap();
        flash.erase_sector(5).unwrap();
        assert_eq!(flash.read_byte(0).unwrap(), 0xFF);
        assert_eq!(flash.read_byte(31).unwrap(), 0xFF);
        // Other sector untouched
        assert_eq!(flash.read_byte(40).unwrap(), 0x12);
        assert_eq!(flash.erases(), &[0]);
    }

    #[test]
    fn powered_down_rejects_io() {
        let mut flash = SimFlash::<64>::new(32);
        flash.power_down().unwrap();
        assert_eq!(flash.read_byte(0), Err(DeviceError::PoweredDown));
        assert_eq!(flash.write_byte(0, 0), Err(DeviceError::PoweredDown));
        assert_eq!(flash.erase_sector(0), Err(DeviceError::PoweredDown));
        flash.power_up().unwrap();
        assert!(flash.read_byte(0).is_ok());
    }

    #[test]
    fn out_of_range_is_reported() {
        let mut flash = SimFlash::<64>::new(32);
        assert_eq!(flash.read_byte(64), Err(DeviceError::OutOfRange));
        assert_eq!(flash.write_bytes(60, &[0; 8]), Err(DeviceError::OutOfRange));
        let mut buf = [0u8; 8];
        assert_eq!(flash.read_bytes(60, &mut buf), Err(DeviceError::OutOfRange));
    }

    #[test]
    fn fill_bypasses_nor_semantics() {
        let mut flash = SimFlash::<64>::new(32);
        flash.write_byte(3, 0x00).unwrap();
        flash.fill(3, &[0xAB]);
        assert_eq!(flash.read_byte(3).unwrap(), 0xAB);
    }
}
