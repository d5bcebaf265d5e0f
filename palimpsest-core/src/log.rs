//! The circular log: append, consume, power control
//!
//! One record occupies one page: a header byte followed by up to
//! `page_size - 1` payload bytes whose layout the engine never
//! interprets. The writer owns the head, the reader owns the tail, both
//! advance monotonically around the ring.
//!
//! Two protocol rules make the log power-loss tolerant:
//!
//! - every page is written in three ordered steps (`Writing` header,
//!   payload, `Written` header), so a page is always observably in
//!   exactly one of Empty / Writing / Written and a payload is only
//!   durable once the header says `Written`;
//! - whenever the head enters a block, the block at the head and the one
//!   after it are erased first, so the writer always advances over
//!   erased ground and a full block of slack separates it from anything
//!   not yet erased.

use serde::de::DeserializeOwned;
use serde::Serialize;

use palimpsest_hal::FlashDevice;

use crate::error::LogError;
use crate::geometry::Geometry;
use crate::page::PageState;
use crate::scan::BootScanner;

/// Circular append log over a raw flash device
///
/// Single producer, single consumer, one execution context; callers on
/// separate contexts need external mutual exclusion.
#[derive(Debug)]
pub struct CircularLog<D: FlashDevice> {
    device: D,
    geom: Geometry,
    head: u32,
    tail: u32,
    len_pages: u32,
    powered: bool,
}

impl<D: FlashDevice> CircularLog<D> {
    /// Open the log on a device
    ///
    /// Initializes the device, validates the geometry against the
    /// reported capacity and runs the boot scan, so the returned log is
    /// always positioned - there is no separate "not yet scanned" state.
    pub fn new(mut device: D, page_size: u32, block_size: u32) -> Result<Self, LogError> {
        device.initialize()?;
        let geom = Geometry::new(page_size, block_size, device.capacity())?;
        let recovered = BootScanner::new(&mut device, geom).recover()?;
        Ok(Self {
            device,
            geom,
            head: recovered.head,
            tail: recovered.tail,
            len_pages: recovered.len_pages,
            powered: true,
        })
    }

    /// Layout constants this log was opened with
    pub fn geometry(&self) -> Geometry {
        self.geom
    }

    /// Next page address to be written
    pub fn head(&self) -> u32 {
        self.head
    }

    /// Oldest unconsumed page address
    pub fn tail(&self) -> u32 {
        self.tail
    }

    /// Unconsumed records
    pub fn size(&self) -> u32 {
        self.len_pages
    }

    /// Whether no unconsumed records remain
    pub fn is_empty(&self) -> bool {
        self.len_pages == 0
    }

    /// Pages of ring gap between head and tail
    pub fn free_pages(&self) -> u32 {
        self.geom.total_pages() - self.len_pages
    }

    /// Power the device up or down
    ///
    /// Head and tail are untouched; while powered down every append,
    /// read and skip fails with [`LogError::DeviceNotReady`].
    pub fn set_power(&mut self, on: bool) -> Result<(), LogError> {
        if on {
            self.device.power_up()?;
        } else {
            self.device.power_down()?;
        }
        self.powered = on;
        Ok(())
    }

    /// Hand the device back, discarding the in-memory pointers
    pub fn release(self) -> D {
        self.device
    }

    /// Append one record at the head
    ///
    /// At a block boundary this first erases the block at the head and
    /// the block after it; the append is refused with
    /// [`LogError::LogFull`] when that erase would land on unconsumed
    /// records.
    pub fn append(&mut self, payload: &[u8]) -> Result<(), LogError> {
        if !self.powered {
            return Err(LogError::DeviceNotReady);
        }
        if payload.len() as u32 > self.geom.max_payload() {
            return Err(LogError::PayloadTooLarge);
        }
        if self.geom.is_block_aligned(self.head) {
            self.erase_ahead()?;
        }
        self.device
            .write_byte(self.head, PageState::Writing.as_byte())?;
        if !payload.is_empty() {
            self.device.write_bytes(self.head + 1, payload)?;
        }
        self.device
            .write_byte(self.head, PageState::Written.as_byte())?;
        self.head = self.geom.next_page(self.head);
        self.len_pages += 1;
        Ok(())
    }

    /// Append a fixed-size value as one record
    ///
    /// The value is postcard-encoded into `scratch` and appended through
    /// the same three-step protocol. The encoding must fit one page
    /// payload.
    pub fn append_value<T: Serialize>(&mut self, value: &T, scratch: &mut [u8]) -> Result<(), LogError> {
        let encoded = postcard::to_slice(value, scratch).map_err(|_| LogError::Serialization)?;
        self.append(encoded)
    }

    /// Read the record at the tail
    ///
    /// Copies up to `min(buf.len(), page_size - 1)` payload bytes and
    /// returns the count; record length is not stored on media, so the
    /// caller's layout decides how much of the page is meaningful. With
    /// `consume` the tail advances one page and the record's header is
    /// marked `Sent`; without it this is a pure peek.
    ///
    /// A record whose header never reached `Written` (power loss
    /// mid-append) fails with [`LogError::IncompleteRecord`] and does
    /// not advance; [`skip`](Self::skip) drains it.
    pub fn read(&mut self, buf: &mut [u8], consume: bool) -> Result<usize, LogError> {
        match PageState::from_byte(self.tail_header()?) {
            Some(PageState::Writing) => return Err(LogError::IncompleteRecord),
            Some(PageState::Empty) => return Err(LogError::LogEmpty),
            // Written, Sent, or a foreign marker: payload is surfaced
            _ => {}
        }
        let n = buf.len().min(self.geom.max_payload() as usize);
        self.device.read_bytes(self.tail + 1, &mut buf[..n])?;
        if consume {
            self.consume_tail()?;
        }
        Ok(n)
    }

    /// Read and decode the record at the tail
    ///
    /// `scratch` should hold at least `page_size - 1` bytes. Trailing
    /// erased fill after the encoding is ignored; a decode failure never
    /// consumes the record.
    pub fn read_value<T: DeserializeOwned>(
        &mut self,
        scratch: &mut [u8],
        consume: bool,
    ) -> Result<T, LogError> {
        let n = self.read(scratch, false)?;
        let (value, _rest) =
            postcard::take_from_bytes(&scratch[..n]).map_err(|_| LogError::Serialization)?;
        if consume {
            self.consume_tail()?;
        }
        Ok(value)
    }

    /// Advance the tail one page without copying the payload
    ///
    /// The drain primitive for torn records; marks the page `Sent` like
    /// a consuming read.
    pub fn skip(&mut self) -> Result<(), LogError> {
        self.tail_header()?;
        self.consume_tail()
    }

    fn tail_header(&mut self) -> Result<u8, LogError> {
        if !self.powered {
            return Err(LogError::DeviceNotReady);
        }
        if self.len_pages == 0 {
            return Err(LogError::LogEmpty);
        }
        Ok(self.device.read_byte(self.tail)?)
    }

    fn consume_tail(&mut self) -> Result<(), LogError> {
        self.device
            .write_byte(self.tail, PageState::Sent.as_byte())?;
        self.tail = self.geom.next_page(self.tail);
        self.len_pages -= 1;
        Ok(())
    }

    /// Erase the block at the head and the one after it
    ///
    /// Runs only when the head sits on a block boundary. Refused while
    /// the two-block erase span would still hold unconsumed pages; the
    /// ring therefore always keeps at least one fully erased block
    /// between the head and the oldest data, which is also what bounds
    /// the boot scan.
    fn erase_ahead(&mut self) -> Result<(), LogError> {
        let two_blocks = 2 * self.geom.pages_per_block();
        if self.len_pages != 0 && self.free_pages() < two_blocks {
            return Err(LogError::LogFull);
        }
        let first = self.head;
        let second = self.geom.wrap(self.head + self.geom.block_size());
        for sector in [first, second] {
            // Marker first: a scan after a power failure mid-erase must
            // see "erase requested", not trust whatever is left behind.
            self.device
                .write_byte(sector, PageState::Empty.as_byte())?;
            self.device.erase_sector(sector)?;
        }
        Ok(())
    }
}
