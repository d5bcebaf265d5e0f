//! Device geometry and ring arithmetic
//!
//! The address space is a ring: every position the engine computes is a
//! byte offset taken modulo the device capacity. Pages are the write
//! unit, blocks the erase unit, and the constructor enforces the
//! alignment chain (capacity is whole blocks, blocks are whole pages)
//! that the scan and erase arithmetic depend on.

/// Errors from geometry validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GeometryError {
    /// Page must hold a header byte plus at least one payload byte
    PageTooSmall,
    /// Block size is zero or not a multiple of the page size
    BlockNotPageMultiple,
    /// Capacity is not a multiple of the block size
    CapacityNotBlockMultiple,
    /// Capacity below two blocks; the lookahead erase needs a full
    /// block of slack ahead of the write head
    CapacityTooSmall,
}

/// Fixed layout constants of one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    page_size: u32,
    block_size: u32,
    capacity: u32,
}

impl Geometry {
    /// Validate and build a geometry
    ///
    /// Fails fast instead of letting misaligned capacities surface later
    /// as out-of-range device reads inside the boot scan.
    pub fn new(page_size: u32, block_size: u32, capacity: u32) -> Result<Self, GeometryError> {
        if page_size < 2 {
            return Err(GeometryError::PageTooSmall);
        }
        if block_size == 0 || block_size % page_size != 0 {
            return Err(GeometryError::BlockNotPageMultiple);
        }
        if capacity == 0 || capacity % block_size != 0 {
            return Err(GeometryError::CapacityNotBlockMultiple);
        }
        if capacity < 2 * block_size {
            return Err(GeometryError::CapacityTooSmall);
        }
        Ok(Self {
            page_size,
            block_size,
            capacity,
        })
    }

    /// Write-unit size in bytes
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Erase-unit size in bytes
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Device capacity in bytes
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Pages per erase block
    pub fn pages_per_block(&self) -> u32 {
        self.block_size / self.page_size
    }

    /// Total pages on the device
    pub fn total_pages(&self) -> u32 {
        self.capacity / self.page_size
    }

    /// Largest payload one page can carry (one byte is the header)
    pub fn max_payload(&self) -> u32 {
        self.page_size - 1
    }

    /// Reduce an address onto the ring
    pub fn wrap(&self, addr: u32) -> u32 {
        addr % self.capacity
    }

    /// Reduce a signed scan position onto the ring
    ///
    /// Scan loops walk positions outside `0..capacity` in both
    /// directions; only device accesses go through this.
    pub fn wrap_offset(&self, pos: i64) -> u32 {
        pos.rem_euclid(self.capacity as i64) as u32
    }

    /// Address of the page after `addr`
    pub fn next_page(&self, addr: u32) -> u32 {
        self.wrap(addr + self.page_size)
    }

    /// Whether `addr` sits on a page boundary
    pub fn is_page_aligned(&self, addr: u32) -> bool {
        addr % self.page_size == 0
    }

    /// Whether `addr` sits on a block boundary
    pub fn is_block_aligned(&self, addr: u32) -> bool {
        addr % self.block_size == 0
    }

    /// Start address of the block containing `addr`
    pub fn block_start(&self, addr: u32) -> u32 {
        addr - addr % self.block_size
    }

    /// Ring distance from `from` to `to`, in pages
    pub fn span_pages(&self, from: u32, to: u32) -> u32 {
        self.wrap(to + self.capacity - from) / self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_aligned_layout() {
        let g = Geometry::new(256, 4096, 1 << 20).unwrap();
        assert_eq!(g.pages_per_block(), 16);
        assert_eq!(g.total_pages(), 4096);
        assert_eq!(g.max_payload(), 255);
    }

    #[test]
    fn rejects_degenerate_page() {
        assert_eq!(Geometry::new(1, 4096, 1 << 20), Err(GeometryError::PageTooSmall));
        assert_eq!(Geometry::new(0, 4096, 1 << 20), Err(GeometryError::PageTooSmall));
    }

    #[test]
    fn rejects_misaligned_block() {
        assert_eq!(
            Geometry::new(256, 1000, 1 << 20),
            Err(GeometryError::BlockNotPageMultiple)
        );
        assert_eq!(
            Geometry::new(256, 0, 1 << 20),
            Err(GeometryError::BlockNotPageMultiple)
        );
    }

    #[test]
    fn rejects_misaligned_capacity() {
        assert_eq!(
            Geometry::new(256, 4096, 4096 * 3 + 256),
            Err(GeometryError::CapacityNotBlockMultiple)
        );
        assert_eq!(
            Geometry::new(256, 4096, 0),
            Err(GeometryError::CapacityNotBlockMultiple)
        );
    }

    #[test]
    fn rejects_single_block_device() {
        assert_eq!(
            Geometry::new(256, 4096, 4096),
            Err(GeometryError::CapacityTooSmall)
        );
        assert!(Geometry::new(256, 4096, 8192).is_ok());
    }

    #[test]
    fn ring_arithmetic_wraps() {
        let g = Geometry::new(4, 16, 64).unwrap();
        assert_eq!(g.wrap(64), 0);
        assert_eq!(g.wrap(70), 6);
        assert_eq!(g.next_page(60), 0);
        assert_eq!(g.wrap_offset(-4), 60);
        assert_eq!(g.wrap_offset(64), 0);
        assert_eq!(g.wrap_offset(-64), 0);
    }

    #[test]
    fn span_counts_pages_across_the_seam() {
        let g = Geometry::new(4, 16, 64).unwrap();
        assert_eq!(g.span_pages(0, 12), 3);
        assert_eq!(g.span_pages(12, 12), 0);
        // Wrapping run: tail near the end, head near the start
        assert_eq!(g.span_pages(56, 8), 4);
    }

    #[test]
    fn alignment_queries() {
        let g = Geometry::new(4, 16, 64).unwrap();
        assert!(g.is_page_aligned(8));
        assert!(!g.is_page_aligned(9));
        assert!(g.is_block_aligned(48));
        assert!(!g.is_block_aligned(52));
        assert_eq!(g.block_start(52), 48);
        assert_eq!(g.block_start(16), 16);
    }
}
