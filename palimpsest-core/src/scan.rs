//! Boot-time head/tail recovery
//!
//! After a reset the only truth is the media image a previous session
//! left behind, possibly torn mid-protocol. The scanner reconstructs the
//! write head and read tail from per-page header bytes alone; payloads
//! are never inspected.
//!
//! Both recoveries are two-level linear scans: a coarse pass at block
//! stride narrows the search to one block, a fine pass at page stride
//! pins the exact page. Linear, not bisection - a latency trade, not a
//! correctness one. Scan positions run outside `0..capacity` in both
//! directions; every device access is wrapped, so misalignment can never
//! turn into an out-of-range read.

use palimpsest_hal::FlashDevice;

use crate::error::LogError;
use crate::geometry::Geometry;
use crate::page::PageState;

/// Pointers reconstructed from the media image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecoveredLog {
    /// Next page address to write
    pub head: u32,
    /// Oldest unconsumed page address
    pub tail: u32,
    /// Unconsumed pages between tail and head
    pub len_pages: u32,
}

/// One-shot scanner over a device's header bytes
pub struct BootScanner<'d, D: FlashDevice> {
    device: &'d mut D,
    geom: Geometry,
}

impl<'d, D: FlashDevice> BootScanner<'d, D> {
    /// Borrow a device for scanning
    pub fn new(device: &'d mut D, geom: Geometry) -> Self {
        Self { device, geom }
    }

    /// Recover head, tail and the unconsumed length
    ///
    /// A page stuck in `Writing` by a power loss counts as written here:
    /// the head lands after it and the reader, not the scanner, refuses
    /// its payload. Records already marked `Sent` are skipped so they do
    /// not surface twice after a restart.
    pub fn recover(&mut self) -> Result<RecoveredLog, LogError> {
        let cap = self.geom.capacity() as i64;
        let block = self.geom.block_size() as i64;
        let page = self.geom.page_size() as i64;

        // Coarse: last block whose start page looks written.
        let coarse = self.scan(0, cap, block)?;
        if coarse >= cap {
            // No written-to-empty boundary among block starts.
            if PageState::byte_is_empty(self.header(0)?) {
                // Freshly erased device.
                return Ok(RecoveredLog {
                    head: 0,
                    tail: 0,
                    len_pages: 0,
                });
            }
            return Err(LogError::ScanAmbiguous);
        }

        // Fine: last written page inside that block. The sample one past
        // the block end is the next block's start, which the coarse pass
        // already saw empty, so a boundary must exist here.
        let fine = self.scan(coarse, coarse + block, page)?;
        if fine >= coarse + block {
            return Err(LogError::ScanAmbiguous);
        }
        let head = self.geom.wrap_offset(fine + page);

        // Tail: walk backward from the last written page to the oldest
        // boundary of the contiguous written run. The erased lookahead
        // region bounds the walk within one lap; a full lap without a
        // boundary means the image carries no erased gap at this stride.
        let back = self.scan(fine, fine - cap, -block)?;
        if back <= fine - cap {
            return Err(LogError::ScanAmbiguous);
        }
        let back_fine = self.scan(back, back - block, -page)?;
        let mut tail = self.geom.wrap_offset(back_fine);

        // Records consumed before the restart stay Sent on media; do not
        // resurface them.
        while tail != head {
            let state = PageState::from_byte(self.device.read_byte(tail)?);
            if state != Some(PageState::Sent) {
                break;
            }
            tail = self.geom.next_page(tail);
        }

        let len_pages = self.geom.span_pages(tail, head);
        Ok(RecoveredLog {
            head,
            tail,
            len_pages,
        })
    }

    fn header(&mut self, pos: i64) -> Result<u8, LogError> {
        Ok(self.device.read_byte(self.geom.wrap_offset(pos))?)
    }

    /// Walk headers from `from` by `step` until `to` is passed
    ///
    /// Returns the position before the first written-to-empty transition
    /// along the walk (any non-empty byte counts as written), or the
    /// final position reached when no transition occurs.
    fn scan(&mut self, from: i64, to: i64, step: i64) -> Result<i64, LogError> {
        let mut last = PageState::Empty.as_byte();
        let mut pos = from;
        while if step > 0 { pos <= to } else { pos >= to } {
            let byte = self.header(pos)?;
            if PageState::byte_is_empty(byte) && !PageState::byte_is_empty(last) {
                return Ok(pos - step);
            }
            last = byte;
            pos += step;
        }
        Ok(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_sim::SimFlash;

    // 4-byte pages, 16-byte blocks, 4 blocks of 4 pages each.
    const PAGE: u32 = 4;
    const BLOCK: u32 = 16;
    const CAP: usize = 64;

    fn geom() -> Geometry {
        Geometry::new(PAGE, BLOCK, CAP as u32).unwrap()
    }

    fn mark(flash: &mut SimFlash<CAP>, page_index: u32, state: PageState) {
        flash.fill(page_index * PAGE, &[state.as_byte()]);
    }

    fn recover(flash: &mut SimFlash<CAP>) -> Result<RecoveredLog, LogError> {
        BootScanner::new(flash, geom()).recover()
    }

    #[test]
    fn empty_device_recovers_origin() {
        let mut flash = SimFlash::<CAP>::new(BLOCK);
        let rec = recover(&mut flash).unwrap();
        assert_eq!(
            rec,
            RecoveredLog {
                head: 0,
                tail: 0,
                len_pages: 0
            }
        );
    }

    #[test]
    fn run_from_origin() {
        let mut flash = SimFlash::<CAP>::new(BLOCK);
        for p in 0..5 {
            mark(&mut flash, p, PageState::Written);
        }
        let rec = recover(&mut flash).unwrap();
        assert_eq!(rec.head, 5 * PAGE);
        assert_eq!(rec.tail, 0);
        assert_eq!(rec.len_pages, 5);
    }

    #[test]
    fn run_ending_on_block_boundary() {
        let mut flash = SimFlash::<CAP>::new(BLOCK);
        // Blocks 0..=2 completely written, block 3 erased.
        for p in 0..12 {
            mark(&mut flash, p, PageState::Written);
        }
        let rec = recover(&mut flash).unwrap();
        assert_eq!(rec.head, 48);
        assert_eq!(rec.tail, 0);
        assert_eq!(rec.len_pages, 12);
    }

    #[test]
    fn wrapped_run_recovers_across_the_seam() {
        let mut flash = SimFlash::<CAP>::new(BLOCK);
        // Blocks 2 and 3 full, pages 0..=1 of block 0 written, block 1
        // is the erased lookahead gap.
        for p in 8..16 {
            mark(&mut flash, p, PageState::Written);
        }
        mark(&mut flash, 0, PageState::Written);
        mark(&mut flash, 1, PageState::Written);
        let rec = recover(&mut flash).unwrap();
        assert_eq!(rec.head, 2 * PAGE);
        assert_eq!(rec.tail, 32);
        assert_eq!(rec.len_pages, 10);
    }

    #[test]
    fn torn_page_counts_as_written() {
        let mut flash = SimFlash::<CAP>::new(BLOCK);
        for p in 0..3 {
            mark(&mut flash, p, PageState::Written);
        }
        // Power died between the Writing and Written header updates.
        mark(&mut flash, 3, PageState::Writing);
        let rec = recover(&mut flash).unwrap();
        assert_eq!(rec.head, 4 * PAGE);
        assert_eq!(rec.tail, 0);
        assert_eq!(rec.len_pages, 4);
    }

    #[test]
    fn sent_records_are_skipped() {
        let mut flash = SimFlash::<CAP>::new(BLOCK);
        mark(&mut flash, 0, PageState::Sent);
        mark(&mut flash, 1, PageState::Sent);
        for p in 2..5 {
            mark(&mut flash, p, PageState::Written);
        }
        let rec = recover(&mut flash).unwrap();
        assert_eq!(rec.head, 5 * PAGE);
        assert_eq!(rec.tail, 2 * PAGE);
        assert_eq!(rec.len_pages, 3);
    }

    #[test]
    fn fully_consumed_run_recovers_empty() {
        let mut flash = SimFlash::<CAP>::new(BLOCK);
        for p in 0..4 {
            mark(&mut flash, p, PageState::Sent);
        }
        let rec = recover(&mut flash).unwrap();
        assert_eq!(rec.head, 4 * PAGE);
        assert_eq!(rec.tail, rec.head);
        assert_eq!(rec.len_pages, 0);
    }

    #[test]
    fn fully_written_device_is_ambiguous() {
        let mut flash = SimFlash::<CAP>::new(BLOCK);
        for p in 0..16 {
            mark(&mut flash, p, PageState::Written);
        }
        assert_eq!(recover(&mut flash), Err(LogError::ScanAmbiguous));
    }

    #[test]
    fn payloads_are_never_inspected() {
        let mut flash = SimFlash::<CAP>::new(BLOCK);
        // Payload bytes that look like header markers must not confuse
        // the scan; only byte 0 of each page is read.
        for p in 0..3 {
            mark(&mut flash, p, PageState::Written);
            flash.fill(p * PAGE + 1, &[0xFF, 0x3F, 0x7F]);
        }
        let rec = recover(&mut flash).unwrap();
        assert_eq!(rec.head, 3 * PAGE);
        assert_eq!(rec.tail, 0);
    }
}
