//! Per-page header state machine
//!
//! Byte 0 of every page is its state marker. The legal lifecycle is
//!
//! ```text
//! Empty ──▶ Writing ──▶ Written ──▶ Sent
//!   ▲                                 │
//!   └────────── block erase ──────────┘
//! ```
//!
//! The return to `Empty` only ever happens by erasing the containing
//! block; there is no page-level transition back. Each forward step
//! clears header bits relative to its predecessor, which is what makes
//! updating the marker in place legal on NOR flash (program can clear
//! bits, never set them).

/// State marker stored in the first byte of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PageState {
    /// Erased, never written since the last block erase
    Empty = 0xFF,
    /// Write started; payload bytes may be partial and must not be
    /// surfaced as data
    Writing = 0x7F,
    /// Payload complete and durable
    Written = 0x3F,
    /// Consumed by a reader; awaiting reclamation by block erase
    Sent = 0x37,
}

impl PageState {
    /// Marker as the raw header byte
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Decode a header byte
    ///
    /// Returns `None` for unrecognized values. The boot scan does not
    /// need the decoded state: it treats every non-[`Empty`](Self::Empty)
    /// byte as "written", so torn or foreign markers still anchor the
    /// scan correctly.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0xFF => Some(PageState::Empty),
            0x7F => Some(PageState::Writing),
            0x3F => Some(PageState::Written),
            0x37 => Some(PageState::Sent),
            _ => None,
        }
    }

    /// Whether a raw header byte is the erased marker
    pub fn byte_is_empty(value: u8) -> bool {
        value == PageState::Empty.as_byte()
    }

    /// Whether `next` is a legal page-level successor of `self`
    ///
    /// Block erase is not represented here; no page-level operation
    /// returns a page to `Empty`.
    pub fn can_advance_to(self, next: PageState) -> bool {
        matches!(
            (self, next),
            (PageState::Empty, PageState::Writing)
                | (PageState::Writing, PageState::Written)
                | (PageState::Written, PageState::Sent)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_round_trip() {
        for state in [
            PageState::Empty,
            PageState::Writing,
            PageState::Written,
            PageState::Sent,
        ] {
            assert_eq!(PageState::from_byte(state.as_byte()), Some(state));
        }
        assert_eq!(PageState::from_byte(0x00), None);
        assert_eq!(PageState::from_byte(0x3E), None);
    }

    #[test]
    fn transition_table() {
        use PageState::*;
        assert!(Empty.can_advance_to(Writing));
        assert!(Writing.can_advance_to(Written));
        assert!(Written.can_advance_to(Sent));

        // No skips, no reversals, no page-level return to Empty
        assert!(!Empty.can_advance_to(Written));
        assert!(!Empty.can_advance_to(Sent));
        assert!(!Writing.can_advance_to(Sent));
        assert!(!Written.can_advance_to(Writing));
        assert!(!Sent.can_advance_to(Empty));
        assert!(!Written.can_advance_to(Empty));
        assert!(!Writing.can_advance_to(Empty));
    }

    #[test]
    fn forward_steps_only_clear_bits() {
        // NOR program constraint: each marker must be reachable from its
        // predecessor by clearing bits alone.
        let order = [
            PageState::Empty,
            PageState::Writing,
            PageState::Written,
            PageState::Sent,
        ];
        for pair in order.windows(2) {
            let (prev, next) = (pair[0].as_byte(), pair[1].as_byte());
            assert_eq!(prev & next, next, "{prev:#04x} -> {next:#04x}");
        }
    }
}
