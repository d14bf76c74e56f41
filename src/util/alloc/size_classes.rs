//! Sizing table for the segregated free list.
//!
//! Requests up to `MAX_SMALL_BYTES` map onto one of `SIZE_CLASSES` cell
//! sizes. The table is banded: within a band consecutive classes differ
//! by a fixed stride, so both directions of the mapping reduce to a
//! compare ladder and a shift.
//!
//! | band      | stride |
//! |-----------|--------|
//! | 1..64     | 4      |
//! | 65..128   | 16     |
//! | 129..256  | 32     |
//! | 257..512  | 64     |
//! | 513..2048 | 256    |
//! | 2049..8192| 1024   |

/// The number of distinct cell sizes.
pub const SIZE_CLASSES: usize = 40;

/// The largest request the table covers. Anything bigger must take the
/// large object path.
pub const MAX_SMALL_BYTES: usize = 8192;

/// The size class whose cells fit a `bytes`-byte request.
#[inline(always)]
pub fn size_class(bytes: usize) -> usize {
    debug_assert!(bytes >= 1 && bytes <= MAX_SMALL_BYTES);
    let sz1 = bytes - 1;
    if sz1 <= 63 {
        sz1 >> 2
    } else if sz1 <= 127 {
        12 + (sz1 >> 4)
    } else if sz1 <= 255 {
        16 + (sz1 >> 5)
    } else if sz1 <= 511 {
        20 + (sz1 >> 6)
    } else if sz1 <= 2047 {
        26 + (sz1 >> 8)
    } else {
        32 + (sz1 >> 10)
    }
}

/// The number of bytes in one cell of size class `sc`.
#[inline(always)]
pub fn cell_size(sc: usize) -> usize {
    debug_assert!(sc < SIZE_CLASSES);
    if sc < 16 {
        (sc + 1) << 2
    } else if sc < 20 {
        (sc - 11) << 4
    } else if sc < 24 {
        (sc - 15) << 5
    } else if sc < 28 {
        (sc - 19) << 6
    } else if sc < 34 {
        (sc - 25) << 8
    } else {
        (sc - 31) << 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_small_size_has_a_class() {
        for bytes in 1..=MAX_SMALL_BYTES {
            let sc = size_class(bytes);
            assert!(sc < SIZE_CLASSES);
            assert!(cell_size(sc) >= bytes);
        }
    }

    #[test]
    fn classes_are_tight() {
        // One class down would not fit the request.
        for bytes in 1..=MAX_SMALL_BYTES {
            let sc = size_class(bytes);
            if sc > 0 {
                assert!(cell_size(sc - 1) < bytes);
            }
        }
    }

    #[test]
    fn cell_sizes_strictly_increase() {
        for sc in 1..SIZE_CLASSES {
            assert!(cell_size(sc) > cell_size(sc - 1));
        }
    }

    #[test]
    fn lookup_is_exact_on_cell_sizes() {
        for sc in 0..SIZE_CLASSES {
            assert_eq!(size_class(cell_size(sc)), sc);
        }
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(size_class(1), 0);
        assert_eq!(size_class(64), 15);
        assert_eq!(size_class(65), 16);
        assert_eq!(size_class(128), 19);
        assert_eq!(size_class(129), 20);
        assert_eq!(size_class(256), 23);
        assert_eq!(size_class(257), 24);
        assert_eq!(size_class(512), 27);
        assert_eq!(size_class(513), 28);
        assert_eq!(size_class(2048), 33);
        assert_eq!(size_class(2049), 34);
        assert_eq!(size_class(8192), 39);
        assert_eq!(cell_size(39), MAX_SMALL_BYTES);
    }
}
