//! Splitting a transfer into per-producer byte ranges

use super::options::validate_chunk_size;
use crate::error::{Result, TransferError};

/// Half-open byte interval `[start, end)` owned by one producer/worker pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRange {
    /// First byte of the range
    pub start: u64,
    /// One past the last byte of the range
    pub end: u64,
}

impl TransferRange {
    /// Length of the range in bytes
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Chunks of the range as `(offset, length)` in increasing offset order
    ///
    /// Every chunk is `chunk_size` bytes except possibly the last one.
    pub fn chunks(&self, chunk_size: usize) -> impl Iterator<Item = (u64, usize)> {
        let end = self.end;
        let step = chunk_size as u64;
        (self.start..end)
            .step_by(chunk_size.max(1))
            .map(move |offset| (offset, (end - offset).min(step) as usize))
    }
}

/// Number of chunks needed to cover `total_size` bytes
#[must_use]
pub fn chunk_count(total_size: u64, chunk_size: usize) -> u64 {
    total_size.div_ceil(chunk_size as u64)
}

/// Split `[0, total_size)` into contiguous ranges, one per producer
///
/// The number of ranges is `min(max_parallelism, chunk_count)`, so small
/// transfers never get idle producers. Ranges are near-equal and measured in
/// whole chunks, which keeps every range start a multiple of `chunk_size`;
/// the last range absorbs the remaining chunks and the short tail. A
/// zero-byte transfer has no ranges.
///
/// # Errors
///
/// Returns [`TransferError::Config`] for an invalid chunk size or a zero
/// `max_parallelism`.
///
/// # Examples
///
/// ```rust
/// use dxfer::transfer::plan_ranges;
///
/// let ranges = plan_ranges(777, 4096, 8).unwrap();
/// assert_eq!(ranges.len(), 1);
/// assert_eq!((ranges[0].start, ranges[0].end), (0, 777));
/// ```
pub fn plan_ranges(
    total_size: u64,
    chunk_size: usize,
    max_parallelism: usize,
) -> Result<Vec<TransferRange>> {
    validate_chunk_size(chunk_size)?;
    if max_parallelism == 0 {
        return Err(TransferError::Config(
            "max parallelism must be at least 1".to_string(),
        ));
    }

    let num_chunks = chunk_count(total_size, chunk_size);
    let producers = num_chunks.min(max_parallelism as u64);
    if producers == 0 {
        return Ok(Vec::new());
    }

    let share = (num_chunks / producers) * chunk_size as u64;
    let ranges = (0..producers)
        .map(|id| {
            let start = id * share;
            let end = if id == producers - 1 {
                total_size
            } else {
                start + share
            };
            TransferRange { start, end }
        })
        .collect();
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MIB: u64 = 1024 * 1024;

    fn assert_covers(ranges: &[TransferRange], total: u64) {
        let mut expected_start = 0;
        for range in ranges {
            assert_eq!(range.start, expected_start, "gap or overlap in {ranges:?}");
            assert!(!range.is_empty());
            expected_start = range.end;
        }
        assert_eq!(expected_start, total);
    }

    #[rstest]
    #[case(512, 4096, 1)]
    #[case(777, 4096, 1)]
    #[case(4 * MIB, 4096, 8)]
    #[case(5 * MIB, 4096, 8)]
    #[case(4 * MIB, 4 * MIB as usize, 1)]
    #[case(5 * MIB, 4 * MIB as usize, 2)]
    #[case(135 * MIB, 4 * MIB as usize, 8)]
    #[case(3 * 4096 + 1, 4096, 4)]
    fn test_ranges_cover_exactly(
        #[case] total: u64,
        #[case] chunk_size: usize,
        #[case] expected_producers: usize,
    ) {
        let ranges = plan_ranges(total, chunk_size, 8).unwrap();
        assert_eq!(ranges.len(), expected_producers);
        assert_covers(&ranges, total);
        for range in &ranges {
            assert_eq!(range.start % chunk_size as u64, 0);
        }
    }

    #[test]
    fn test_producers_never_exceed_chunks() {
        for chunks in 1..8u64 {
            let ranges = plan_ranges(chunks * 4096, 4096, 8).unwrap();
            assert_eq!(ranges.len() as u64, chunks);
        }
    }

    #[test]
    fn test_last_range_absorbs_remainder() {
        // 11 chunks over 4 producers: 2, 2, 2, then 5 including the tail
        let total = 10 * 4096 + 100;
        let ranges = plan_ranges(total, 4096, 4).unwrap();
        let lens: Vec<u64> = ranges.iter().map(TransferRange::len).collect();
        assert_eq!(lens, vec![8192, 8192, 8192, 4 * 4096 + 100]);
    }

    #[test]
    fn test_empty_transfer_has_no_ranges() {
        assert!(plan_ranges(0, 4096, 8).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_chunk_size_rejected_before_planning() {
        assert!(plan_ranges(MIB, 4097, 8).unwrap_err().is_config());
        assert!(plan_ranges(MIB, 8 * MIB as usize, 8)
            .unwrap_err()
            .is_config());
        assert!(plan_ranges(MIB, 4096, 0).unwrap_err().is_config());
    }

    #[test]
    fn test_chunks_walk_range_in_steps() {
        let range = TransferRange {
            start: 8192,
            end: 8192 + 4096 * 2 + 10,
        };
        let chunks: Vec<_> = range.chunks(4096).collect();
        assert_eq!(chunks, vec![(8192, 4096), (12288, 4096), (16384, 10)]);
    }
}
