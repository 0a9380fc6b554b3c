#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end tests of the transfer engine
//!
//! Every transfer here goes through the public API against real files in a
//! temporary directory.

use dxfer::transfer::{
    copy, copy_with, write_buffer, write_buffer_with, FaultInjection, TransferOptions,
};
use dxfer::{ProgressTracker, TransferError};
use rstest::rstest;
use std::os::unix::fs::FileExt;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
#[path = "common/mod.rs"]
mod test_utils;
use test_utils::{block_on, destination_file, random_data, source_file, test_timeout_guard};

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;

/// Write `size` random bytes and read them back
#[rstest]
fn test_write_buffer_round_trip(
    #[values(512, 777, 4 * MIB, 5 * MIB, 128 * MIB, 135 * MIB)] size: usize,
    #[values(4096, 4 * MIB)] chunk_size: usize,
) {
    let _timeout = test_timeout_guard(Duration::from_secs(300));
    let temp_dir = TempDir::new().unwrap();
    let dst_path = temp_dir.path().join("out.bin");
    let dst = destination_file(&dst_path, 0);
    let data: Arc<[u8]> = random_data(size, size as u64).into();

    let stats = block_on(write_buffer(&dst, Arc::clone(&data), size as u64, chunk_size)).unwrap();

    assert_eq!(stats.total_bytes, size as u64);
    assert_eq!(stats.bytes_written, size as u64);
    assert_eq!(stats.chunks_skipped, 0);
    assert_eq!(std::fs::read(&dst_path).unwrap(), &data[..]);
}

/// Copy a `size`-byte file and compare both sides
#[rstest]
fn test_copy_fidelity(
    #[values(512, 777, 4 * MIB, 5 * MIB, 128 * MIB, 135 * MIB)] size: usize,
    #[values(4096, 4 * MIB)] chunk_size: usize,
) {
    let _timeout = test_timeout_guard(Duration::from_secs(300));
    let temp_dir = TempDir::new().unwrap();
    let src_path = temp_dir.path().join("in.bin");
    let dst_path = temp_dir.path().join("out.bin");
    let data = random_data(size, !(size as u64));
    let src = source_file(&src_path, &data);
    let dst = destination_file(&dst_path, size as u64);

    let stats = block_on(copy(&src, &dst, chunk_size)).unwrap();

    assert_eq!(stats.total_bytes, size as u64);
    assert_eq!(stats.bytes_written, size as u64);
    assert_eq!(std::fs::read(&dst_path).unwrap(), data);
}

#[test]
fn test_all_zero_chunks_are_not_written() {
    let temp_dir = TempDir::new().unwrap();
    let dst_path = temp_dir.path().join("out.bin");
    let dst = destination_file(&dst_path, 0);

    // Chunks 0 and 2 carry data, chunks 1 and 3 are zero
    let mut data = vec![0u8; 4 * 4096];
    data[..4096].copy_from_slice(&random_data(4096, 1));
    data[2 * 4096..3 * 4096].copy_from_slice(&random_data(4096, 2));
    dst.write_all_at(&vec![0xAAu8; data.len()], 0).unwrap();

    let size = data.len() as u64;
    let stats = block_on(write_buffer(&dst, Arc::from(&data[..]), size, 4096)).unwrap();
    assert_eq!(stats.chunks_written, 2);
    assert_eq!(stats.chunks_skipped, 2);
    assert_eq!(stats.bytes_skipped(), 2 * 4096);

    let written = std::fs::read(&dst_path).unwrap();
    assert_eq!(&written[..4096], &data[..4096]);
    assert!(written[4096..2 * 4096].iter().all(|&b| b == 0xAA));
    assert_eq!(&written[2 * 4096..3 * 4096], &data[2 * 4096..3 * 4096]);
    assert!(written[3 * 4096..].iter().all(|&b| b == 0xAA));
}

#[test]
fn test_sparse_source_copies_into_fresh_destination() {
    let temp_dir = TempDir::new().unwrap();
    let src_path = temp_dir.path().join("in.bin");
    let dst_path = temp_dir.path().join("out.bin");

    let mut data = vec![0u8; 8 * 4096];
    data[5 * 4096 + 17] = 0x42;
    let src = source_file(&src_path, &data);
    let dst = destination_file(&dst_path, data.len() as u64);

    let stats = block_on(copy(&src, &dst, 4096)).unwrap();
    assert_eq!(stats.chunks_written, 1);
    assert_eq!(stats.chunks_skipped, 7);
    assert_eq!(std::fs::read(&dst_path).unwrap(), data);
}

#[rstest]
#[case(0)]
#[case(4097)]
#[case(6000)]
#[case(8 * MIB)]
fn test_invalid_chunk_size_writes_nothing(#[case] chunk_size: usize) {
    let temp_dir = TempDir::new().unwrap();
    let src_path = temp_dir.path().join("in.bin");
    let dst_path = temp_dir.path().join("out.bin");
    let data = random_data(64 * KIB, 7);
    let src = source_file(&src_path, &data);
    let dst = destination_file(&dst_path, 0);

    let err = block_on(write_buffer(&dst, Arc::from(data), 64 * KIB as u64, chunk_size))
        .unwrap_err();
    assert!(err.is_config(), "{err}");

    let err = block_on(copy(&src, &dst, chunk_size)).unwrap_err();
    assert!(err.is_config(), "{err}");

    assert_eq!(std::fs::metadata(&dst_path).unwrap().len(), 0);
}

#[test]
fn test_invalid_parallelism_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let dst = destination_file(&temp_dir.path().join("out.bin"), 0);
    for max_parallelism in [0, 9] {
        let options = TransferOptions::new(4096).with_max_parallelism(max_parallelism);
        let err = block_on(write_buffer_with(&dst, Arc::from(vec![1u8; 4096]), 4096, &options))
            .unwrap_err();
        assert!(err.is_config(), "{err}");
    }
}

#[test]
fn test_data_size_larger_than_buffer_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let dst_path = temp_dir.path().join("out.bin");
    let dst = destination_file(&dst_path, 0);

    let err = block_on(write_buffer(&dst, Arc::from(vec![1u8; 4096]), 4097, 4096)).unwrap_err();
    assert!(err.is_config(), "{err}");
    assert_eq!(std::fs::metadata(&dst_path).unwrap().len(), 0);
}

#[test]
fn test_data_size_limits_written_prefix() {
    let temp_dir = TempDir::new().unwrap();
    let dst_path = temp_dir.path().join("out.bin");
    let dst = destination_file(&dst_path, 0);
    let data: Arc<[u8]> = random_data(3 * 4096, 11).into();

    let stats = block_on(write_buffer(&dst, Arc::clone(&data), 5000, 4096)).unwrap();
    assert_eq!(stats.bytes_written, 5000);
    assert_eq!(std::fs::read(&dst_path).unwrap(), &data[..5000]);
}

#[test]
fn test_short_buffer_uses_single_chunk() {
    let temp_dir = TempDir::new().unwrap();
    let dst_path = temp_dir.path().join("out.bin");
    let dst = destination_file(&dst_path, 0);
    let data: Arc<[u8]> = random_data(777, 777).into();

    let stats = block_on(write_buffer(&dst, Arc::clone(&data), 777, 4096)).unwrap();
    assert_eq!(stats.pairs, 1);
    assert_eq!(stats.chunks_written, 1);
    assert_eq!(std::fs::read(&dst_path).unwrap(), &data[..]);
}

#[rstest]
#[case(1, 1)]
#[case(3, 3)]
#[case(7, 7)]
#[case(8, 8)]
#[case(100, 8)]
fn test_pairs_follow_chunk_count(#[case] chunks: usize, #[case] expected_pairs: usize) {
    let temp_dir = TempDir::new().unwrap();
    let dst = destination_file(&temp_dir.path().join("out.bin"), 0);
    let data = random_data(chunks * 4096, chunks as u64);

    let stats = block_on(write_buffer(&dst, data.into(), (chunks * 4096) as u64, 4096)).unwrap();
    assert_eq!(stats.pairs, expected_pairs);
    assert_eq!(stats.chunks_written, chunks as u64);
}

#[test]
fn test_max_parallelism_caps_pairs() {
    let temp_dir = TempDir::new().unwrap();
    let dst_path = temp_dir.path().join("out.bin");
    let dst = destination_file(&dst_path, 0);
    let data: Arc<[u8]> = random_data(10 * 4096, 3).into();

    let options = TransferOptions::new(4096).with_max_parallelism(2);
    let size = data.len() as u64;
    let stats = block_on(write_buffer_with(&dst, Arc::clone(&data), size, &options)).unwrap();
    assert_eq!(stats.pairs, 2);
    assert_eq!(std::fs::read(&dst_path).unwrap(), &data[..]);
}

#[rstest]
#[case(FaultInjection::WorkerAfterWrite)]
#[case(FaultInjection::WorkerSkipWrite)]
#[case(FaultInjection::ProducerRead)]
fn test_injected_fault_is_returned(#[case] fault: FaultInjection) {
    let _timeout = test_timeout_guard(Duration::from_secs(60));
    let temp_dir = TempDir::new().unwrap();
    let src_path = temp_dir.path().join("in.bin");
    let data = random_data(5 * MIB, 5);
    let src = source_file(&src_path, &data);
    let options = TransferOptions::new(4096).with_fault(fault);

    let dst = destination_file(&temp_dir.path().join("buffer.bin"), 0);
    let size = data.len() as u64;
    let err = block_on(write_buffer_with(&dst, Arc::from(&data[..]), size, &options)).unwrap_err();
    assert!(err.is_injected_fault(), "{err}");
    assert_eq!(err.to_string(), "fault injection");

    let dst = destination_file(&temp_dir.path().join("copy.bin"), data.len() as u64);
    let err = block_on(copy_with(&src, &dst, &options)).unwrap_err();
    assert!(err.is_injected_fault(), "{err}");
}

#[test]
fn test_fault_does_not_leak_into_next_transfer() {
    let temp_dir = TempDir::new().unwrap();
    let dst_path = temp_dir.path().join("out.bin");
    let dst = destination_file(&dst_path, 0);
    let data: Arc<[u8]> = random_data(64 * KIB, 9).into();

    let faulty = TransferOptions::new(4096).with_fault(FaultInjection::WorkerAfterWrite);
    assert!(
        block_on(write_buffer_with(&dst, Arc::clone(&data), data.len() as u64, &faulty)).is_err()
    );

    let stats = block_on(write_buffer(&dst, Arc::clone(&data), data.len() as u64, 4096)).unwrap();
    assert_eq!(stats.bytes_written, data.len() as u64);
    assert_eq!(std::fs::read(&dst_path).unwrap(), &data[..]);
}

#[test]
fn test_write_failure_reports_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let dst_path = temp_dir.path().join("out.bin");
    destination_file(&dst_path, 0);
    let read_only = std::fs::File::open(&dst_path).unwrap();

    let data = random_data(64 * KIB, 4);
    let err = block_on(write_buffer(&read_only, data.into(), 64 * 1024, 4096)).unwrap_err();
    match err {
        TransferError::Io { offset, .. } => assert_eq!(offset % 4096, 0),
        other => panic!("expected an I/O error, got {other}"),
    }
}

#[test]
fn test_socket_source_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let dst_path = temp_dir.path().join("out.bin");
    let dst = destination_file(&dst_path, 0);
    let (socket, _peer) = UnixStream::pair().unwrap();

    let err = block_on(copy(&socket, &dst, 4096)).unwrap_err();
    assert!(matches!(err, TransferError::SourceSize(_)), "{err}");
    assert_eq!(std::fs::metadata(&dst_path).unwrap().len(), 0);
}

#[test]
fn test_directory_source_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let dst = destination_file(&temp_dir.path().join("out.bin"), 0);
    let dir = std::fs::File::open(temp_dir.path()).unwrap();

    let err = block_on(copy(&dir, &dst, 4096)).unwrap_err();
    assert!(matches!(err, TransferError::SourceSize(_)), "{err}");
}

#[test]
fn test_empty_source_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let src = source_file(&temp_dir.path().join("in.bin"), &[]);
    let dst = destination_file(&temp_dir.path().join("out.bin"), 0);

    let stats = block_on(copy(&src, &dst, 4096)).unwrap();
    assert_eq!(stats.total_bytes, 0);
    assert_eq!(stats.pairs, 0);
}

#[test]
fn test_progress_counts_written_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let dst = destination_file(&temp_dir.path().join("out.bin"), 0);
    let mut data = random_data(6 * 4096 + 100, 6);
    data[4096..2 * 4096].fill(0);

    let progress = ProgressTracker::hidden();
    let options = TransferOptions::new(4096).with_progress(progress.clone());
    let size = data.len() as u64;
    let stats = block_on(write_buffer_with(&dst, data.into(), size, &options)).unwrap();

    assert_eq!(progress.position(), stats.bytes_written);
    assert_eq!(stats.bytes_written, size - 4096);
}
