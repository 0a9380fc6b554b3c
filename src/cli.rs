//! Command-line interface definitions

use crate::copy::CopySettings;
use crate::transfer::{validate_chunk_size, MAX_PRODUCERS};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Parallel direct-I/O copy of a file or block device
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Regular file or block device to read
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// File or block device to write; regular files are created and truncated
    #[arg(value_name = "DESTINATION")]
    pub destination: PathBuf,

    /// Chunk size in KB; must be a multiple of 4 and at most 4096
    #[arg(long, default_value = "4096")]
    pub chunk_size_kb: usize,

    /// Maximum number of reader/writer pairs
    #[arg(long, default_value = "8")]
    pub max_parallelism: usize,

    /// Open source and destination with `O_DIRECT`, bypassing the page cache
    ///
    /// Reads always request whole 4 KB blocks, but most filesystems reject a
    /// direct write whose length is not a multiple of the logical block
    /// size, so writing the final chunk of a source whose size is not 4 KB
    /// aligned may fail with `EINVAL`.
    #[arg(long)]
    pub direct: bool,

    /// Show progress information
    #[arg(long)]
    pub progress: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Validate command-line arguments
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - Source path does not exist
    /// - Source path is a directory
    /// - Chunk size is zero, above 4096 KB or not a multiple of 4 KB
    /// - Max parallelism is outside 1..=8
    /// - Both --quiet and --verbose options are used
    pub fn validate(&self) -> Result<()> {
        if !self.source.exists() {
            anyhow::bail!("Source path does not exist: {}", self.source.display());
        }
        if self.source.is_dir() {
            anyhow::bail!(
                "Source path must be a file or block device: {}",
                self.source.display()
            );
        }

        validate_chunk_size(self.chunk_size())?;

        if self.max_parallelism < 1 || self.max_parallelism > MAX_PRODUCERS {
            anyhow::bail!(
                "Max parallelism must be between 1 and {}, got: {}",
                MAX_PRODUCERS,
                self.max_parallelism
            );
        }

        if self.quiet && self.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }

        Ok(())
    }

    /// Chunk size in bytes
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size_kb.saturating_mul(1024)
    }

    /// Settings for [`copy_file`](crate::copy::copy_file)
    #[must_use]
    pub const fn copy_settings(&self) -> CopySettings {
        CopySettings {
            chunk_size: self.chunk_size(),
            max_parallelism: self.max_parallelism,
            direct: self.direct,
            progress: self.progress && !self.quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rstest::rstest;
    use tempfile::{NamedTempFile, TempDir};

    fn args_for(source: PathBuf) -> Args {
        Args::parse_from(["dxfer", source.to_str().unwrap(), "/tmp/dxfer-dest"])
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["dxfer", "/src", "/dst"]);
        assert_eq!(args.source, PathBuf::from("/src"));
        assert_eq!(args.destination, PathBuf::from("/dst"));
        assert_eq!(args.chunk_size(), 4 * 1024 * 1024);
        assert_eq!(args.max_parallelism, 8);
        assert!(!args.direct);
        assert!(!args.progress);
    }

    #[test]
    fn test_validate_with_existing_file() {
        let src = NamedTempFile::new().unwrap();
        assert!(args_for(src.path().to_path_buf()).validate().is_ok());
    }

    #[test]
    fn test_validate_with_nonexistent_source() {
        assert!(args_for(PathBuf::from("/nonexistent/path")).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_directory() {
        let dir = TempDir::new().unwrap();
        assert!(args_for(dir.path().to_path_buf()).validate().is_err());
    }

    #[rstest]
    #[case(0, false)]
    #[case(4, true)]
    #[case(6, false)]
    #[case(1024, true)]
    #[case(4096, true)]
    #[case(8192, false)]
    fn test_validate_chunk_size(#[case] chunk_size_kb: usize, #[case] valid: bool) {
        let src = NamedTempFile::new().unwrap();
        let mut args = args_for(src.path().to_path_buf());
        args.chunk_size_kb = chunk_size_kb;
        assert_eq!(args.validate().is_ok(), valid);
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(8, true)]
    #[case(9, false)]
    fn test_validate_max_parallelism(#[case] max_parallelism: usize, #[case] valid: bool) {
        let src = NamedTempFile::new().unwrap();
        let mut args = args_for(src.path().to_path_buf());
        args.max_parallelism = max_parallelism;
        assert_eq!(args.validate().is_ok(), valid);
    }

    #[test]
    fn test_quiet_and_verbose_conflict() {
        let src = NamedTempFile::new().unwrap();
        let mut args = args_for(src.path().to_path_buf());
        args.quiet = true;
        args.verbose = 1;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_quiet_hides_progress() {
        let args = Args::parse_from(["dxfer", "--progress", "-q", "/src", "/dst"]);
        assert!(!args.copy_settings().progress);
    }
}
