//! src/builders/job_builder.rs
//! Bulk decryption job builder

use crate::aliases::{HexKeyString, RawKey32};
use crate::consts::DEFAULT_PROGRESS_INTERVAL;
use crate::error::DecryptError;
use crate::kdf::KdfParams;
use crate::utils::decode_raw_key;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which pages get their tag checked.
///
/// Page 0 is authenticated under every policy because it is what proves the
/// key fits the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// Authenticate page 0 only (fast path).
    #[default]
    FirstPage,
    /// Authenticate every non-sentinel page.
    AllPages,
}

impl ValidationPolicy {
    #[inline(always)]
    pub const fn validates(&self, page_index: u32) -> bool {
        page_index == 0 || matches!(self, ValidationPolicy::AllPages)
    }
}

/// Where the reconstructed container goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// A uniquely named file inside this directory.
    Directory(PathBuf),
    /// Exactly this path (replaced atomically if it exists).
    File(PathBuf),
}

impl Default for OutputTarget {
    fn default() -> Self {
        OutputTarget::Directory(std::env::temp_dir())
    }
}

/// One bulk decryption: input, output, key and policy.
///
/// The raw key lives in a secure-gate buffer and is wiped when the job is
/// dropped, i.e. when the run that consumed it finishes.
pub struct DecryptJob {
    pub(crate) input: PathBuf,
    pub(crate) output: OutputTarget,
    pub(crate) raw_key: RawKey32,
    pub(crate) validation: ValidationPolicy,
    pub(crate) kdf: KdfParams,
    pub(crate) progress_interval: u64,
}

impl DecryptJob {
    /// Shorthand for [`DecryptJobBuilder::new`] + [`DecryptJobBuilder::build`]
    /// with default settings.
    pub fn new(input: impl Into<PathBuf>, hex_key: &str) -> Result<Self, DecryptError> {
        DecryptJobBuilder::new(input, hex_key).build()
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &OutputTarget {
        &self.output
    }

    pub const fn validation(&self) -> ValidationPolicy {
        self.validation
    }

    pub const fn kdf_params(&self) -> &KdfParams {
        &self.kdf
    }

    pub const fn progress_interval(&self) -> u64 {
        self.progress_interval
    }

    pub(crate) fn raw_key(&self) -> &RawKey32 {
        &self.raw_key
    }

    /// The pre-checks that run on the caller's thread before any worker
    /// starts: the key length was already enforced at build time, so what is
    /// left is the input's existence.
    pub fn precheck(&self) -> Result<(), DecryptError> {
        if !self.input.is_file() {
            return Err(DecryptError::FileNotFound(self.input.clone()));
        }
        Ok(())
    }
}

impl fmt::Debug for DecryptJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptJob")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("raw_key", &"[REDACTED]")
            .field("validation", &self.validation)
            .field("kdf", &self.kdf)
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}

/// Builder for [`DecryptJob`].
///
/// Defaults: unique output name in the system temp directory, page-0-only
/// validation, the container format's KDF parameters, progress every
/// [`DEFAULT_PROGRESS_INTERVAL`] pages.
pub struct DecryptJobBuilder {
    input: PathBuf,
    hex_key: HexKeyString,
    output: OutputTarget,
    validation: ValidationPolicy,
    kdf: KdfParams,
    progress_interval: u64,
}

impl DecryptJobBuilder {
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, hex_key: &str) -> Self {
        Self {
            input: input.into(),
            hex_key: HexKeyString::new(hex_key.to_string()),
            output: OutputTarget::default(),
            validation: ValidationPolicy::default(),
            kdf: KdfParams::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Write a uniquely named file into `dir`.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output = OutputTarget::Directory(dir.into());
        self
    }

    /// Write to exactly `path`.
    #[must_use]
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = OutputTarget::File(path.into());
        self
    }

    #[must_use]
    pub fn with_validation(mut self, validation: ValidationPolicy) -> Self {
        self.validation = validation;
        self
    }

    /// Authenticate every page rather than only page 0.
    #[must_use]
    pub fn validate_all_pages(self) -> Self {
        self.with_validation(ValidationPolicy::AllPages)
    }

    #[must_use]
    pub fn with_kdf_params(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Report progress every `pages` pages (minimum 1).
    #[must_use]
    pub fn with_progress_interval(mut self, pages: u64) -> Self {
        self.progress_interval = pages.max(1);
        self
    }

    /// Decode the key and produce the job.
    ///
    /// # Errors
    ///
    /// [`DecryptError::InvalidKeyLength`] / [`DecryptError::InvalidKeyEncoding`]
    /// for a malformed key. The input file is not touched here.
    pub fn build(self) -> Result<DecryptJob, DecryptError> {
        let raw_key = decode_raw_key(self.hex_key.expose_secret())?;
        Ok(DecryptJob {
            input: self.input,
            output: self.output,
            raw_key,
            validation: self.validation,
            kdf: self.kdf,
            progress_interval: self.progress_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn defaults() {
        let job = DecryptJob::new("in.db", KEY).unwrap();
        assert_eq!(job.validation(), ValidationPolicy::FirstPage);
        assert_eq!(job.kdf_params(), &KdfParams::default());
        assert_eq!(job.progress_interval(), 10);
        assert!(matches!(job.output(), OutputTarget::Directory(_)));
        assert_eq!(job.raw_key().expose_secret()[31], 0x1f);
    }

    #[test]
    fn builder_holds_key_in_secure_buffer() {
        let builder = DecryptJobBuilder::new("in.db", KEY);
        let held: &HexKeyString = &builder.hex_key;
        assert_eq!(held.expose_secret().as_str(), KEY);
        let job = builder.build().unwrap();
        assert_eq!(job.raw_key().expose_secret()[0], 0x00);
        assert_eq!(job.raw_key().expose_secret()[1], 0x01);
    }

    #[test]
    fn builder_overrides() {
        let job = DecryptJobBuilder::new("in.db", KEY)
            .with_output_file("/tmp/out.db")
            .validate_all_pages()
            .with_kdf_params(KdfParams::new(4, 2))
            .with_progress_interval(0)
            .build()
            .unwrap();
        assert_eq!(job.output(), &OutputTarget::File("/tmp/out.db".into()));
        assert_eq!(job.validation(), ValidationPolicy::AllPages);
        assert_eq!(job.kdf_params().iterations, 4);
        assert_eq!(job.progress_interval(), 1);
    }

    #[test]
    fn malformed_key_fails_at_build() {
        let err = DecryptJob::new("in.db", "abcd").unwrap_err();
        assert!(matches!(err, DecryptError::InvalidKeyLength(2)));
    }

    #[test]
    fn policy_always_validates_first_page() {
        assert!(ValidationPolicy::FirstPage.validates(0));
        assert!(!ValidationPolicy::FirstPage.validates(1));
        assert!(ValidationPolicy::AllPages.validates(1));
    }

    #[test]
    fn debug_hides_key() {
        let job = DecryptJob::new("in.db", KEY).unwrap();
        assert!(format!("{job:?}").contains("REDACTED"));
    }

    #[test]
    fn precheck_reports_missing_input() {
        let job = DecryptJob::new("/no/such/file.db", KEY).unwrap();
        assert!(matches!(job.precheck(), Err(DecryptError::FileNotFound(_))));
    }
}
