#[cfg(feature = "batch-ops")]
use rayon::prelude::*;
#[cfg(feature = "batch-ops")]
use std::path::PathBuf;

#[cfg(feature = "batch-ops")]
use crate::builders::DecryptJob;
#[cfg(feature = "batch-ops")]
use crate::{decryption, DecryptError};

/// Decrypt many containers in parallel on the rayon pool.
///
/// Results come back in input order; one failing job does not stop the
/// others.
#[cfg(feature = "batch-ops")]
pub fn decrypt_batch(jobs: Vec<DecryptJob>) -> Vec<Result<PathBuf, DecryptError>> {
    jobs.into_par_iter()
        .map(|job| decryption::run(job, |_, _| {}))
        .collect()
}
