//! src/decryption/decrypt.rs
//! Bulk decryption of a whole container

use crate::aliases::PageBuffer;
use crate::builders::DecryptJob;
use crate::consts::{PAGE_SIZE, SALT_SIZE};
use crate::decryption::output::OutputFile;
use crate::decryption::progress::ProgressTracker;
use crate::decryption::read::PageReader;
use crate::error::DecryptError;
use crate::header::{page_count, read_salt};
use crate::kdf::derive_keys;
use crate::page::reconstruct_page;
use crate::utils::is_zero_page;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Decrypt `job.input()` into a standard database file.
///
/// `on_progress(done, total)` is called with `(0, total)` before the first
/// page, then every [`progress_interval`](DecryptJob::progress_interval)
/// pages and once with `(total, total)` after the output is persisted. It
/// runs on the calling thread and never sees `(total, total)` for a failed
/// job.
///
/// On success the returned path holds exactly
/// `ceil(input_len / 4096) * 4096` bytes. On any failure nothing is left at
/// the destination.
///
/// # Errors
///
/// - [`DecryptError::FileNotFound`] if the input does not exist
/// - [`DecryptError::InvalidContainer`] if it is too short or already plaintext
/// - [`DecryptError::KeyValidationFailed`] if the key does not fit page 0
/// - [`DecryptError::PageCorrupt`] under [`AllPages`](crate::ValidationPolicy::AllPages)
/// - [`DecryptError::OutputWriteFailed`] if the output cannot be written
///
/// # Example
///
/// ```no_run
/// use wxdb_rs::{decryption, DecryptJobBuilder};
///
/// let job = DecryptJobBuilder::new("MSG0.db", &"00".repeat(32))
///     .with_output_dir("out")
///     .build()?;
/// let path = decryption::run(job, |done, total| println!("{done}/{total}"))?;
/// println!("plaintext at {}", path.display());
/// # Ok::<(), wxdb_rs::DecryptError>(())
/// ```
pub fn run<F>(job: DecryptJob, on_progress: F) -> Result<PathBuf, DecryptError>
where
    F: FnMut(u64, u64),
{
    run_cancellable(job, on_progress, &AtomicBool::new(false))
}

/// [`run`] that stops with [`DecryptError::Cancelled`] once `cancel` is set.
///
/// The flag is checked before every page.
pub fn run_cancellable<F>(
    job: DecryptJob,
    mut on_progress: F,
    cancel: &AtomicBool,
) -> Result<PathBuf, DecryptError>
where
    F: FnMut(u64, u64),
{
    job.precheck()?;
    let started = Instant::now();
    info!(input = %job.input().display(), validation = ?job.validation(), "decryption started");

    let input = BufReader::new(File::open(job.input())?);
    let mut output = OutputFile::create(job.output(), job.input())?;
    debug!(destination = %output.destination().display(), "output target resolved");

    let (pages, mut tracker) = decrypt_pages(
        input,
        BufWriter::new(output.file_mut()),
        &job,
        &mut on_progress,
        Some(cancel),
    )?;
    let path = output.persist()?;
    tracker.finish(&mut on_progress);

    info!(
        output = %path.display(),
        pages,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "decryption finished"
    );
    Ok(path)
}

/// Decrypt a container held in any seekable reader into `output`.
///
/// Uses the key, validation policy, KDF parameters and progress interval of
/// `job`; its input path and output target are ignored. Returns the number
/// of pages written.
pub fn decrypt_to_writer<R, W, F>(
    input: R,
    output: W,
    job: &DecryptJob,
    mut on_progress: F,
) -> Result<u64, DecryptError>
where
    R: Read + Seek,
    W: Write,
    F: FnMut(u64, u64),
{
    let (pages, mut tracker) = decrypt_pages(input, output, job, &mut on_progress, None)?;
    tracker.finish(&mut on_progress);
    Ok(pages)
}

fn remaining_len<R: Seek>(input: &mut R) -> Result<u64, DecryptError> {
    let start = input.stream_position()?;
    let end = input.seek(SeekFrom::End(0))?;
    input.seek(SeekFrom::Start(start))?;
    Ok(end.saturating_sub(start))
}

#[inline(always)]
fn check_cancel(cancel: Option<&AtomicBool>) -> Result<(), DecryptError> {
    match cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(DecryptError::Cancelled),
        _ => Ok(()),
    }
}

fn decrypt_pages<R, W, F>(
    mut input: R,
    mut output: W,
    job: &DecryptJob,
    on_progress: &mut F,
    cancel: Option<&AtomicBool>,
) -> Result<(u64, ProgressTracker), DecryptError>
where
    R: Read + Seek,
    W: Write,
    F: FnMut(u64, u64),
{
    let len = remaining_len(&mut input)?;
    if len < SALT_SIZE as u64 {
        return Err(DecryptError::InvalidContainer(format!(
            "file is {len} bytes, shorter than the {SALT_SIZE}-byte salt"
        )));
    }
    let total = page_count(len);
    let mut tracker = ProgressTracker::new(total, job.progress_interval());
    let mut reader = PageReader::new(input);
    let mut plain = PageBuffer::new([0u8; PAGE_SIZE]);

    check_cancel(cancel)?;
    let Some((_, first)) = reader.next_page()? else {
        return Err(DecryptError::InvalidContainer("file is empty".into()));
    };
    let salt = read_salt(&first[..SALT_SIZE])?;
    if is_zero_page(first) {
        tracing::warn!("page 0 is all zeros");
        return Err(DecryptError::KeyValidationFailed);
    }
    let keys = derive_keys(job.raw_key(), &salt, job.kdf_params())?;

    tracker.start(on_progress);
    reconstruct_page(first, &keys, 0, true, plain.expose_secret_mut())?;
    output
        .write_all(plain.expose_secret())
        .map_err(DecryptError::OutputWriteFailed)?;
    tracker.advance(1, on_progress);

    loop {
        check_cancel(cancel)?;
        let Some((index, page)) = reader.next_page()? else {
            break;
        };
        let validate = job.validation().validates(index);
        reconstruct_page(page, &keys, index, validate, plain.expose_secret_mut())?;
        output
            .write_all(plain.expose_secret())
            .map_err(DecryptError::OutputWriteFailed)?;
        tracker.advance(u64::from(index) + 1, on_progress);
    }
    output.flush().map_err(DecryptError::OutputWriteFailed)?;

    Ok((u64::from(reader.next_index()), tracker))
}
