//! # Container Header
//!
//! Quick checks on the first bytes of a container: pulling the salt out of
//! page 0, and telling an encrypted container apart from a database that is
//! already plaintext.

use crate::aliases::Salt16;
use crate::consts::{PAGE_SIZE, SALT_SIZE, SQLITE_HEADER};
use crate::error::DecryptError;
use std::io::{ErrorKind, Read};

/// Read the 16-byte salt from the start of page 0.
///
/// # Errors
///
/// - [`DecryptError::InvalidContainer`] if fewer than 16 bytes are available,
///   or if the bytes are the plaintext magic header (nothing to decrypt)
/// - [`DecryptError::Io`] for any other read failure
pub fn read_salt<R: Read>(mut reader: R) -> Result<Salt16, DecryptError> {
    let mut salt = Salt16::new([0u8; SALT_SIZE]);
    reader
        .read_exact(salt.expose_secret_mut())
        .map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => DecryptError::InvalidContainer(format!(
                "file is shorter than the {SALT_SIZE}-byte salt"
            )),
            _ => DecryptError::Io(e),
        })?;

    if salt.expose_secret() == SQLITE_HEADER {
        return Err(DecryptError::InvalidContainer(
            "file is already a plaintext database".into(),
        ));
    }
    Ok(salt)
}

/// Number of pages in a container of `file_size` bytes; a short trailing
/// page counts as a full one.
#[inline]
pub const fn page_count(file_size: u64) -> u64 {
    file_size.div_ceil(PAGE_SIZE as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn salt_is_first_sixteen_bytes() {
        let mut data = vec![0u8; 64];
        data[..16].copy_from_slice(&[0xa5; 16]);
        let salt = read_salt(Cursor::new(&data)).unwrap();
        assert_eq!(salt.expose_secret(), &[0xa5; 16]);
    }

    #[test]
    fn short_file_has_no_salt() {
        let err = read_salt(Cursor::new(&[1u8; 15])).unwrap_err();
        assert!(matches!(err, DecryptError::InvalidContainer(_)));
    }

    #[test]
    fn plaintext_database_is_rejected() {
        let err = read_salt(Cursor::new(b"SQLite format 3\0rest")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid container: file is already a plaintext database"
        );
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(4096), 1);
        assert_eq!(page_count(4097), 2);
        assert_eq!(page_count(3 * 4096), 3);
    }
}
