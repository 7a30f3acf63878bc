//! src/live/vfs.rs
//! Read-decrypting SQLite VFS layered over the platform default
//!
//! Every file opened through this VFS wraps a file of the parent VFS. Reads
//! on main-database files whose path is in the registry are served page by
//! page through [`reconstruct_page`]; everything else is forwarded.
//!
//! # Safety
//!
//! All functions here are called by SQLite with the pointers it was handed at
//! registration or open time. `pAppData` of the VFS always points to a leaked
//! [`VfsState`], and every `sqlite3_file` whose `pMethods` is [`IO_METHODS`]
//! is the head of a [`PageFile`] followed by the parent's file object.

use crate::aliases::PageBuffer;
use crate::consts::PAGE_SIZE;
use crate::error::DecryptError;
use crate::live::registry::KeyRegistry;
use crate::page::reconstruct_page;
use crate::utils::normalize_path;
use rusqlite::ffi;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::mem::size_of;
use std::path::Path;
use std::ptr;
use std::sync::Arc;

/// What the VFS needs at call time; leaked for the life of the process.
pub(crate) struct VfsState {
    pub(crate) parent: *mut ffi::sqlite3_vfs,
    pub(crate) registry: Arc<KeyRegistry>,
}

#[repr(C)]
struct PageFile {
    base: ffi::sqlite3_file,
    real: *mut ffi::sqlite3_file,
    state: *const VfsState,
    /// Normalized path, main-database files only.
    path: Option<String>,
}

/// Build the VFS struct for `state`, copying everything not overridden from
/// the parent.
///
/// # Safety
///
/// `state.parent` must be a registered VFS, and `state` and `name` must stay
/// valid for as long as the returned VFS is registered.
pub(crate) unsafe fn build_vfs(state: *const VfsState, name: *const c_char) -> ffi::sqlite3_vfs {
    let parent = (*state).parent;
    let mut vfs: ffi::sqlite3_vfs = *parent;
    vfs.iVersion = vfs.iVersion.min(2);
    vfs.szOsFile = size_of::<PageFile>() as c_int + (*parent).szOsFile;
    vfs.pNext = ptr::null_mut();
    vfs.zName = name;
    vfs.pAppData = state as *mut c_void;
    vfs.xOpen = Some(vfs_open);
    vfs.xDelete = Some(vfs_delete);
    vfs.xAccess = Some(vfs_access);
    vfs.xFullPathname = Some(vfs_full_pathname);
    vfs.xSetSystemCall = None;
    vfs.xGetSystemCall = None;
    vfs.xNextSystemCall = None;
    vfs
}

static IO_METHODS: ffi::sqlite3_io_methods = ffi::sqlite3_io_methods {
    iVersion: 1,
    xClose: Some(file_close),
    xRead: Some(file_read),
    xWrite: Some(file_write),
    xTruncate: Some(file_truncate),
    xSync: Some(file_sync),
    xFileSize: Some(file_size),
    xLock: Some(file_lock),
    xUnlock: Some(file_unlock),
    xCheckReservedLock: Some(file_check_reserved_lock),
    xFileControl: Some(file_control),
    xSectorSize: Some(file_sector_size),
    xDeviceCharacteristics: Some(file_device_characteristics),
    xShmMap: None,
    xShmLock: None,
    xShmBarrier: None,
    xShmUnmap: None,
    xFetch: None,
    xUnfetch: None,
};

#[inline]
unsafe fn state_of(vfs: *mut ffi::sqlite3_vfs) -> &'static VfsState {
    &*((*vfs).pAppData as *const VfsState)
}

#[inline]
unsafe fn real_of(file: *mut ffi::sqlite3_file) -> (*mut ffi::sqlite3_file, *const ffi::sqlite3_io_methods) {
    let real = (*(file as *mut PageFile)).real;
    (real, (*real).pMethods)
}

/// Map a page failure onto the result code SQLite reports to its caller.
fn sqlite_code(err: &DecryptError) -> c_int {
    match err {
        DecryptError::KeyValidationFailed => ffi::SQLITE_NOTADB,
        DecryptError::PageCorrupt(_) => ffi::SQLITE_CORRUPT,
        _ => ffi::SQLITE_IOERR_READ,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// VFS methods
// ─────────────────────────────────────────────────────────────────────────────

unsafe extern "C" fn vfs_open(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    file: *mut ffi::sqlite3_file,
    flags: c_int,
    out_flags: *mut c_int,
) -> c_int {
    let state = state_of(vfs);
    let real = (file as *mut u8).add(size_of::<PageFile>()) as *mut ffi::sqlite3_file;

    let rc = match (*state.parent).xOpen {
        Some(open) => open(state.parent, z_name, real, flags, out_flags),
        None => ffi::SQLITE_CANTOPEN,
    };
    if rc != ffi::SQLITE_OK {
        (*file).pMethods = ptr::null();
        return rc;
    }

    let path = if flags & ffi::SQLITE_OPEN_MAIN_DB != 0 && !z_name.is_null() {
        let name = CStr::from_ptr(z_name).to_string_lossy();
        let normalized = normalize_path(Path::new(name.as_ref()));
        tracing::debug!(
            path = %normalized,
            keyed = state.registry.get_normalized(&normalized).is_some(),
            "database opened through VFS"
        );
        Some(normalized)
    } else {
        None
    };

    ptr::write(
        file as *mut PageFile,
        PageFile {
            base: ffi::sqlite3_file {
                pMethods: &IO_METHODS,
            },
            real,
            state,
            path,
        },
    );
    ffi::SQLITE_OK
}

unsafe extern "C" fn vfs_delete(vfs: *mut ffi::sqlite3_vfs, z_name: *const c_char, sync_dir: c_int) -> c_int {
    let parent = state_of(vfs).parent;
    match (*parent).xDelete {
        Some(delete) => delete(parent, z_name, sync_dir),
        None => ffi::SQLITE_IOERR_DELETE,
    }
}

unsafe extern "C" fn vfs_access(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    flags: c_int,
    res_out: *mut c_int,
) -> c_int {
    let parent = state_of(vfs).parent;
    match (*parent).xAccess {
        Some(access) => access(parent, z_name, flags, res_out),
        None => ffi::SQLITE_IOERR_ACCESS,
    }
}

unsafe extern "C" fn vfs_full_pathname(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    n_out: c_int,
    z_out: *mut c_char,
) -> c_int {
    let parent = state_of(vfs).parent;
    match (*parent).xFullPathname {
        Some(full_pathname) => full_pathname(parent, z_name, n_out, z_out),
        None => ffi::SQLITE_CANTOPEN,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File methods
// ─────────────────────────────────────────────────────────────────────────────

unsafe extern "C" fn file_close(file: *mut ffi::sqlite3_file) -> c_int {
    let (real, methods) = real_of(file);
    let rc = match methods.as_ref().and_then(|m| m.xClose) {
        Some(close) => close(real),
        None => ffi::SQLITE_OK,
    };
    ptr::drop_in_place(file as *mut PageFile);
    rc
}

unsafe extern "C" fn file_read(
    file: *mut ffi::sqlite3_file,
    buf: *mut c_void,
    amount: c_int,
    offset: ffi::sqlite3_int64,
) -> c_int {
    let page_file = &*(file as *const PageFile);
    let (real, methods) = real_of(file);
    let Some(read) = methods.as_ref().and_then(|m| m.xRead) else {
        return ffi::SQLITE_IOERR_READ;
    };

    let entry = match &page_file.path {
        Some(path) => (*page_file.state).registry.get_normalized(path),
        None => None,
    };
    let Some(entry) = entry else {
        return read(real, buf, amount, offset);
    };
    if amount <= 0 || offset < 0 {
        return read(real, buf, amount, offset);
    }

    let out = std::slice::from_raw_parts_mut(buf as *mut u8, amount as usize);
    let offset = offset as u64;
    let first_page = offset / PAGE_SIZE as u64;
    let last_page = (offset + amount as u64 - 1) / PAGE_SIZE as u64;

    let mut cipher = PageBuffer::new([0u8; PAGE_SIZE]);
    let mut plain = PageBuffer::new([0u8; PAGE_SIZE]);
    let mut short_read = false;
    let mut written = 0usize;

    for page_no in first_page..=last_page {
        let Ok(index) = u32::try_from(page_no) else {
            return ffi::SQLITE_IOERR_READ;
        };
        let rc = read(
            real,
            cipher.expose_secret_mut().as_mut_ptr() as *mut c_void,
            PAGE_SIZE as c_int,
            (page_no * PAGE_SIZE as u64) as ffi::sqlite3_int64,
        );
        match rc {
            ffi::SQLITE_OK => {}
            ffi::SQLITE_IOERR_SHORT_READ => short_read = true,
            other => return other,
        }

        let validate = entry.validation().validates(index);
        if let Err(err) = reconstruct_page(
            cipher.expose_secret(),
            entry.keys(),
            index,
            validate,
            plain.expose_secret_mut(),
        ) {
            tracing::warn!(page = index, error = %err, "live page read failed");
            return sqlite_code(&err);
        }
        tracing::trace!(page = index, "live page served");

        let start = if page_no == first_page {
            (offset % PAGE_SIZE as u64) as usize
        } else {
            0
        };
        let take = (PAGE_SIZE - start).min(out.len() - written);
        out[written..written + take].copy_from_slice(&plain.expose_secret()[start..start + take]);
        written += take;
    }

    if short_read {
        ffi::SQLITE_IOERR_SHORT_READ
    } else {
        ffi::SQLITE_OK
    }
}

unsafe extern "C" fn file_write(
    file: *mut ffi::sqlite3_file,
    buf: *const c_void,
    amount: c_int,
    offset: ffi::sqlite3_int64,
) -> c_int {
    if (*(file as *const PageFile)).path.is_some() {
        return ffi::SQLITE_READONLY;
    }
    let (real, methods) = real_of(file);
    match methods.as_ref().and_then(|m| m.xWrite) {
        Some(write) => write(real, buf, amount, offset),
        None => ffi::SQLITE_IOERR_WRITE,
    }
}

unsafe extern "C" fn file_truncate(file: *mut ffi::sqlite3_file, size: ffi::sqlite3_int64) -> c_int {
    if (*(file as *const PageFile)).path.is_some() {
        return ffi::SQLITE_READONLY;
    }
    let (real, methods) = real_of(file);
    match methods.as_ref().and_then(|m| m.xTruncate) {
        Some(truncate) => truncate(real, size),
        None => ffi::SQLITE_IOERR_TRUNCATE,
    }
}

unsafe extern "C" fn file_sync(file: *mut ffi::sqlite3_file, flags: c_int) -> c_int {
    let (real, methods) = real_of(file);
    match methods.as_ref().and_then(|m| m.xSync) {
        Some(sync) => sync(real, flags),
        None => ffi::SQLITE_OK,
    }
}

unsafe extern "C" fn file_size(file: *mut ffi::sqlite3_file, size_out: *mut ffi::sqlite3_int64) -> c_int {
    let (real, methods) = real_of(file);
    match methods.as_ref().and_then(|m| m.xFileSize) {
        Some(size) => size(real, size_out),
        None => ffi::SQLITE_IOERR_FSTAT,
    }
}

unsafe extern "C" fn file_lock(file: *mut ffi::sqlite3_file, level: c_int) -> c_int {
    let (real, methods) = real_of(file);
    match methods.as_ref().and_then(|m| m.xLock) {
        Some(lock) => lock(real, level),
        None => ffi::SQLITE_OK,
    }
}

unsafe extern "C" fn file_unlock(file: *mut ffi::sqlite3_file, level: c_int) -> c_int {
    let (real, methods) = real_of(file);
    match methods.as_ref().and_then(|m| m.xUnlock) {
        Some(unlock) => unlock(real, level),
        None => ffi::SQLITE_OK,
    }
}

unsafe extern "C" fn file_check_reserved_lock(file: *mut ffi::sqlite3_file, res_out: *mut c_int) -> c_int {
    let (real, methods) = real_of(file);
    match methods.as_ref().and_then(|m| m.xCheckReservedLock) {
        Some(check) => check(real, res_out),
        None => {
            *res_out = 0;
            ffi::SQLITE_OK
        }
    }
}

unsafe extern "C" fn file_control(file: *mut ffi::sqlite3_file, op: c_int, arg: *mut c_void) -> c_int {
    let (real, methods) = real_of(file);
    match methods.as_ref().and_then(|m| m.xFileControl) {
        Some(control) => control(real, op, arg),
        None => ffi::SQLITE_NOTFOUND,
    }
}

unsafe extern "C" fn file_sector_size(file: *mut ffi::sqlite3_file) -> c_int {
    let (real, methods) = real_of(file);
    match methods.as_ref().and_then(|m| m.xSectorSize) {
        Some(sector_size) => sector_size(real),
        None => PAGE_SIZE as c_int,
    }
}

unsafe extern "C" fn file_device_characteristics(file: *mut ffi::sqlite3_file) -> c_int {
    let (real, methods) = real_of(file);
    match methods.as_ref().and_then(|m| m.xDeviceCharacteristics) {
        Some(characteristics) => characteristics(real),
        None => 0,
    }
}
