//! src/live/server.rs
//! Registry + VFS registration + guarded connections

use crate::aliases::{Aes256Key32, MacKey32};
use crate::builders::ValidationPolicy;
use crate::consts::{DEFAULT_VFS_NAME, KEY_SIZE};
use crate::error::DecryptError;
use crate::kdf::{KdfParams, KeyContext};
use crate::live::registry::{KeyRegistry, RegisteredKeys};
use crate::live::vfs::{build_vfs, VfsState};
use crate::utils::decode_raw_key;
use crate::validate::{load_key_context, verify_key_context};
use parking_lot::Mutex;
use rusqlite::{ffi, Connection, OpenFlags};
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// Live-mode settings.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Name the VFS is registered under.
    pub vfs_name: String,
    /// Also make it SQLite's default VFS, so plain `Connection::open` goes
    /// through it.
    pub make_default: bool,
    /// Policy for entries registered without an explicit one.
    pub validation: ValidationPolicy,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            vfs_name: DEFAULT_VFS_NAME.to_string(),
            make_default: false,
            validation: ValidationPolicy::FirstPage,
        }
    }
}

impl LiveConfig {
    pub fn named(vfs_name: impl Into<String>) -> Self {
        Self {
            vfs_name: vfs_name.into(),
            ..Self::default()
        }
    }
}

struct VfsHandle(NonNull<ffi::sqlite3_vfs>);

// SAFETY: the VFS struct is leaked and immutable after registration; SQLite
// itself synchronizes access to its VFS list.
unsafe impl Send for VfsHandle {}
unsafe impl Sync for VfsHandle {}

/// Serves decrypted pages of registered containers to SQLite.
///
/// Creating a server registers a VFS under [`LiveConfig::vfs_name`];
/// dropping it unregisters the VFS again. Connections opened through that VFS
/// see plaintext pages for every registered path and the raw file for every
/// other path.
///
/// ```no_run
/// use wxdb_rs::live::{LiveConfig, LivePageServer};
///
/// let server = LivePageServer::new(LiveConfig::named("wxdb-doc"))?;
/// let hex_key = "00".repeat(32);
/// assert!(server.register("MSG0.db".as_ref(), &hex_key));
/// let conn = server.open("MSG0.db")?;
/// let n: i64 = conn.query_row("SELECT count(*) FROM sqlite_master", [], |r| r.get(0))?;
/// println!("{n} schema objects");
/// # Ok::<(), wxdb_rs::DecryptError>(())
/// ```
pub struct LivePageServer {
    config: LiveConfig,
    registry: Arc<KeyRegistry>,
    vfs: VfsHandle,
}

impl LivePageServer {
    /// Register the interception VFS with SQLite.
    ///
    /// # Errors
    ///
    /// [`DecryptError::Vfs`] if the name is invalid or already taken, or if
    /// SQLite has no default VFS to layer over.
    pub fn new(config: LiveConfig) -> Result<Self, DecryptError> {
        let name = CString::new(config.vfs_name.as_str())
            .map_err(|_| DecryptError::Vfs("VFS name contains a NUL byte".into()))?;

        // SAFETY: plain lookups in SQLite's VFS list.
        let parent = unsafe { ffi::sqlite3_vfs_find(ptr::null()) };
        if parent.is_null() {
            return Err(DecryptError::Vfs("SQLite has no default VFS".into()));
        }
        if !unsafe { ffi::sqlite3_vfs_find(name.as_ptr()) }.is_null() {
            return Err(DecryptError::Vfs(format!(
                "a VFS named {:?} is already registered",
                config.vfs_name
            )));
        }

        let registry = Arc::new(KeyRegistry::new());
        // SQLite may keep using the VFS after it is unregistered, so its name,
        // state and struct are never freed.
        let state: &'static VfsState = Box::leak(Box::new(VfsState {
            parent,
            registry: Arc::clone(&registry),
        }));
        let name = name.into_raw();
        // SAFETY: `parent` is registered; `state` and `name` are leaked.
        let vfs = NonNull::from(Box::leak(Box::new(unsafe { build_vfs(state, name) })));

        let rc = unsafe { ffi::sqlite3_vfs_register(vfs.as_ptr(), i32::from(config.make_default)) };
        if rc != ffi::SQLITE_OK {
            return Err(DecryptError::Vfs(format!(
                "sqlite3_vfs_register failed with code {rc}"
            )));
        }

        info!(vfs = %config.vfs_name, default = config.make_default, "interception VFS registered");
        Ok(Self {
            config,
            registry,
            vfs: VfsHandle(vfs),
        })
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    pub fn vfs_name(&self) -> &str {
        &self.config.vfs_name
    }

    /// Derive keys for `path` from a 64-hex-char raw key and register them.
    ///
    /// `false` on any failure: malformed key, unreadable file, or a key that
    /// does not authenticate page 0. Re-registering replaces the old entry.
    pub fn register(&self, path: &Path, hex_key: &str) -> bool {
        match self.register_with(path, hex_key, &KdfParams::default()) {
            Ok(()) => true,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "registration failed");
                false
            }
        }
    }

    /// [`register`](Self::register) with explicit KDF parameters and the
    /// failure reason.
    pub fn register_with(&self, path: &Path, hex_key: &str, params: &KdfParams) -> Result<(), DecryptError> {
        let raw_key = decode_raw_key(hex_key)?;
        let keys = load_key_context(path, &raw_key, params)?;
        self.registry
            .insert(path, RegisteredKeys::new(keys, self.config.validation));
        info!(path = %path.display(), "container registered");
        Ok(())
    }

    /// Register keys that were already derived elsewhere (64 hex chars each).
    ///
    /// The pair is still checked against page 0 before it is stored.
    pub fn register_derived(&self, path: &Path, enc_key_hex: &str, mac_key_hex: &str) -> bool {
        let result = decode_derived(enc_key_hex, mac_key_hex).and_then(|keys| {
            verify_key_context(path, &keys)?;
            Ok(keys)
        });
        match result {
            Ok(keys) => {
                self.registry
                    .insert(path, RegisteredKeys::new(keys, self.config.validation));
                info!(path = %path.display(), "container registered with derived keys");
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "registration failed");
                false
            }
        }
    }

    /// Forget the keys for `path`. Idempotent.
    pub fn unregister(&self, path: &Path) {
        if self.registry.remove(path) {
            info!(path = %path.display(), "container unregistered");
        }
    }

    pub fn lookup(&self, path: &Path) -> Option<Arc<RegisteredKeys>> {
        self.registry.get(path)
    }

    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Open `path` read-only through the interception VFS.
    ///
    /// `path` is unregistered once the last guard opened on it is dropped.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<LiveConnection, DecryptError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags_and_vfs(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            &self.config.vfs_name,
        )?;
        let key = self.registry.acquire(path);
        Ok(LiveConnection {
            conn: ManuallyDrop::new(conn),
            registry: Arc::clone(&self.registry),
            path: path.to_path_buf(),
            key,
        })
    }
}

impl Drop for LivePageServer {
    fn drop(&mut self) {
        // SAFETY: the pointer came from our own successful registration.
        let rc = unsafe { ffi::sqlite3_vfs_unregister(self.vfs.0.as_ptr()) };
        if rc == ffi::SQLITE_OK {
            info!(vfs = %self.config.vfs_name, "interception VFS unregistered");
        } else {
            warn!(vfs = %self.config.vfs_name, code = rc, "VFS unregister failed");
        }
    }
}

fn decode_derived(enc_key_hex: &str, mac_key_hex: &str) -> Result<KeyContext, DecryptError> {
    let enc = decode_raw_key(enc_key_hex)?;
    let mac = decode_raw_key(mac_key_hex)?;
    let mut enc_key = Aes256Key32::new([0u8; KEY_SIZE]);
    let mut mac_key = MacKey32::new([0u8; KEY_SIZE]);
    enc_key.expose_secret_mut().copy_from_slice(enc.expose_secret());
    mac_key.expose_secret_mut().copy_from_slice(mac.expose_secret());
    Ok(KeyContext::from_parts(enc_key, mac_key))
}

/// Process-wide server under [`DEFAULT_VFS_NAME`], created on first use.
pub fn global() -> Result<&'static LivePageServer, DecryptError> {
    static GLOBAL: OnceLock<LivePageServer> = OnceLock::new();
    static INIT: Mutex<()> = Mutex::new(());

    if let Some(server) = GLOBAL.get() {
        return Ok(server);
    }
    let _guard = INIT.lock();
    if let Some(server) = GLOBAL.get() {
        return Ok(server);
    }
    let server = LivePageServer::new(LiveConfig::default())?;
    Ok(GLOBAL.get_or_init(|| server))
}

/// A read-only connection to a registered container.
///
/// Derefs to [`rusqlite::Connection`]. Dropping the last connection on a
/// path closes it and then unregisters the path.
pub struct LiveConnection {
    conn: ManuallyDrop<Connection>,
    registry: Arc<KeyRegistry>,
    path: PathBuf,
    key: String,
}

impl LiveConnection {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all tables in the schema, sorted.
    pub fn table_names(&self) -> Result<Vec<String>, DecryptError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

impl Deref for LiveConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        // SAFETY: `conn` is taken exactly once, here, and never touched again.
        let conn = unsafe { ManuallyDrop::take(&mut self.conn) };
        if let Err((_, err)) = conn.close() {
            warn!(path = %self.path.display(), error = %err, "closing live connection failed");
        }
        if self.registry.release(&self.key) {
            tracing::debug!(path = %self.path.display(), "last connection closed, container unregistered");
        }
    }
}
