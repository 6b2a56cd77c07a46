//! Line-oriented file storage: one JSON entry per line.
//!
//! This is the interchange format. Layout under the root directory:
//!
//! ```text
//! <root>/chain.jsonl                    identity chain
//! <root>/contexts/<name>/chain.jsonl    one chain per context
//! <root>/identity.json                  FileIdentityStore (by convention)
//! ```
//!
//! Appends hold an in-process mutex and an exclusive advisory lock on
//! `<chain>.lock` across the read-head / build / write sequence. Each entry
//! is one `write_all` of the full line followed by `sync_data`, so readers
//! never see half an entry. A file left without a final newline (a torn
//! write, a hand edit) gets one before the next entry so the two never
//! share a line.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tracing::{debug, warn};

use charter_core::{ChainEntry, ChainId, IdentityRecord};

use crate::error::{Result, StoreError};
use crate::traits::{check_link, ChainStore, IdentityStore};

const CHAIN_FILE: &str = "chain.jsonl";
const CONTEXTS_DIR: &str = "contexts";

/// Chain store backed by JSONL files.
pub struct JsonlChainStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlChainStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file holding a chain.
    pub fn chain_path(&self, chain: &ChainId) -> PathBuf {
        match chain.context_name() {
            Some(name) => self.root.join(CONTEXTS_DIR).join(name).join(CHAIN_FILE),
            None => self.root.join(CHAIN_FILE),
        }
    }

    fn lock_path(chain_path: &Path) -> PathBuf {
        let mut name = chain_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn lock_chain_file(chain_path: &Path) -> Result<File> {
        let lock_path = Self::lock_path(chain_path);
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        FileExt::lock_exclusive(&lock_file).map_err(|e| {
            StoreError::Lock(format!("failed to lock {}: {}", lock_path.display(), e))
        })?;
        Ok(lock_file)
    }
}

/// Parse every well-formed entry in a chain file.
///
/// Blank lines are ignored; unparseable lines are skipped with a warning.
/// A missing file reads as an empty chain.
fn read_entries(path: &Path) -> Result<Vec<ChainEntry>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    for (line_no, line) in raw.split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<ChainEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(
                path = %path.display(),
                line = line_no + 1,
                error = %e,
                "skipping unparseable chain line"
            ),
        }
    }
    Ok(entries)
}

/// Whether a non-empty file's last byte is something other than `'\n'`.
fn lacks_final_newline(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

impl ChainStore for JsonlChainStore {
    fn append_with<F>(&self, chain: &ChainId, build: F) -> Result<ChainEntry>
    where
        F: FnOnce(Option<&ChainEntry>) -> ChainEntry,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Lock("chain write lock poisoned".into()))?;

        let path = self.chain_path(chain);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_file = Self::lock_chain_file(&path)?;

        let head = read_entries(&path)?.pop();
        let entry = build(head.as_ref());
        check_link(chain, head.as_ref(), &entry)?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let mut line = String::new();
        if lacks_final_newline(&mut file)? {
            warn!(path = %path.display(), "chain file did not end in a newline; terminating last line");
            line.push('\n');
        }
        line.push_str(&serde_json::to_string(&entry)?);
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        drop(lock_file);

        debug!(chain = %chain, index = entry.index, event = %entry.event, "appended entry");
        Ok(entry)
    }

    fn head(&self, chain: &ChainId) -> Result<Option<ChainEntry>> {
        Ok(read_entries(&self.chain_path(chain))?.pop())
    }

    fn read_all(&self, chain: &ChainId) -> Result<Vec<ChainEntry>> {
        read_entries(&self.chain_path(chain))
    }

    fn list_chains(&self) -> Result<Vec<ChainId>> {
        let mut chains = Vec::new();
        if self.chain_path(&ChainId::identity()).is_file() {
            chains.push(ChainId::identity());
        }

        let contexts = self.root.join(CONTEXTS_DIR);
        let dir = match fs::read_dir(&contexts) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(chains),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for item in dir {
            let item = item?;
            if !item.path().join(CHAIN_FILE).is_file() {
                continue;
            }
            if let Some(name) = item.file_name().to_str() {
                if let Ok(id) = ChainId::context(name) {
                    names.push(id);
                }
            }
        }
        names.sort();
        chains.extend(names);
        Ok(chains)
    }
}

/// Identity store backed by a single JSON file.
///
/// Writes go to a temporary sibling and are renamed into place, so a crash
/// never leaves a half-written identity. On unix the file is created `0600`.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    /// Store the identity at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The identity file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<IdentityRecord>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn save(&self, record: &IdentityRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(record)?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_data()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
