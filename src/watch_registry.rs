//! Persisted mapping from download directories to library destinations.
//!
//! The store is one JSON object keyed by normalized source path:
//!
//! ```json
//! {
//!     "/downloads/Show": {
//!         "dest": "/library/Show (2020)/Season 01",
//!         "show_name": "Show",
//!         "season": "Season 01"
//!     }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, PrettyFormatter};

use crate::error::{Error, Result};

/// Four-space pretty printer that keeps the store pure ASCII: anything outside
/// `' '..='~'` is written as `\uXXXX`, surrogate pairs above the BMP.
struct AsciiFormatter<'a> {
    pretty: PrettyFormatter<'a>,
}

impl<'a> AsciiFormatter<'a> {
    fn new(indent: &'a [u8]) -> Self {
        Self {
            pretty: PrettyFormatter::with_indent(indent),
        }
    }
}

impl Formatter for AsciiFormatter<'_> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if (' '..='~').contains(&c) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..i])?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub dest: String,
    #[serde(alias = "show_folder")]
    pub show_name: String,
    pub season: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRecord {
    pub source: String,
    pub destination: String,
    pub show_name: String,
    pub season: String,
}

impl WatchRecord {
    fn from_entry(source: &str, entry: &WatchEntry) -> Self {
        Self {
            source: source.to_string(),
            destination: entry.dest.clone(),
            show_name: entry.show_name.clone(),
            season: entry.season.clone(),
        }
    }

    fn to_entry(&self) -> WatchEntry {
        WatchEntry {
            dest: self.destination.clone(),
            show_name: self.show_name.clone(),
            season: self.season.clone(),
        }
    }
}

#[derive(Debug)]
pub struct WatchRegistry {
    path: PathBuf,
    watches: IndexMap<String, WatchEntry>,
    dirty: bool,
}

impl WatchRegistry {
    /// Load the store at `path`, creating an empty one on first use.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            tracing::info!(store = %path.display(), "creating watch database");
            let registry = Self {
                path,
                watches: IndexMap::new(),
                dirty: false,
            };
            registry.save()?;
            return Ok(registry);
        }

        let contents = fs::read_to_string(&path)?;
        let watches: IndexMap<String, WatchEntry> = serde_json::from_str(&contents)?;
        tracing::debug!(store = %path.display(), watches = watches.len(), "loaded watch database");

        Ok(Self {
            path,
            watches,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = AsciiFormatter::new(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.watches.serialize(&mut serializer)?;
        String::from_utf8(buf).map_err(|e| Error::Io(std::io::Error::other(e)))
    }

    /// Rewrite the whole store.
    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, self.to_json()?)?;
        tracing::debug!(store = %self.path.display(), watches = self.watches.len(), "saved watch database");
        Ok(())
    }

    /// Rewrite the store only if something changed since it was loaded.
    pub fn save_if_dirty(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.save()?;
        self.dirty = false;
        Ok(true)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.watches.contains_key(&normalize_source(source))
    }

    pub fn get(&self, source: &str) -> Option<WatchRecord> {
        let key = normalize_source(source);
        self.watches
            .get(&key)
            .map(|entry| WatchRecord::from_entry(&key, entry))
    }

    /// All watches in insertion order.
    pub fn records(&self) -> Vec<WatchRecord> {
        self.watches
            .iter()
            .map(|(source, entry)| WatchRecord::from_entry(source, entry))
            .collect()
    }

    pub fn insert(&mut self, mut record: WatchRecord) -> Result<()> {
        record.source = normalize_source(&record.source);
        if record.destination.trim().is_empty() {
            return Err(Error::EmptyDestination);
        }
        if self.watches.contains_key(&record.source) {
            return Err(Error::DuplicateWatch(record.source));
        }

        tracing::info!(
            source = %record.source,
            destination = %record.destination,
            show = %record.show_name,
            season = %record.season,
            "watch added"
        );
        self.watches.insert(record.source.clone(), record.to_entry());
        self.dirty = true;
        Ok(())
    }

    /// Replace an existing watch wholesale. Returns `false` when there is none.
    pub fn update(&mut self, mut record: WatchRecord) -> Result<bool> {
        record.source = normalize_source(&record.source);
        if record.destination.trim().is_empty() {
            return Err(Error::EmptyDestination);
        }

        match self.watches.get_mut(&record.source) {
            Some(entry) => {
                *entry = record.to_entry();
                self.dirty = true;
                tracing::info!(
                    source = %record.source,
                    destination = %record.destination,
                    show = %record.show_name,
                    season = %record.season,
                    "watch updated"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn remove(&mut self, source: &str) -> Option<WatchRecord> {
        let key = normalize_source(source);
        let entry = self.watches.shift_remove(&key)?;
        self.dirty = true;
        tracing::info!(source = %key, "watch removed");
        Some(WatchRecord::from_entry(&key, &entry))
    }

    /// Re-key every watch by its normalized source. On a collision the
    /// earlier watch is kept. Returns how many keys changed.
    pub fn normalize_keys(&mut self) -> usize {
        let mut changed = 0;
        let mut normalized = IndexMap::with_capacity(self.watches.len());

        for (source, entry) in self.watches.drain(..) {
            let key = normalize_source(&source);
            if key != source {
                changed += 1;
            }
            if normalized.contains_key(&key) {
                tracing::warn!(source = %source, key = %key, "dropping watch that duplicates an existing source");
                changed += 1;
                continue;
            }
            normalized.insert(key, entry);
        }

        self.watches = normalized;
        if changed > 0 {
            self.dirty = true;
        }
        changed
    }
}

/// Expand a leading `~` and drop trailing separators.
pub fn normalize_source(source: &str) -> String {
    let expanded = expand_home(source);
    let trimmed = expanded.trim_end_matches(['/', MAIN_SEPARATOR]);
    if trimmed.is_empty() && !expanded.is_empty() {
        // the filesystem root itself
        return expanded[..1].to_string();
    }
    trimmed.to_string()
}

/// Strip trailing separators from a path reported by an external tool.
pub fn strip_trailing_separator(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', MAIN_SEPARATOR]);
    if trimmed.is_empty() { path } else { trimmed }
}

pub fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', MAIN_SEPARATOR]) => rest,
        _ => return path.to_string(),
    };

    match dirs::home_dir() {
        Some(home) => format!("{}{}", home.display(), rest),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(source: &str, dest: &str) -> WatchRecord {
        WatchRecord {
            source: source.to_string(),
            destination: dest.to_string(),
            show_name: "Show".to_string(),
            season: "Season 01".to_string(),
        }
    }

    #[test]
    fn test_normalize_source() {
        assert_eq!(normalize_source("/downloads/Show/"), "/downloads/Show");
        assert_eq!(normalize_source("/downloads/Show//"), "/downloads/Show");
        assert_eq!(normalize_source("/downloads/Show"), "/downloads/Show");
        assert_eq!(normalize_source("/"), "/");
        assert_eq!(normalize_source("~user/x"), "~user/x");
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/Downloads"), format!("{}/Downloads", home.display()));
        }
        assert_eq!(expand_home("/abs/~/x"), "/abs/~/x");
    }

    #[test]
    fn test_open_creates_empty_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watch.json");

        let registry = WatchRegistry::open(&path).unwrap();
        assert!(registry.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_insert_rejects_duplicates_and_empty_destination() {
        let dir = TempDir::new().unwrap();
        let mut registry = WatchRegistry::open(dir.path().join("watch.json")).unwrap();

        registry.insert(record("/dl/Show/", "/lib/Show")).unwrap();
        assert!(matches!(
            registry.insert(record("/dl/Show", "/lib/Other")),
            Err(Error::DuplicateWatch(_))
        ));
        assert!(matches!(
            registry.insert(record("/dl/Other", " ")),
            Err(Error::EmptyDestination)
        ));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("/dl/Show/"));
    }

    #[test]
    fn test_update_and_remove_report_absence() {
        let dir = TempDir::new().unwrap();
        let mut registry = WatchRegistry::open(dir.path().join("watch.json")).unwrap();

        assert!(!registry.update(record("/dl/Show", "/lib/Show")).unwrap());
        assert!(registry.remove("/dl/Show").is_none());
        assert!(!registry.is_dirty());

        registry.insert(record("/dl/Show", "/lib/Show")).unwrap();
        assert!(registry.update(record("/dl/Show/", "/lib/Moved")).unwrap());
        assert_eq!(registry.get("/dl/Show").unwrap().destination, "/lib/Moved");
        assert!(registry.remove("/dl/Show/").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_insertion_order_survives_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watch.json");
        let mut registry = WatchRegistry::open(&path).unwrap();
        registry.insert(record("/dl/b", "/lib/b")).unwrap();
        registry.insert(record("/dl/a", "/lib/a")).unwrap();
        registry.insert(record("/dl/c", "/lib/c")).unwrap();
        assert!(registry.save_if_dirty().unwrap());

        let reloaded = WatchRegistry::open(&path).unwrap();
        let sources: Vec<_> = reloaded.records().into_iter().map(|r| r.source).collect();
        assert_eq!(sources, vec!["/dl/b", "/dl/a", "/dl/c"]);
    }

    #[test]
    fn test_legacy_show_folder_key_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watch.json");
        fs::write(
            &path,
            r#"{"/dl/Show": {"dest": "/lib/Show", "show_folder": "Show", "season": "Season 01"}}"#,
        )
        .unwrap();

        let registry = WatchRegistry::open(&path).unwrap();
        assert_eq!(registry.get("/dl/Show").unwrap(), record("/dl/Show", "/lib/Show"));
    }

    #[test]
    fn test_normalize_keys_merges_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watch.json");
        fs::write(
            &path,
            r#"{
    "/dl/Show/": {"dest": "/lib/first", "show_name": "Show", "season": "Season 01"},
    "/dl/Show": {"dest": "/lib/second", "show_name": "Show", "season": "Season 01"},
    "/dl/Other": {"dest": "/lib/other", "show_name": "Show", "season": "Season 01"}
}"#,
        )
        .unwrap();

        let mut registry = WatchRegistry::open(&path).unwrap();
        assert_eq!(registry.normalize_keys(), 2);
        assert!(registry.is_dirty());
        assert_eq!(
            registry.records(),
            vec![record("/dl/Show", "/lib/first"), record("/dl/Other", "/lib/other")]
        );
    }
}
