use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::errors::LedgerError;

/// Fingerprints of already-alerted trades with the epoch second they were
/// first marked, persisted as a JSON object.
///
/// A fingerprint present here is never dispatched again. Entries older than
/// the retention window are dropped on load; the feed only returns recent
/// trades, so they can no longer reappear.
#[derive(Debug)]
pub struct DedupLedger {
    path: PathBuf,
    entries: HashMap<String, i64>,
}

impl DedupLedger {
    /// Load and prune. Missing or unreadable state yields an empty ledger:
    /// losing dedup history is preferred over refusing to scan.
    pub fn load(path: impl Into<PathBuf>, retention_days: i64, now: DateTime<Utc>) -> Self {
        let path = path.into();
        match Self::try_load(&path, retention_days, now) {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Dedup ledger unreadable, starting empty"
                );
                Self {
                    path,
                    entries: HashMap::new(),
                }
            }
        }
    }

    pub fn try_load(
        path: &Path,
        retention_days: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let mut entries: HashMap<String, i64> = match fs::read_to_string(path) {
            Ok(raw) if raw.trim().is_empty() => HashMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        let cutoff = (now - Duration::days(retention_days)).timestamp();
        let before = entries.len();
        entries.retain(|_, first_seen| *first_seen >= cutoff);

        tracing::debug!(
            path = %path.display(),
            kept = entries.len(),
            pruned = before - entries.len(),
            "Dedup ledger loaded"
        );

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn is_seen(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    /// Record a fingerprint. An existing entry keeps its first-seen time.
    pub fn mark(&mut self, fingerprint: &str, now: DateTime<Utc>) {
        self.entries
            .entry(fingerprint.to_string())
            .or_insert_with(|| now.timestamp());
    }

    /// Claim a fingerprint: returns `true` only for the first caller.
    pub fn check_and_mark(&mut self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        if self.is_seen(fingerprint) {
            return false;
        }
        self.mark(fingerprint, now);
        true
    }

    /// Write to a sibling temp file and rename over the ledger, so a crash
    /// mid-write leaves the previous state intact.
    pub fn save(&self) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(&self.entries)?;
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
