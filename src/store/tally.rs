//! Aggregate per-label counters (country tallies) with a line snapshot.

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::warn;

use super::snapshot;

/// Monotonic per-label counters persisted as `label,count` lines.
pub struct TallyStore {
    path: PathBuf,
    counts: Mutex<HashMap<String, u64>>,
}

impl TallyStore {
    /// Load the tally from its snapshot. A missing file starts empty; lines
    /// that do not parse are skipped with a warning.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        snapshot::ensure_parent(&path).await?;
        let mut counts = HashMap::new();

        if let Some(contents) = snapshot::read_to_string_opt(&path).await? {
            for line in contents.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_line(line) {
                    Some((label, count)) => {
                        counts.insert(label.to_string(), count);
                    }
                    None => {
                        warn!(path = %path.display(), line, "skipping unparsable tally line");
                    }
                }
            }
        }

        Ok(Self {
            path,
            counts: Mutex::new(counts),
        })
    }

    /// Bump `label` by one, persist the whole table, and return the new
    /// count. Snapshot failures are logged and swallowed; the in-memory
    /// count is authoritative.
    pub async fn increment(&self, label: &str) -> u64 {
        let mut counts = self.counts.lock().await;
        let entry = counts.entry(label.to_string()).or_insert(0);
        *entry += 1;
        let new_count = *entry;

        if let Err(err) = snapshot::write_atomic(&self.path, &render(&counts)).await {
            warn!(path = %self.path.display(), error = %err, "failed to persist tally snapshot");
        }

        new_count
    }

    /// Top `n` labels by count, descending. Ties break by label so the
    /// ordering is deterministic.
    pub async fn top_n(&self, n: usize) -> Vec<(String, u64)> {
        let counts = self.counts.lock().await;
        let mut entries: Vec<(String, u64)> = counts
            .iter()
            .map(|(label, count)| (label.clone(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }

    /// Number of distinct labels.
    pub async fn len(&self) -> usize {
        self.counts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.counts.lock().await.is_empty()
    }

    /// Sum of all counts.
    pub async fn total(&self) -> u64 {
        self.counts.lock().await.values().sum()
    }
}

/// Split on the last comma so labels containing commas survive a reload.
fn parse_line(line: &str) -> Option<(&str, u64)> {
    let (label, count) = line.rsplit_once(',')?;
    let count = count.trim().parse::<u64>().ok()?;
    Some((label, count))
}

fn render(counts: &HashMap<String, u64>) -> String {
    let mut lines: Vec<String> = counts
        .iter()
        .map(|(label, count)| format!("{label},{count}"))
        .collect();
    lines.sort();

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
