//! Persistent sequence counter behind the identifier endpoint.

use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::warn;

use super::snapshot;

/// Monotonic `u128` sequence with a flat-file snapshot.
///
/// The snapshot holds the next unissued value as decimal text. Issuing and
/// persisting share one lock acquisition, so concurrent callers always see
/// distinct values and the snapshot never lags behind an issued one.
pub struct CounterStore {
    path: PathBuf,
    value: Mutex<u128>,
}

impl CounterStore {
    /// Load the counter from its snapshot, creating the snapshot's parent
    /// directory. A missing file starts the sequence at zero; unreadable
    /// contents do the same with a warning.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        snapshot::ensure_parent(&path).await?;
        let value = match snapshot::read_to_string_opt(&path).await? {
            Some(contents) => match contents.trim().parse::<u128>() {
                Ok(value) => value,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "counter snapshot unreadable, restarting sequence at 0"
                    );
                    0
                }
            },
            None => 0,
        };

        Ok(Self {
            path,
            value: Mutex::new(value),
        })
    }

    /// Issue the next value in the sequence.
    ///
    /// A failed snapshot write is logged and swallowed; the caller still
    /// gets its value, with the documented risk of reissue after a crash.
    pub async fn issue(&self) -> u128 {
        let mut value = self.value.lock().await;
        let issued = *value;
        *value = issued.wrapping_add(1);
        let next = *value;

        if let Err(err) = snapshot::write_atomic(&self.path, &next.to_string()).await {
            warn!(path = %self.path.display(), error = %err, "failed to persist counter snapshot");
        }

        issued
    }

    /// Current snapshot value, i.e. the next value `issue` will return.
    pub async fn current(&self) -> u128 {
        *self.value.lock().await
    }
}

/// Format a sequence value as 32 zero-padded lowercase hex digits in the
/// canonical 8-4-4-4-12 grouping.
pub fn format_sequential_uuid(value: u128) -> String {
    let hex = format!("{value:032x}");
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
