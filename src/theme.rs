//! Light/dark theme preference
//!
//! The preference is a single stored key holding `light`, `dark` or
//! `system`. It is read once at start-up and written on every change.

use redb::{Database, ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::TABLE_PREFERENCES;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        }
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "system" => Ok(ThemeMode::System),
            other => Err(format!("unknown theme mode: {other}")),
        }
    }
}

/// Concrete appearance after resolving [`ThemeMode::System`]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    #[default]
    Light,
    Dark,
}

/// Client hint carrying the host's `prefers-color-scheme`
pub const PREFERS_COLOR_SCHEME_HEADER: &str = "sec-ch-prefers-color-scheme";

impl Appearance {
    /// Parses a `Sec-CH-Prefers-Color-Scheme` value such as `"dark"`.
    pub fn from_client_hint(value: &str) -> Option<Self> {
        match value.trim().trim_matches('"') {
            "light" => Some(Appearance::Light),
            "dark" => Some(Appearance::Dark),
            _ => None,
        }
    }
}

/// Snapshot of the preference, as served to clients
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeSnapshot {
    pub theme: ThemeMode,
    pub resolved_theme: Appearance,
    pub system_theme: Appearance,
}

#[derive(Debug, Clone, Copy)]
struct ThemeState {
    mode: ThemeMode,
    system: Appearance,
}

/// Persisted theme preference
pub struct ThemeService {
    db: Arc<Database>,
    storage_key: String,
    state: RwLock<ThemeState>,
}

impl ThemeService {
    /// Reads the stored preference under `storage_key`.
    ///
    /// Missing or unreadable values fall back to [`ThemeMode::System`].
    pub fn load(db: Arc<Database>, storage_key: &str) -> Result<Self, redb::Error> {
        let stored = {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(TABLE_PREFERENCES)?;
            let value = table.get(storage_key)?.map(|guard| guard.value().to_string());
            value
        };

        let mode = match stored.as_deref().map(ThemeMode::from_str) {
            Some(Ok(mode)) => mode,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "Ignoring stored theme preference");
                ThemeMode::default()
            }
            None => ThemeMode::default(),
        };

        Ok(Self {
            db,
            storage_key: storage_key.to_string(),
            state: RwLock::new(ThemeState {
                mode,
                system: Appearance::default(),
            }),
        })
    }

    pub async fn snapshot(&self) -> ThemeSnapshot {
        let state = *self.state.read().await;
        ThemeSnapshot {
            theme: state.mode,
            resolved_theme: resolve(state.mode, state.system),
            system_theme: state.system,
        }
    }

    /// Changes the preference and writes it through to storage.
    pub async fn set_theme(&self, mode: ThemeMode) -> Result<ThemeSnapshot, redb::Error> {
        let mut state = self.state.write().await;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_PREFERENCES)?;
            table.insert(self.storage_key.as_str(), mode.as_str())?;
        }
        write_txn.commit()?;

        state.mode = mode;
        tracing::debug!(theme = mode.as_str(), "Theme preference saved");

        Ok(ThemeSnapshot {
            theme: state.mode,
            resolved_theme: resolve(state.mode, state.system),
            system_theme: state.system,
        })
    }

    /// Records the appearance the host environment currently prefers.
    pub async fn set_system_theme(&self, system: Appearance) {
        self.state.write().await.system = system;
    }
}

/// Resolves a mode against the system appearance.
pub fn resolve(mode: ThemeMode, system: Appearance) -> Appearance {
    match mode {
        ThemeMode::Light => Appearance::Light,
        ThemeMode::Dark => Appearance::Dark,
        ThemeMode::System => system,
    }
}
