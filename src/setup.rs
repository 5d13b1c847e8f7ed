//! Setup flow and configuration entry persistence
//!
//! The integration is set up once per installation. [`SetupFlow`] shows a
//! single confirmation step without fields; confirming it writes one
//! [`ConfigEntry`] to the [`ConfigEntryStore`]. Any further attempt aborts with
//! [`AbortReason::AlreadyConfigured`] and leaves the store untouched.

use crate::error::{PriceError, Result};
use crate::logging::{StructuredLogger, get_logger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const DOMAIN: &str = "tibber_future_prices";
pub const ENTRY_TITLE: &str = "Tibber Future Prices";
pub const FLOW_VERSION: u32 = 1;

/// Persisted record that the integration has been set up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub domain: String,
    pub title: String,
    pub unique_id: Option<String>,
    pub version: u32,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub options: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl ConfigEntry {
    fn new(domain: &str, title: &str, unique_id: Option<String>) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().simple().to_string(),
            domain: domain.to_string(),
            title: title.to_string(),
            unique_id,
            version: FLOW_VERSION,
            data: Map::new(),
            options: Map::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredEntries {
    #[serde(default)]
    entries: Vec<ConfigEntry>,
}

/// JSON file backed store of configuration entries
pub struct ConfigEntryStore {
    file_path: PathBuf,
    entries: Vec<ConfigEntry>,
    logger: StructuredLogger,
}

impl ConfigEntryStore {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            entries: Vec::new(),
            logger: get_logger("setup"),
        }
    }

    /// Load entries from disk; a missing file means no entries
    pub fn load(&mut self) -> Result<()> {
        if !self.file_path.exists() {
            self.logger
                .info("No configuration entry file found, starting unconfigured");
            self.entries.clear();
            return Ok(());
        }

        let contents = std::fs::read_to_string(&self.file_path)?;
        let stored: StoredEntries = serde_json::from_str(&contents)?;
        self.entries = stored.entries;
        self.logger.info(&format!(
            "Loaded {} configuration entr{}",
            self.entries.len(),
            if self.entries.len() == 1 { "y" } else { "ies" }
        ));
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredEntries {
            entries: self.entries.clone(),
        };
        std::fs::write(&self.file_path, serde_json::to_string_pretty(&stored)?)?;
        self.logger.debug("Saved configuration entries to disk");
        Ok(())
    }

    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    pub fn entries_for_domain(&self, domain: &str) -> Vec<&ConfigEntry> {
        self.entries.iter().filter(|e| e.domain == domain).collect()
    }

    pub fn find_by_unique_id(&self, domain: &str, unique_id: &str) -> Option<&ConfigEntry> {
        self.entries
            .iter()
            .find(|e| e.domain == domain && e.unique_id.as_deref() == Some(unique_id))
    }

    pub fn get(&self, entry_id: &str) -> Option<&ConfigEntry> {
        self.entries.iter().find(|e| e.entry_id == entry_id)
    }

    /// Add and persist an entry; a taken unique id fails with `AlreadyConfigured`
    pub fn add(&mut self, entry: ConfigEntry) -> Result<()> {
        if let Some(unique_id) = entry.unique_id.as_deref()
            && self.find_by_unique_id(&entry.domain, unique_id).is_some()
        {
            return Err(PriceError::already_configured(unique_id));
        }
        self.logger.info(&format!(
            "Created configuration entry '{}' ({})",
            entry.title, entry.entry_id
        ));
        self.entries.push(entry);
        self.save()
    }

    /// Remove and persist; returns the removed entry if it existed
    pub fn remove(&mut self, entry_id: &str) -> Result<Option<ConfigEntry>> {
        let Some(index) = self.entries.iter().position(|e| e.entry_id == entry_id) else {
            return Ok(None);
        };
        let removed = self.entries.remove(index);
        self.save()?;
        self.logger
            .info(&format!("Removed configuration entry {entry_id}"));
        Ok(Some(removed))
    }

    pub fn update_options(&mut self, entry_id: &str, options: Map<String, Value>) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.entry_id == entry_id)
            .ok_or_else(|| PriceError::validation("entry_id", format!("unknown entry {entry_id}")))?;
        entry.options = options;
        self.save()
    }
}

/// Submission of the confirmation form; it carries no fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    AlreadyConfigured,
}

impl AbortReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyConfigured => "already_configured",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowResult {
    ShowForm { step_id: &'static str },
    CreateEntry(ConfigEntry),
    UpdateOptions(Map<String, Value>),
    Abort(AbortReason),
}

/// One-screen wizard creating the single configuration entry
pub struct SetupFlow<'a> {
    store: &'a mut ConfigEntryStore,
    unique_id: Option<String>,
}

impl<'a> SetupFlow<'a> {
    pub const fn new(store: &'a mut ConfigEntryStore) -> Self {
        Self {
            store,
            unique_id: None,
        }
    }

    /// Handle the initial (and only) step
    pub fn step_user(&mut self, user_input: Option<UserInput>) -> Result<FlowResult> {
        self.unique_id = Some(DOMAIN.to_string());
        if self.store.find_by_unique_id(DOMAIN, DOMAIN).is_some() {
            return Ok(FlowResult::Abort(AbortReason::AlreadyConfigured));
        }

        if user_input.is_none() {
            return Ok(FlowResult::ShowForm { step_id: "user" });
        }

        let entry = ConfigEntry::new(DOMAIN, ENTRY_TITLE, self.unique_id.clone());
        match self.store.add(entry.clone()) {
            Ok(()) => Ok(FlowResult::CreateEntry(entry)),
            Err(PriceError::AlreadyConfigured { .. }) => {
                Ok(FlowResult::Abort(AbortReason::AlreadyConfigured))
            }
            Err(e) => Err(e),
        }
    }

    /// Options flow for an existing entry
    pub fn options_flow(entry: &ConfigEntry) -> OptionsFlow {
        OptionsFlow {
            entry_id: entry.entry_id.clone(),
        }
    }
}

/// Secondary flow; there is nothing to configure, so it finishes immediately
#[derive(Debug, Clone)]
pub struct OptionsFlow {
    entry_id: String,
}

impl OptionsFlow {
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn step_init(&self, _user_input: Option<UserInput>) -> FlowResult {
        FlowResult::UpdateOptions(Map::new())
    }
}

/// Return the existing entry, or run and confirm the setup flow to create it
pub fn ensure_entry(store: &mut ConfigEntryStore) -> Result<ConfigEntry> {
    if let Some(existing) = store.find_by_unique_id(DOMAIN, DOMAIN) {
        return Ok(existing.clone());
    }

    let mut flow = SetupFlow::new(store);
    match flow.step_user(None)? {
        FlowResult::ShowForm { .. } => {}
        other => {
            return Err(PriceError::config(format!(
                "unexpected setup flow result: {other:?}"
            )));
        }
    }
    match flow.step_user(Some(UserInput))? {
        FlowResult::CreateEntry(entry) => Ok(entry),
        FlowResult::Abort(_) => Err(PriceError::already_configured(DOMAIN)),
        other => Err(PriceError::config(format!(
            "unexpected setup flow result: {other:?}"
        ))),
    }
}
