//! In-memory widget storage.

use chrono::{DateTime, Utc};
use outcache_core::{OutcacheError, OutcacheResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    pub id: u64,
    pub name: String,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Body of create and update requests.
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetInput {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl WidgetInput {
    pub fn validate(&self) -> OutcacheResult<()> {
        if self.name.trim().is_empty() {
            return Err(OutcacheError::validation("name must not be empty"));
        }
        if self.name.len() > 100 {
            return Err(OutcacheError::validation("name must be at most 100 characters"));
        }
        Ok(())
    }
}

/// Widget counts per tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetSummary {
    pub total: usize,
    pub tags: BTreeMap<String, usize>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct WidgetTable {
    next_id: u64,
    widgets: BTreeMap<u64, Widget>,
}

/// Widget store that counts reads, so callers can tell when a response
/// came from the output cache instead.
#[derive(Debug, Default)]
pub struct WidgetRepository {
    table: RwLock<WidgetTable>,
    reads: AtomicU64,
}

impl WidgetRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository holding a few sample widgets.
    #[must_use]
    pub fn seeded() -> Self {
        let repository = Self::new();
        for (name, tags) in [
            ("sprocket", vec!["metal"]),
            ("gear", vec!["metal", "round"]),
            ("flange", vec!["plastic"]),
        ] {
            repository.create(WidgetInput {
                name: name.to_string(),
                tags: tags.into_iter().map(str::to_string).collect(),
            });
        }
        repository
    }

    /// Number of reads served so far.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    /// Lists widgets, optionally only those carrying `tag`.
    pub fn list(&self, tag: Option<&str>) -> Vec<Widget> {
        self.record_read();
        self.table
            .read()
            .widgets
            .values()
            .filter(|widget| tag.map_or(true, |tag| widget.tags.iter().any(|t| t == tag)))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: u64) -> OutcacheResult<Widget> {
        self.record_read();
        self.table
            .read()
            .widgets
            .get(&id)
            .cloned()
            .ok_or_else(|| OutcacheError::not_found("Widget", id))
    }

    pub fn summary(&self) -> WidgetSummary {
        self.record_read();
        let table = self.table.read();
        let mut tags = BTreeMap::new();
        for tag in table.widgets.values().flat_map(|widget| widget.tags.iter()) {
            *tags.entry(tag.clone()).or_insert(0) += 1;
        }
        WidgetSummary {
            total: table.widgets.len(),
            tags,
            generated_at: Utc::now(),
        }
    }

    pub fn create(&self, input: WidgetInput) -> Widget {
        let mut table = self.table.write();
        table.next_id += 1;
        let widget = Widget {
            id: table.next_id,
            name: input.name,
            tags: input.tags,
            updated_at: Utc::now(),
        };
        table.widgets.insert(widget.id, widget.clone());
        widget
    }

    pub fn update(&self, id: u64, input: WidgetInput) -> OutcacheResult<Widget> {
        let mut table = self.table.write();
        let widget = table
            .widgets
            .get_mut(&id)
            .ok_or_else(|| OutcacheError::not_found("Widget", id))?;
        widget.name = input.name;
        widget.tags = input.tags;
        widget.updated_at = Utc::now();
        Ok(widget.clone())
    }

    pub fn delete(&self, id: u64) -> OutcacheResult<()> {
        self.table
            .write()
            .widgets
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| OutcacheError::not_found("Widget", id))
    }
}
