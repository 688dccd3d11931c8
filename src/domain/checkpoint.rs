use chrono::{DateTime, Utc};

/// `(user_id, service, entity_type) -> (last_timestamp?, cursor?)`,
/// used to resume incremental sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityType {
    Likes,
    Plays,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Likes => "likes",
            Self::Plays => "plays",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncCheckpoint {
    pub id: Option<i64>,
    pub user_id: String,
    pub service: String,
    pub entity_type: EntityType,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub cursor: Option<String>,
}

impl SyncCheckpoint {
    pub fn new(user_id: impl Into<String>, service: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            service: service.into(),
            entity_type,
            last_timestamp: None,
            cursor: None,
        }
    }

    pub fn with_last_timestamp(&self, ts: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.last_timestamp = Some(ts);
        next
    }

    pub fn with_cursor(&self, cursor: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.cursor = Some(cursor.into());
        next
    }
}

/// Aggregate report returned by every sync service, even on partial
/// success (spec §7's user-visible behavior contract).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub imported: u64,
    pub exported: u64,
    pub skipped: u64,
    pub errors: u64,
    pub total: u64,
}

impl SyncStats {
    pub fn merge(&mut self, other: &SyncStats) {
        self.imported += other.imported;
        self.exported += other.exported;
        self.skipped += other.skipped;
        self.errors += other.errors;
        self.total += other.total;
    }
}
