use std::{collections::HashSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ItemId);

/// One-based page index. Zero is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageNumber(u32);

impl PageNumber {
    pub const FIRST: Self = Self(1);

    pub fn new(value: u32) -> Option<Self> {
        (value >= 1).then_some(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// `None` at the first page; there is nothing below it.
    pub fn prev(self) -> Option<Self> {
        (self.0 > 1).then(|| Self(self.0 - 1))
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for PageNumber {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("page number must be >= 1, got {value}"))
    }
}

impl From<PageNumber> for u32 {
    fn from(value: PageNumber) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role(pub String);

impl Role {
    pub fn admin() -> Self {
        Self("admin".to_string())
    }
}

/// A listed record. Everything beyond `id`, `title` and `description` rides
/// along in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(id: i64, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: ItemId(id),
            title: title.into(),
            description: description.into(),
            extra: Map::new(),
        }
    }
}

/// Returns the first id that occurs more than once in `items`.
pub fn first_duplicate_id(items: &[Item]) -> Option<ItemId> {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().map(|item| item.id).find(|id| !seen.insert(*id))
}

/// Fetched order plus working order for one page.
///
/// `fetched_order` only ever comes from a successful fetch. Reordering goes
/// through [`PageSnapshot::with_working_order`], which leaves it alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    fetched_order: Vec<Item>,
    working_order: Vec<Item>,
    fetched_at: DateTime<Utc>,
}

impl PageSnapshot {
    pub fn from_fetch(items: Vec<Item>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            working_order: items.clone(),
            fetched_order: items,
            fetched_at,
        }
    }

    /// Rebuilds a snapshot read back from durable storage.
    pub fn from_parts(
        fetched_order: Vec<Item>,
        working_order: Vec<Item>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            fetched_order,
            working_order,
            fetched_at,
        }
    }

    pub fn fetched_order(&self) -> &[Item] {
        &self.fetched_order
    }

    pub fn working_order(&self) -> &[Item] {
        &self.working_order
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn with_working_order(&self, working_order: Vec<Item>) -> Self {
        Self {
            fetched_order: self.fetched_order.clone(),
            working_order,
            fetched_at: self.fetched_at,
        }
    }

    pub fn reset(&self) -> Self {
        self.with_working_order(self.fetched_order.clone())
    }

    pub fn is_reordered(&self) -> bool {
        self.fetched_order
            .iter()
            .map(|item| item.id)
            .ne(self.working_order.iter().map(|item| item.id))
    }
}
