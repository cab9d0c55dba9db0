use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub description: String,
    pub amount: f64,
    /// Person ids, sorted. Empty means unassigned.
    pub assigned_to: Vec<String>,
    pub transaction_date: Option<String>,
    pub posted_date: Option<String>,
    pub card_number: Option<String>,
    pub file_name: Option<String>,
    pub category_id: Option<String>,
    /// `None` while active; set once when swept into an archive.
    pub archive_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for a new transaction, as produced by ingestion or a direct insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub posted_date: Option<String>,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub archived_at: String,
    /// Every active transaction at snapshot time, assigned or not.
    pub transaction_count: i64,
    /// Sum of person totals; unassigned transactions are not included.
    pub total_amount: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivePersonTotal {
    pub archive_id: String,
    pub person_id: String,
    pub person_name: String,
    pub total_amount: f64,
}

/// One row of the split calculator's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonTotal {
    pub person_id: String,
    pub person: String,
    pub total: f64,
}
