//! YAML problem catalog: `category -> [{title, url}]`.
//!
//! ```yaml
//! Arrays:
//!   - title: Two Sum
//!     url: https://leetcode.com/problems/two-sum/
//! ```

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CatalogError;
use crate::models::RecordOutcome;
use crate::pool::ProblemPool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl CatalogEntry {
    fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub inserted: usize,
    /// Titles already present in the pool or earlier in the file.
    pub duplicates: usize,
    /// Entries with an empty title or url.
    pub skipped: usize,
}

/// Categories in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub categories: IndexMap<String, Vec<CatalogEntry>>,
}

impl Catalog {
    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_string(&self) -> Result<String, CatalogError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep the first occurrence of each title across all categories.
    /// Categories left empty are dropped.
    pub fn dedupe(&self) -> Catalog {
        let mut seen = HashSet::new();
        let mut categories = IndexMap::new();
        for (category, entries) in &self.categories {
            let kept: Vec<CatalogEntry> = entries
                .iter()
                .filter(|e| seen.insert(e.title.trim().to_string()))
                .cloned()
                .collect();
            if !kept.is_empty() {
                categories.insert(category.clone(), kept);
            }
        }
        Catalog { categories }
    }

    /// Insert every valid entry in one transaction.
    pub fn import(&self, conn: &Connection) -> Result<ImportSummary, CatalogError> {
        let tx = conn.unchecked_transaction()?;
        let pool = ProblemPool::new(&tx);
        let mut summary = ImportSummary::default();

        for (category, entries) in &self.categories {
            for entry in entries {
                if !entry.is_valid() {
                    debug!(category = %category, title = %entry.title, "skipping incomplete catalog entry");
                    summary.skipped += 1;
                    continue;
                }
                match pool.add(entry.title.trim(), entry.url.trim(), category)? {
                    RecordOutcome::Created => summary.inserted += 1,
                    RecordOutcome::AlreadyExists => summary.duplicates += 1,
                }
            }
        }
        tx.commit()?;

        info!(
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            skipped = summary.skipped,
            "imported problem catalog"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    const SAMPLE: &str = "
Arrays:
  - title: Two Sum
    url: https://leetcode.com/problems/two-sum/
  - title: Best Time to Buy and Sell Stock
    url: https://leetcode.com/problems/best-time-to-buy-and-sell-stock/
Hashing:
  - title: Two Sum
    url: https://leetcode.com/problems/two-sum/
  - title: ''
    url: https://leetcode.com/problems/nothing/
  - title: Group Anagrams
";

    #[test]
    fn parses_categories_in_file_order() {
        let catalog = Catalog::from_yaml_str(SAMPLE).unwrap();
        let names: Vec<&String> = catalog.categories.keys().collect();
        assert_eq!(names, vec!["Arrays", "Hashing"]);
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn import_counts_duplicates_and_skips() {
        let db = Database::open_memory().unwrap();
        let catalog = Catalog::from_yaml_str(SAMPLE).unwrap();
        let summary = catalog.import(db.conn()).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                inserted: 2,
                duplicates: 1,
                skipped: 2
            }
        );

        let again = catalog.import(db.conn()).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.duplicates, 3);
        assert_eq!(ProblemPool::new(db.conn()).counts().unwrap().total, 2);
    }

    #[test]
    fn first_category_wins_for_duplicate_titles() {
        let db = Database::open_memory().unwrap();
        Catalog::from_yaml_str(SAMPLE).unwrap().import(db.conn()).unwrap();
        let problems = ProblemPool::new(db.conn()).list(false).unwrap();
        let two_sum = problems.iter().find(|p| p.title == "Two Sum").unwrap();
        assert_eq!(two_sum.category, "Arrays");
    }

    #[test]
    fn dedupe_keeps_first_occurrence_and_drops_empty_categories() {
        let catalog = Catalog::from_yaml_str(
            "A:\n  - {title: X, url: u1}\nB:\n  - {title: X, url: u2}\n",
        )
        .unwrap();
        let deduped = catalog.dedupe();
        assert_eq!(deduped.len(), 1);
        assert!(!deduped.categories.contains_key("B"));

        let reparsed = Catalog::from_yaml_str(&deduped.to_yaml_string().unwrap()).unwrap();
        assert_eq!(reparsed, deduped);
    }

    #[test]
    fn empty_file_is_an_empty_catalog() {
        assert!(Catalog::from_yaml_str("  \n").unwrap().is_empty());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(matches!(
            Catalog::from_yaml_str("- just\n- a list"),
            Err(CatalogError::Parse(_))
        ));
    }
}
