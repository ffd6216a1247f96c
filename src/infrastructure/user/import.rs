//! Bulk import of user records from a JSON file

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::user::{validate_full, UpsertOutcome, UserRepository};
use crate::domain::DomainError;

/// Outcome of an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
}

impl ImportReport {
    pub fn total(&self) -> u64 {
        self.inserted + self.updated + self.skipped
    }
}

/// Loads user records into a store, matching existing rows by email
#[derive(Debug)]
pub struct UserImporter<R: UserRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: UserRepository + ?Sized> UserImporter<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Import the JSON array stored at `path`
    pub async fn import_file(&self, path: impl AsRef<Path>) -> Result<ImportReport, DomainError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Importing users");

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::configuration(format!("Failed to read '{}': {}", path.display(), e))
        })?;

        let records: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
            DomainError::configuration(format!(
                "'{}' is not a JSON array of user records: {}",
                path.display(),
                e
            ))
        })?;

        self.import_records(records).await
    }

    /// Import already parsed records. Records that fail validation are
    /// skipped; store failures abort the run.
    pub async fn import_records(&self, records: Vec<Value>) -> Result<ImportReport, DomainError> {
        let mut report = ImportReport::default();

        for (index, record) in records.into_iter().enumerate() {
            let Value::Object(mut fields) = record else {
                warn!(index, "Skipping record that is not an object");
                report.skipped += 1;
                continue;
            };

            // Ids are always assigned by the store
            fields.remove("id");

            let draft = match validate_full(&fields) {
                Ok(draft) => draft,
                Err(errors) => {
                    warn!(index, errors = %errors, "Skipping invalid record");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.repository.upsert_by_email(&draft).await? {
                UpsertOutcome::Inserted(_) => report.inserted += 1,
                UpsertOutcome::Updated(_) => report.updated += 1,
            }
        }

        info!(
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            "Import finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::user::InMemoryUserRepository;
    use serde_json::json;
    use std::path::PathBuf;

    fn record(first: &str, email: &str, age: Value) -> Value {
        json!({
            "id": 999,
            "first_name": first,
            "last_name": "Butt",
            "company_name": "Benton, John B Jr",
            "city": "New Orleans",
            "state": "LA",
            "zip": 70116,
            "email": email,
            "web": "http://www.bentonjohnbjr.com",
            "age": age
        })
    }

    fn temp_file(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("users-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_import_records_counts_outcomes() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let importer = UserImporter::new(repo.clone());

        let report = importer
            .import_records(vec![
                record("James", "jbutt@gmail.com", json!(70)),
                record("Josephine", "josephine@darakjy.org", json!(-1)),
                json!("not a record"),
                record("Jim", "jbutt@gmail.com", json!(71)),
            ])
            .await
            .unwrap();

        assert_eq!(
            report,
            ImportReport {
                inserted: 1,
                updated: 1,
                skipped: 2
            }
        );
        assert_eq!(report.total(), 4);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_import_ignores_supplied_ids() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let importer = UserImporter::new(repo.clone());

        importer
            .import_records(vec![record("James", "jbutt@gmail.com", json!(70))])
            .await
            .unwrap();

        let page = repo
            .query(&crate::domain::user::UserQuery::from_params(&Default::default()).unwrap())
            .await
            .unwrap();
        assert_eq!(page.items[0].id().value(), 1);
    }

    #[tokio::test]
    async fn test_import_file() {
        let content = serde_json::to_string(&vec![
            record("James", "jbutt@gmail.com", json!(70)),
            record("Josephine", "josephine@darakjy.org", json!("48")),
        ])
        .unwrap();
        let path = temp_file(&content);

        let importer = UserImporter::new(Arc::new(InMemoryUserRepository::new()));
        let report = importer.import_file(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 0);
    }

    #[tokio::test]
    async fn test_import_file_missing() {
        let importer = UserImporter::new(Arc::new(InMemoryUserRepository::new()));
        let err = importer
            .import_file("/nonexistent/users.json")
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_import_file_not_an_array() {
        let path = temp_file(r#"{"first_name": "James"}"#);

        let importer = UserImporter::new(Arc::new(InMemoryUserRepository::new()));
        let err = importer.import_file(&path).await.unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(err, DomainError::Configuration { .. }));
    }
}
