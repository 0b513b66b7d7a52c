//! Course-bundle import.
//!
//! The back office can push a JSON bundle directly (the successor of the
//! old import endpoint) or pull the same shape from a headless CMS export
//! URL configured through the environment. Absent configuration the pull
//! path is disabled and body imports keep working.

use std::env;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use havamath_core::model::{CourseDraft, CourseId};
use storage::repository::CourseRepository;

use crate::Clock;
use crate::error::ImportServiceError;

/// One bundle entry: a full course draft, optionally targeting an existing
/// course to replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseEntry {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub draft: CourseDraft,
}

/// The import payload: a list of course trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseBundle {
    pub courses: Vec<CourseEntry>,
}

/// What an import did, per course.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: Vec<CourseId>,
    pub updated: Vec<CourseId>,
}

#[derive(Clone, Debug)]
pub struct CmsConfig {
    pub export_url: String,
    pub token: Option<String>,
}

impl CmsConfig {
    /// Reads `HAVAMATH_CMS_EXPORT_URL` (+ optional `HAVAMATH_CMS_TOKEN`).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let export_url = env::var("HAVAMATH_CMS_EXPORT_URL").ok()?;
        if export_url.trim().is_empty() {
            return None;
        }
        let token = env::var("HAVAMATH_CMS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Some(Self { export_url, token })
    }
}

/// Validates bundles and writes them through the catalog repository.
#[derive(Clone)]
pub struct ImportService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    client: Client,
    cms: Option<CmsConfig>,
}

impl ImportService {
    #[must_use]
    pub fn new(clock: Clock, courses: Arc<dyn CourseRepository>, cms: Option<CmsConfig>) -> Self {
        Self {
            clock,
            courses,
            client: Client::new(),
            cms,
        }
    }

    #[must_use]
    pub fn from_env(clock: Clock, courses: Arc<dyn CourseRepository>) -> Self {
        Self::new(clock, courses, CmsConfig::from_env())
    }

    /// Whether the CMS pull path is configured.
    #[must_use]
    pub fn pull_enabled(&self) -> bool {
        self.cms.is_some()
    }

    /// Validate and apply a bundle: entries without an ID create courses,
    /// entries with one replace the stored tree.
    ///
    /// Entries are applied in order and the import stops at the first
    /// failure; already-applied entries stay.
    ///
    /// # Errors
    ///
    /// Returns `Course` for validation failures, `UnknownCourse` when an
    /// entry targets a missing course, or `Storage` if persistence fails.
    pub async fn import_bundle(
        &self,
        bundle: CourseBundle,
    ) -> Result<ImportReport, ImportServiceError> {
        let now = self.clock.now();
        let mut report = ImportReport::default();

        for entry in bundle.courses {
            let validated = entry.draft.validate(now)?;
            match entry.id {
                Some(raw_id) => {
                    let id = CourseId::new(raw_id);
                    self.courses
                        .replace_course(id, &validated)
                        .await
                        .map_err(|e| match e {
                            storage::repository::StorageError::NotFound => {
                                ImportServiceError::UnknownCourse(raw_id)
                            }
                            other => ImportServiceError::Storage(other),
                        })?;
                    report.updated.push(id);
                }
                None => {
                    let id = self.courses.insert_course(&validated).await?;
                    report.created.push(id);
                }
            }
        }

        tracing::info!(
            created = report.created.len(),
            updated = report.updated.len(),
            "course bundle imported"
        );
        Ok(report)
    }

    /// Fetch the configured CMS export and import it.
    ///
    /// # Errors
    ///
    /// Returns `Disabled` when no CMS endpoint is configured, `Http` /
    /// `HttpStatus` for transport failures, and the same errors as
    /// [`ImportService::import_bundle`] for the payload itself.
    pub async fn pull_from_cms(&self) -> Result<ImportReport, ImportServiceError> {
        let cms = self.cms.as_ref().ok_or(ImportServiceError::Disabled)?;

        let mut request = self.client.get(&cms.export_url);
        if let Some(token) = &cms.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ImportServiceError::HttpStatus(response.status()));
        }

        let bundle: CourseBundle = response.json().await?;
        self.import_bundle(bundle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use havamath_core::model::{CourseError, ModuleDraft};
    use havamath_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn entry(id: Option<u64>, title: &str) -> CourseEntry {
        CourseEntry {
            id,
            draft: CourseDraft {
                title: title.into(),
                description: None,
                category: "Toán".into(),
                author: "Thầy Hà".into(),
                price_vnd: 499_000,
                modules: vec![ModuleDraft {
                    title: "Chương 1".into(),
                    lessons: vec![],
                }],
            },
        }
    }

    fn service(repo: Arc<InMemoryRepository>) -> ImportService {
        ImportService::new(Clock::fixed(fixed_now()), repo, None)
    }

    #[tokio::test]
    async fn bundle_creates_and_updates() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = service(repo.clone());

        let created = service
            .import_bundle(CourseBundle {
                courses: vec![entry(None, "Toán 12")],
            })
            .await
            .unwrap();
        assert_eq!(created.created.len(), 1);
        let id = created.created[0];

        let updated = service
            .import_bundle(CourseBundle {
                courses: vec![entry(Some(id.value()), "Toán 12 nâng cao")],
            })
            .await
            .unwrap();
        assert_eq!(updated.updated, vec![id]);

        let course = repo.get_course(id).await.unwrap().unwrap();
        assert_eq!(course.title, "Toán 12 nâng cao");
    }

    #[tokio::test]
    async fn unknown_target_course_is_reported() {
        let service = service(Arc::new(InMemoryRepository::new()));
        let err = service
            .import_bundle(CourseBundle {
                courses: vec![entry(Some(404), "Toán 12")],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ImportServiceError::UnknownCourse(404)));
    }

    #[tokio::test]
    async fn invalid_entries_fail_validation() {
        let service = service(Arc::new(InMemoryRepository::new()));
        let mut bad = entry(None, "Toán 12");
        bad.draft.category = String::new();
        let err = service
            .import_bundle(CourseBundle {
                courses: vec![bad],
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ImportServiceError::Course(CourseError::EmptyCategory)
        ));
    }

    #[tokio::test]
    async fn pull_without_config_is_disabled() {
        let service = service(Arc::new(InMemoryRepository::new()));
        assert!(!service.pull_enabled());
        let err = service.pull_from_cms().await.unwrap_err();
        assert!(matches!(err, ImportServiceError::Disabled));
    }

    #[tokio::test]
    async fn bundle_json_shape_is_stable() {
        let json = r#"{
            "courses": [{
                "title": "Toán 12",
                "category": "Toán",
                "author": "Thầy Hà",
                "price_vnd": 499000,
                "modules": []
            }]
        }"#;
        let bundle: CourseBundle = serde_json::from_str(json).unwrap();
        assert_eq!(bundle.courses.len(), 1);
        assert!(bundle.courses[0].id.is_none());
    }
}
