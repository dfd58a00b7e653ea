//! Student service — role-record reads, edits, projects, and avatar upload.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::backend::StorageClient;
use crate::directory::traits::Directory;
use crate::error::BackendError;
use crate::profile::model::{Project, StudentChanges, StudentRecord};

/// Bucket holding student avatars, keyed by user id.
const AVATAR_BUCKET: &str = "avatars";

pub struct StudentService {
    dir: Arc<dyn Directory>,
    storage: StorageClient,
}

impl StudentService {
    pub fn new(dir: Arc<dyn Directory>, storage: StorageClient) -> Self {
        Self { dir, storage }
    }

    pub async fn by_user(&self, user_id: Uuid) -> Result<StudentRecord, BackendError> {
        self.dir
            .student_by_user(user_id)
            .await?
            .ok_or(BackendError::NotFound {
                table: "students".into(),
            })
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        changes: StudentChanges,
    ) -> Result<StudentRecord, BackendError> {
        self.dir.update_student(user_id, &changes).await
    }

    /// Skills for a student; an absent record reads as no skills.
    pub async fn skills(&self, user_id: Uuid) -> Result<Vec<String>, BackendError> {
        Ok(self
            .dir
            .student_by_user(user_id)
            .await?
            .map(|s| s.skills)
            .unwrap_or_default())
    }

    pub async fn search(
        &self,
        query: Option<&str>,
        skills: &[String],
    ) -> Result<Vec<StudentRecord>, BackendError> {
        self.dir.search_students(query, skills).await
    }

    // ── Projects (embedded list, read-modify-write) ─────────────────

    pub async fn add_project(
        &self,
        user_id: Uuid,
        project: Project,
    ) -> Result<StudentRecord, BackendError> {
        let record = self.by_user(user_id).await?;
        let mut projects = record.projects;
        projects.push(project);
        self.write_projects(user_id, projects).await
    }

    pub async fn replace_project(
        &self,
        user_id: Uuid,
        index: usize,
        project: Project,
    ) -> Result<StudentRecord, BackendError> {
        let record = self.by_user(user_id).await?;
        let mut projects = record.projects;
        let slot = projects.get_mut(index).ok_or(BackendError::NotFound {
            table: "students".into(),
        })?;
        *slot = project;
        self.write_projects(user_id, projects).await
    }

    pub async fn remove_project(
        &self,
        user_id: Uuid,
        index: usize,
    ) -> Result<StudentRecord, BackendError> {
        let record = self.by_user(user_id).await?;
        let mut projects = record.projects;
        if index >= projects.len() {
            return Err(BackendError::NotFound {
                table: "students".into(),
            });
        }
        projects.remove(index);
        self.write_projects(user_id, projects).await
    }

    async fn write_projects(
        &self,
        user_id: Uuid,
        projects: Vec<Project>,
    ) -> Result<StudentRecord, BackendError> {
        let changes = StudentChanges {
            projects: Some(projects),
            ..Default::default()
        };
        self.dir.update_student(user_id, &changes).await
    }

    // ── Avatar ──────────────────────────────────────────────────────

    /// Upload an avatar and point the student record at its public URL.
    pub async fn upload_avatar(
        &self,
        user_id: Uuid,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(String, StudentRecord), BackendError> {
        let path = format!("{user_id}/{file_name}");
        self.storage
            .upload(AVATAR_BUCKET, &path, bytes, content_type)
            .await?;
        let url = self.storage.public_url(AVATAR_BUCKET, &path);

        info!(%user_id, url = %url, "Avatar uploaded");

        let changes = StudentChanges {
            avatar_url: Some(url.clone()),
            ..Default::default()
        };
        let record = self.dir.update_student(user_id, &changes).await?;
        Ok((url, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::directory::memory::MemoryDirectory;
    use crate::profile::model::NewStudent;
    use secrecy::SecretString;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn storage_stub() -> StorageClient {
        let config = BackendConfig {
            base_url: "http://localhost".into(),
            anon_key: SecretString::from("test-key"),
        };
        StorageClient::new(&config, Arc::new(RwLock::new(None)))
    }

    async fn seeded_service() -> (StudentService, Uuid) {
        let dir = Arc::new(MemoryDirectory::new());
        let user_id = Uuid::new_v4();
        dir.insert_student(&NewStudent::new(user_id, "A B", "U", "CS"))
            .await
            .unwrap();
        (StudentService::new(dir, storage_stub()), user_id)
    }

    fn project(title: &str) -> Project {
        Project {
            title: title.into(),
            description: None,
            url: None,
        }
    }

    #[tokio::test]
    async fn missing_student_is_not_found() {
        let dir = Arc::new(MemoryDirectory::new());
        let service = StudentService::new(dir, storage_stub());
        let result = service.by_user(Uuid::new_v4()).await;
        assert!(matches!(result, Err(BackendError::NotFound { .. })));
    }

    #[tokio::test]
    async fn add_and_replace_project() {
        let (service, user_id) = seeded_service().await;

        let record = service.add_project(user_id, project("one")).await.unwrap();
        assert_eq!(record.projects.len(), 1);

        let record = service
            .replace_project(user_id, 0, project("two"))
            .await
            .unwrap();
        assert_eq!(record.projects[0].title, "two");
    }

    #[tokio::test]
    async fn remove_project_out_of_range() {
        let (service, user_id) = seeded_service().await;
        service.add_project(user_id, project("one")).await.unwrap();

        let result = service.remove_project(user_id, 5).await;
        assert!(matches!(result, Err(BackendError::NotFound { .. })));

        let record = service.remove_project(user_id, 0).await.unwrap();
        assert!(record.projects.is_empty());
    }

    #[tokio::test]
    async fn skills_of_missing_student_are_empty() {
        let dir = Arc::new(MemoryDirectory::new());
        let service = StudentService::new(dir, storage_stub());
        assert!(service.skills(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
