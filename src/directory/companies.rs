//! Company service — role-record reads, edits, and logo upload.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::backend::StorageClient;
use crate::directory::traits::Directory;
use crate::error::BackendError;
use crate::profile::model::{CompanyChanges, CompanyRecord};

/// Bucket holding company logos.
const LOGO_BUCKET: &str = "logos";

pub struct CompanyService {
    dir: Arc<dyn Directory>,
    storage: StorageClient,
}

impl CompanyService {
    pub fn new(dir: Arc<dyn Directory>, storage: StorageClient) -> Self {
        Self { dir, storage }
    }

    pub async fn by_user(&self, user_id: Uuid) -> Result<CompanyRecord, BackendError> {
        self.dir
            .company_by_user(user_id)
            .await?
            .ok_or(BackendError::NotFound {
                table: "companies".into(),
            })
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: CompanyChanges,
    ) -> Result<CompanyRecord, BackendError> {
        self.dir.update_company(id, &changes).await
    }

    /// Upload a logo and point the company record at its public URL. The
    /// path is stable per company, so re-uploads replace the old logo.
    pub async fn upload_logo(
        &self,
        company_id: Uuid,
        file_ext: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(String, CompanyRecord), BackendError> {
        let path = format!("companies/{company_id}/logo.{file_ext}");
        self.storage
            .upload(LOGO_BUCKET, &path, bytes, content_type)
            .await?;
        let url = self.storage.public_url(LOGO_BUCKET, &path);

        info!(%company_id, url = %url, "Logo uploaded");

        let changes = CompanyChanges {
            logo_url: Some(url.clone()),
            ..Default::default()
        };
        let record = self.dir.update_company(company_id, &changes).await?;
        Ok((url, record))
    }
}
