//! `task:user_activation` and `task:siakad_profile_picture_scraping`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ProfilePicture, StorageLocation};
use crate::error::CentralError;
use crate::ports::{
    AccountStore, Clock, PictureFetch, ProfilePictureSource, ProfilePictureStore, StoreError,
};
use crate::typed::payloads::{ProfilePictureScrapingTask, UserActivationTask};
use crate::typed::{Handler, TaskContext};

pub struct UserActivationHandler {
    accounts: Arc<dyn AccountStore>,
}

impl UserActivationHandler {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl Handler<UserActivationTask> for UserActivationHandler {
    async fn handle(&self, _ctx: TaskContext, task: UserActivationTask) -> Result<(), CentralError> {
        self.accounts.activate_user(&task.user_id).await?;
        tracing::info!(user_id = %task.user_id, "user activated");
        Ok(())
    }
}

pub struct ProfilePictureHandler {
    store: Arc<dyn ProfilePictureStore>,
    source: Arc<dyn ProfilePictureSource>,
    clock: Arc<dyn Clock>,
}

impl ProfilePictureHandler {
    pub fn new(
        store: Arc<dyn ProfilePictureStore>,
        source: Arc<dyn ProfilePictureSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            source,
            clock,
        }
    }
}

/// File extension for an accepted image content type.
fn image_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        "image/bmp" => Some(".bmp"),
        _ => None,
    }
}

#[async_trait]
impl Handler<ProfilePictureScrapingTask> for ProfilePictureHandler {
    async fn handle(
        &self,
        _ctx: TaskContext,
        task: ProfilePictureScrapingTask,
    ) -> Result<(), CentralError> {
        let student_id = task.student_id;

        match self.store.find_picture(&student_id).await {
            Ok(existing) => {
                tracing::info!(%student_id, filename = %existing.filename, "profile picture already scraped");
                return Ok(());
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let (content_type, bytes) = match self
            .source
            .fetch(&student_id)
            .await
            .map_err(|e| CentralError::Gateway(e.to_string()))?
        {
            PictureFetch::Missing => {
                tracing::info!(%student_id, "no profile picture upstream, considering success");
                return Ok(());
            }
            PictureFetch::Found {
                content_type,
                bytes,
            } => (content_type, bytes),
        };

        let Some(ext) = image_extension(&content_type) else {
            tracing::error!(%student_id, %content_type, "received forbidden content type");
            return Err(CentralError::Other(format!(
                "received forbidden content type: {content_type}"
            )));
        };

        let filename = format!("{student_id}{ext}");
        self.store.save_image(&filename, &bytes).await?;
        self.store
            .create_picture(&ProfilePicture {
                id: student_id.clone(),
                created_at: self.clock.now(),
                filename: filename.clone(),
                location: StorageLocation::Local,
            })
            .await?;

        tracing::info!(%student_id, %filename, written = bytes.len(), "profile picture saved");
        Ok(())
    }
}
