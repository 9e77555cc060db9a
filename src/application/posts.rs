use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreatePostParams, PostsRepo, PostsWriteRepo, RepoError};
use crate::domain::entities::PostRecord;

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
}

/// Reads and writes blog posts. Title and content are stored as given.
#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
}

impl PostService {
    pub fn new(reader: Arc<dyn PostsRepo>, writer: Arc<dyn PostsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn list_recent(&self) -> Result<Vec<PostRecord>, PostServiceError> {
        self.reader
            .list_posts_desc()
            .await
            .map_err(PostServiceError::from)
    }

    pub async fn create_post(
        &self,
        command: CreatePostCommand,
    ) -> Result<PostRecord, PostServiceError> {
        let CreatePostCommand {
            title,
            content,
            image,
        } = command;

        let post = self
            .writer
            .create_post(CreatePostParams {
                title,
                content,
                image,
            })
            .await?;

        counter!("quillpost_posts_created_total").increment(1);
        info!(
            target = "quillpost::application::posts",
            post_id = post.id,
            has_image = post.image.is_some(),
            "post created"
        );

        Ok(post)
    }
}
