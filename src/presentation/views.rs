use crate::application::error::HttpError;
use crate::domain::entities::PostRecord;
use crate::presentation::sanitize::ContentRenderer;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Clone)]
pub struct PostCardView {
    pub id: i64,
    pub title: String,
    /// Markup ready for output; already passed through the content policy.
    pub content_html: String,
    pub image: Option<String>,
}

impl PostCardView {
    pub fn from_record(record: PostRecord, renderer: &ContentRenderer) -> Self {
        Self {
            id: record.id,
            content_html: renderer.render(&record.content),
            title: record.title,
            image: record.image.filter(|path| !path.is_empty()),
        }
    }
}

#[derive(Clone)]
pub struct EditorView {
    pub upload_limit_mib: u64,
    /// Width images are shrunk to, when resizing is enabled.
    pub max_image_width: Option<u32>,
}

#[derive(Clone)]
pub struct IndexView {
    pub posts: Vec<PostCardView>,
    pub editor: EditorView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: IndexView,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_with(posts: Vec<PostCardView>) -> IndexTemplate {
        IndexTemplate {
            view: IndexView {
                posts,
                editor: EditorView {
                    upload_limit_mib: 10,
                    max_image_width: Some(800),
                },
            },
        }
    }

    #[test]
    fn index_renders_posts_in_given_order_with_images() {
        let renderer = ContentRenderer::trusted();
        let posts = vec![
            PostCardView::from_record(
                PostRecord {
                    id: 2,
                    title: "Second & newest".to_string(),
                    content: "<p>two</p>".to_string(),
                    image: Some("/uploads/cover_0a1b2c3d.png".to_string()),
                },
                &renderer,
            ),
            PostCardView::from_record(
                PostRecord {
                    id: 1,
                    title: "First".to_string(),
                    content: "<p>one</p>".to_string(),
                    image: None,
                },
                &renderer,
            ),
        ];

        let html = view_with(posts).render().expect("render");

        assert!(!html.contains("Second & newest"));
        let second = html.find("Second &#38; newest").expect("escaped title");
        let first = html.find("First").expect("first title");
        assert!(second < first);
        assert!(html.contains("<p>two</p>"));
        assert!(html.contains(r#"src="/uploads/cover_0a1b2c3d.png""#));
        assert!(html.contains(r#"action="/create""#));
    }

    #[test]
    fn empty_index_still_renders_form() {
        let html = view_with(Vec::new()).render().expect("render");
        assert!(html.contains("No posts yet"));
        assert!(html.contains(r#"name="title""#));
    }

    #[test]
    fn empty_image_path_is_treated_as_absent() {
        let card = PostCardView::from_record(
            PostRecord {
                id: 1,
                title: "t".to_string(),
                content: String::new(),
                image: Some(String::new()),
            },
            &ContentRenderer::trusted(),
        );
        assert!(card.image.is_none());
    }
}
