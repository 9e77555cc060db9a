//! Rendering policy for stored post content.
//!
//! Post content is stored exactly as the editor submitted it. Whether it is
//! cleaned is decided here, at render time, so the stored markup can always
//! be re-rendered under a different policy.

use ammonia::Builder as AmmoniaBuilder;

pub struct ContentRenderer {
    sanitizer: Option<AmmoniaBuilder<'static>>,
}

impl ContentRenderer {
    /// Strip scripts, event handlers and other unsafe markup before output.
    pub fn sanitizing() -> Self {
        Self {
            sanitizer: Some(build_sanitizer()),
        }
    }

    /// Emit stored content verbatim. Stored XSS is possible in this mode.
    pub fn trusted() -> Self {
        Self { sanitizer: None }
    }

    pub fn new(sanitize: bool) -> Self {
        if sanitize {
            Self::sanitizing()
        } else {
            Self::trusted()
        }
    }

    pub fn render(&self, content: &str) -> String {
        match &self.sanitizer {
            Some(builder) => builder.clean(content).to_string(),
            None => content.to_string(),
        }
    }
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    // Rich-text editors express alignment and sizing through classes.
    builder.add_generic_attributes(&["class"]);
    builder.add_tag_attributes("img", &["title", "loading", "decoding"]);

    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizing_drops_scripts_and_handlers() {
        let renderer = ContentRenderer::sanitizing();
        let html = renderer.render(
            r#"<p onclick="steal()">Hi<script>alert(1)</script></p><img src="/uploads/a_12345678.png" onerror="x()">"#,
        );

        assert!(!html.contains("script"));
        assert!(!html.contains("onclick"));
        assert!(!html.contains("onerror"));
        assert!(html.contains(r#"src="/uploads/a_12345678.png""#));
        assert!(html.contains("<p>Hi</p>"));
    }

    #[test]
    fn sanitizing_keeps_editor_formatting() {
        let renderer = ContentRenderer::sanitizing();
        let html = renderer.render(
            r#"<p class="ql-align-center"><strong>bold</strong> <em>it</em> <u>u</u></p>"#,
        );
        assert_eq!(
            html,
            r#"<p class="ql-align-center"><strong>bold</strong> <em>it</em> <u>u</u></p>"#
        );
    }

    #[test]
    fn trusted_mode_is_verbatim() {
        let raw = "<script>alert(1)</script>";
        assert_eq!(ContentRenderer::trusted().render(raw), raw);
    }
}
