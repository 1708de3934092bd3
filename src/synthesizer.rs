//! Builds the shareable card page: title, Open Graph / Twitter preview tags,
//! and the client data script, spliced into the static base document.

use std::sync::Arc;

use crate::domain::TemplateSource;
use crate::errors::SynthesisError;
use crate::escape::{escape_html, escape_js_string};
use crate::models::{PreviewMetadata, RenderedDocument, RequestOrigin, ShareRequest, ThemeCatalog};
use crate::template::PageTemplate;

pub const BASE_SHARE_MESSAGE: &str = "Happy Holidays! 🎄✨ Check out this custom holiday greeting I made using the Virtual Holiday Greeting Card app.";

/// Maximum visible description length, ellipsis included.
pub const DESCRIPTION_LIMIT: usize = 200;

const ELLIPSIS: &str = "...";

const PREVIEW_IMAGE_PATH: &str = "/placeholder-preview.png";

pub struct DocumentSynthesizer {
    themes: ThemeCatalog,
    template: Arc<dyn TemplateSource>,
}

impl DocumentSynthesizer {
    pub fn new(themes: ThemeCatalog, template: Arc<dyn TemplateSource>) -> Self {
        Self { themes, template }
    }

    pub async fn synthesize(
        &self,
        request: &ShareRequest,
        origin: &RequestOrigin,
    ) -> Result<RenderedDocument, SynthesisError> {
        let theme = self.themes.resolve(request.theme_id.as_deref());
        let user_message = request.decode_message()?;
        let share_message = build_share_message(&user_message);

        let metadata = PreviewMetadata {
            title: format!("{} - Holiday Greeting", theme.name),
            description: truncate_description(&share_message, DESCRIPTION_LIMIT),
            canonical_url: origin.canonical_url(),
            image_url: format!("{}{}", origin.base_url(), PREVIEW_IMAGE_PATH),
        };

        let template = PageTemplate::parse(&self.template.load().await?)?;
        let html = template.render(
            &escape_html(&metadata.title),
            &preview_tags(&metadata),
            &client_data_script(&share_message, &metadata.canonical_url),
        );

        tracing::debug!(
            theme_id = %theme.id,
            message_chars = user_message.chars().count(),
            "Synthesized card document"
        );

        Ok(RenderedDocument {
            html,
            metadata,
            share_message,
        })
    }
}

/// Prepends the trimmed user message (if any) to the fixed promotional sentence.
pub fn build_share_message(user_message: &str) -> String {
    let trimmed = user_message.trim();
    if trimmed.is_empty() {
        BASE_SHARE_MESSAGE.to_string()
    } else {
        format!("{} {}", trimmed, BASE_SHARE_MESSAGE)
    }
}

/// Truncates to at most `limit` characters, ending in `...` when shortened.
pub fn truncate_description(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Open Graph and Twitter card tags, every value HTML-escaped.
pub fn preview_tags(metadata: &PreviewMetadata) -> String {
    let url = escape_html(&metadata.canonical_url);
    let title = escape_html(&metadata.title);
    let description = escape_html(&metadata.description);
    let image = escape_html(&metadata.image_url);

    format!(
        r#"
    <!-- Open Graph Meta Tags (Dynamic) -->
    <meta property="og:type" content="website" />
    <meta property="og:url" content="{url}" />
    <meta property="og:title" content="{title}" />
    <meta property="og:description" content="{description}" />
    <meta property="og:image" content="{image}" />

    <!-- Twitter Card Meta Tags -->
    <meta name="twitter:card" content="summary_large_image" />
    <meta name="twitter:title" content="{title}" />
    <meta name="twitter:description" content="{description}" />
    <meta name="twitter:image" content="{image}" />
"#
    )
}

/// Script exposing the full share message and card URL to the page.
pub fn client_data_script(share_message: &str, card_url: &str) -> String {
    format!(
        r#"
    <script>
        window.shareMessage = '{}';
        window.cardUrl = '{}';
    </script>
"#,
        escape_js_string(share_message),
        escape_js_string(card_url)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DecodeError, TemplateError};
    use crate::testing::{StaticTemplate, SKELETON};

    fn synthesizer() -> DocumentSynthesizer {
        DocumentSynthesizer::new(ThemeCatalog::default(), Arc::new(StaticTemplate::new(SKELETON)))
    }

    fn origin(path_and_query: &str) -> RequestOrigin {
        RequestOrigin {
            scheme: "https".into(),
            host: "cards.example.com".into(),
            path_and_query: path_and_query.into(),
        }
    }

    fn request(t: Option<&str>, m: Option<&str>) -> ShareRequest {
        ShareRequest {
            theme_id: t.map(str::to_string),
            raw_message: m.map(str::to_string),
        }
    }

    fn meta_content<'a>(html: &'a str, attr: &str) -> &'a str {
        let start = html.find(attr).unwrap() + attr.len();
        let rest = &html[start..];
        let value_start = rest.find("content=\"").unwrap() + "content=\"".len();
        let value_end = rest[value_start..].find('"').unwrap();
        &rest[value_start..value_start + value_end]
    }

    fn script_block(html: &str) -> &str {
        let start = html.find("<script>").unwrap();
        let end = html.find("</script>").unwrap();
        &html[start + "<script>".len()..end]
    }

    fn unescape_html(s: &str) -> String {
        s.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#039;", "'")
            .replace("&amp;", "&")
    }

    #[tokio::test]
    async fn known_theme_names_appear_in_title() {
        let synth = synthesizer();
        for (id, name) in [("1", "Snowy Cabin"), ("2", "Santa's Workshop"), ("3", "Winter Wonderland")] {
            let doc = synth.synthesize(&request(Some(id), None), &origin("/card")).await.unwrap();
            assert_eq!(doc.metadata.title, format!("{} - Holiday Greeting", name));
            let escaped = escape_html(&doc.metadata.title);
            assert!(doc.html.contains(&format!("<title>{}</title>", escaped)));
        }
    }

    #[tokio::test]
    async fn santas_workshop_with_empty_message() {
        let doc = synthesizer()
            .synthesize(&request(Some("2"), None), &origin("/card?t=2&m="))
            .await
            .unwrap();
        assert_eq!(doc.metadata.title, "Santa's Workshop - Holiday Greeting");
        assert_eq!(doc.metadata.description, BASE_SHARE_MESSAGE);
        assert_eq!(doc.share_message, BASE_SHARE_MESSAGE);
        assert!(doc.html.contains("<title>Santa&#039;s Workshop - Holiday Greeting</title>"));
    }

    #[tokio::test]
    async fn unknown_theme_falls_back_to_snowy_cabin() {
        let doc = synthesizer()
            .synthesize(&request(Some("99"), None), &origin("/card?t=99"))
            .await
            .unwrap();
        assert_eq!(doc.metadata.title, "Snowy Cabin - Holiday Greeting");
    }

    #[tokio::test]
    async fn long_message_truncates_description_only() {
        let message = "x".repeat(250);
        let doc = synthesizer()
            .synthesize(&request(None, Some(&message)), &origin("/card"))
            .await
            .unwrap();

        assert_eq!(doc.metadata.description.chars().count(), DESCRIPTION_LIMIT);
        assert!(doc.metadata.description.ends_with("..."));
        assert_eq!(meta_content(&doc.html, "og:description"), doc.metadata.description);
        assert!(script_block(&doc.html).contains(&message));
    }

    #[tokio::test]
    async fn short_message_round_trips_through_both_contexts() {
        let doc = synthesizer()
            .synthesize(&request(Some("3"), Some("Love%2C%20%26%20joy")), &origin("/card"))
            .await
            .unwrap();
        let expected = format!("Love, & joy {}", BASE_SHARE_MESSAGE);

        assert_eq!(doc.share_message, expected);
        assert_eq!(unescape_html(meta_content(&doc.html, "og:description")), expected);
        assert_eq!(unescape_html(meta_content(&doc.html, "twitter:description")), expected);
        assert!(script_block(&doc.html).contains(&format!("window.shareMessage = '{}';", expected)));
    }

    #[tokio::test]
    async fn hostile_message_is_escaped_per_context() {
        let raw = "%3C%2Ftitle%3E%3Cscript%3Ealert(%22x%22)%3C%2Fscript%3E%20it's%20%26%5C%0Anew";
        let doc = synthesizer()
            .synthesize(&request(None, Some(raw)), &origin("/card"))
            .await
            .unwrap();

        let description = meta_content(&doc.html, "og:description");
        for c in ['<', '>', '"', '\''] {
            assert!(!description.contains(c), "unescaped {c:?} in {description}");
        }
        assert!(!description.replace("&amp;", "").replace("&lt;", "").replace("&gt;", "")
            .replace("&quot;", "").replace("&#039;", "").contains('&'));

        let script = script_block(&doc.html);
        assert!(!script.contains("</"));
        assert!(script.contains(r#"alert(\"x\")"#));
        assert!(script.contains(r#"it\'s &\\\nnew"#));
        assert_eq!(doc.html.matches("</script>").count(), 1);
    }

    #[tokio::test]
    async fn canonical_url_is_escaped_in_markup() {
        let doc = synthesizer()
            .synthesize(&request(None, None), &origin("/card?t=1&m=\"onload='x'"))
            .await
            .unwrap();
        let url = meta_content(&doc.html, "og:url");
        assert!(url.starts_with("https://cards.example.com/card?t=1&amp;m=&quot;onload="));
        assert!(script_block(&doc.html).contains(r#"window.cardUrl = 'https://cards.example.com/card?t=1&m=\"onload=\'x\'';"#));
        assert_eq!(
            meta_content(&doc.html, "og:image"),
            "https://cards.example.com/placeholder-preview.png"
        );
    }

    #[tokio::test]
    async fn synthesis_is_deterministic() {
        let synth = synthesizer();
        let req = request(Some("2"), Some("Season%27s%20greetings"));
        let first = synth.synthesize(&req, &origin("/card?t=2")).await.unwrap();
        let second = synth.synthesize(&req, &origin("/card?t=2")).await.unwrap();
        assert_eq!(first.html, second.html);
    }

    #[tokio::test]
    async fn malformed_message_fails_before_template_load() {
        let synth = DocumentSynthesizer::new(ThemeCatalog::default(), Arc::new(StaticTemplate::failing()));
        let err = synth
            .synthesize(&request(None, Some("50%")), &origin("/card"))
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidMessage(DecodeError::MalformedEscape(2))));
    }

    #[tokio::test]
    async fn template_failure_is_reported() {
        let synth = DocumentSynthesizer::new(ThemeCatalog::default(), Arc::new(StaticTemplate::failing()));
        let err = synth.synthesize(&request(None, None), &origin("/card")).await.unwrap_err();
        assert!(matches!(err, SynthesisError::Template(TemplateError::Io { .. })));
    }

    #[test]
    fn share_message_trims_user_text() {
        assert_eq!(build_share_message(""), BASE_SHARE_MESSAGE);
        assert_eq!(build_share_message("   \n"), BASE_SHARE_MESSAGE);
        assert_eq!(
            build_share_message("  Hello!  "),
            format!("Hello! {}", BASE_SHARE_MESSAGE)
        );
    }

    #[test]
    fn truncation_respects_limit_and_characters() {
        assert_eq!(truncate_description("short", 200), "short");
        let exact = "y".repeat(200);
        assert_eq!(truncate_description(&exact, 200), exact);
        let emoji = "🎄".repeat(201);
        let truncated = truncate_description(&emoji, 200);
        assert_eq!(truncated.chars().count(), 200);
        assert!(truncated.ends_with("..."));
    }
}
