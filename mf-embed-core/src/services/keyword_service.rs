//! Keyword detection

use std::rc::Rc;

use crate::services::ServiceContext;
use crate::types::markup::KEYWORD_META_SELECTOR;
use crate::types::{EmbedConfig, Keyword};

/// Keyword detector
pub struct KeywordService {
    ctx: Rc<ServiceContext>,
}

impl KeywordService {
    #[must_use]
    pub fn new(ctx: Rc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Derive the session keyword.
    ///
    /// Order: `<meta name="mf-keyword">`, then the first context term found in
    /// the host body text, then the configured default. Blank candidates are
    /// skipped.
    pub fn detect(&self, config: &EmbedConfig) -> Keyword {
        if let Some(keyword) = self.from_meta() {
            log::debug!("Keyword from meta tag: {:?}", keyword.as_deref());
            return keyword;
        }
        if let Some(keyword) = self.from_context(&config.context_terms) {
            log::debug!("Keyword from page content: {:?}", keyword.as_deref());
            return keyword;
        }
        Keyword::new(Some(config.default_keyword.clone()))
    }

    fn from_meta(&self) -> Option<Keyword> {
        let document = self.ctx.document();
        let meta = match document.query_document(KEYWORD_META_SELECTOR) {
            Ok(meta) => meta?,
            Err(e) => {
                e.report("Keyword meta lookup failed");
                return None;
            }
        };
        let keyword = Keyword::new(document.get_attribute(meta, "content"));
        keyword.is_present().then_some(keyword)
    }

    fn from_context(&self, terms: &[String]) -> Option<Keyword> {
        if terms.is_empty() {
            return None;
        }
        let document = self.ctx.document();
        let text = document.text_content(document.body()).to_lowercase();
        terms
            .iter()
            .find(|term| text.contains(&term.to_lowercase()))
            .map(|term| Keyword::new(Some(term.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{config_with, create_test_context, TestEnv};
    use crate::traits::HostDocument;
    use crate::types::EmbedOptions;

    fn config(default_keyword: &str, context_terms: &[&str]) -> EmbedConfig {
        config_with(EmbedOptions {
            target: Some("#app".to_string()),
            default_keyword: Some(default_keyword.to_string()),
            context_terms: Some(context_terms.iter().map(ToString::to_string).collect()),
            ..Default::default()
        })
    }

    #[test]
    fn meta_tag_wins() {
        let TestEnv { doc, ctx, .. } = create_test_context();
        doc.append_element(
            doc.head(),
            "meta",
            &[("name", "mf-keyword"), ("content", " robotics ")],
        )
        .unwrap();
        let p = doc.append_element(doc.body(), "p", &[]).unwrap();
        doc.set_text_content(p, "All about Python").unwrap();

        let keyword = KeywordService::new(ctx).detect(&config("ai", &["python"]));
        assert_eq!(keyword.as_deref(), Some("robotics"));
    }

    #[test]
    fn blank_meta_falls_through_to_default() {
        let TestEnv { doc, ctx, .. } = create_test_context();
        doc.append_element(doc.head(), "meta", &[("name", "mf-keyword"), ("content", "  ")])
            .unwrap();

        let keyword = KeywordService::new(ctx).detect(&config("ai", &[]));
        assert_eq!(keyword.as_deref(), Some("ai"));
    }

    #[test]
    fn context_terms_match_case_insensitively() {
        let TestEnv { doc, ctx, .. } = create_test_context();
        let p = doc.append_element(doc.body(), "p", &[]).unwrap();
        doc.set_text_content(p, "Learn MACHINE learning today").unwrap();

        let keyword =
            KeywordService::new(ctx).detect(&config("ai", &["robotics", "machine learning"]));
        assert_eq!(keyword.as_deref(), Some("machine learning"));
    }

    #[test]
    fn no_source_means_no_keyword() {
        let TestEnv { ctx, .. } = create_test_context();
        let keyword = KeywordService::new(ctx).detect(&config("", &["robotics"]));
        assert!(!keyword.is_present());
    }
}
