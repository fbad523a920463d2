//! Asset reference extraction: `![[img.png]]`, `![alt](img.png)`,
//! `[[file.pdf]]`, `[label](file.pdf)`
//!
//! Only references that point at an image or attachment file are returned.
//! Note transclusions (`![[Other Note]]`), plain wikilinks and external URLs
//! stay in the body as prose.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;
use vaultshelf_core::{AssetKind, AssetReference, SyntaxKind, VaultSettings};

/// Matches `![[target]]`
static EMBED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\[([^\[\]]+)\]\]").unwrap());

/// Matches `[[target]]`; embeds are filtered by the preceding `!`
static WIKILINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").unwrap());

/// Matches `![alt](path)`, `![alt](<path with spaces>)`, `![alt](path "title")`
static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[(?P<text>[^\[\]]*)\]\((?:<(?P<angle>[^<>]+)>|(?P<url>[^()\s]+))(?:\s+"[^"]*")?\)"#)
        .unwrap()
});

/// Matches `[label](path)`; images are filtered by the preceding `!`
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[(?P<text>[^\[\]]*)\]\((?:<(?P<angle>[^<>]+)>|(?P<url>[^()\s]+))(?:\s+"[^"]*")?\)"#)
        .unwrap()
});

/// Scans document bodies for embedded images and attachments
#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    image_extensions: BTreeSet<String>,
    attachment_extensions: BTreeSet<String>,
}

impl Default for ReferenceExtractor {
    fn default() -> Self {
        Self::from_settings(&VaultSettings::default())
    }
}

impl ReferenceExtractor {
    /// Create an extractor with explicit extension sets (lowercase, no dot)
    pub fn new(image_extensions: BTreeSet<String>, attachment_extensions: BTreeSet<String>) -> Self {
        Self {
            image_extensions,
            attachment_extensions,
        }
    }

    /// Create an extractor using the configured extension sets
    pub fn from_settings(settings: &VaultSettings) -> Self {
        Self::new(
            settings.image_extensions.clone(),
            settings.attachment_extensions.clone(),
        )
    }

    /// Classify a path by its extension
    pub fn classify(&self, path: &str) -> Option<AssetKind> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        if self.image_extensions.contains(&ext) {
            Some(AssetKind::Image)
        } else if self.attachment_extensions.contains(&ext) {
            Some(AssetKind::Attachment)
        } else {
            None
        }
    }

    /// Extract every asset reference in order of appearance.
    ///
    /// Repeated markup yields one reference per occurrence.
    pub fn extract(&self, body: &str) -> Vec<AssetReference> {
        let mut refs = Vec::new();
        self.extract_embeds(body, &mut refs);
        self.extract_wikilinks(body, &mut refs);
        self.extract_markdown_images(body, &mut refs);
        self.extract_markdown_links(body, &mut refs);
        refs.sort_by_key(|r| r.offset);
        refs
    }

    fn extract_embeds(&self, body: &str, refs: &mut Vec<AssetReference>) {
        if !body.contains("![[") {
            return;
        }
        for caps in EMBED_PATTERN.captures_iter(body) {
            let (Some(full), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let (target, alias) = split_wikilink(inner.as_str());
            if is_external(target) {
                continue;
            }
            let Some(kind) = self.classify(target) else {
                continue;
            };
            let mut reference = AssetReference::new(
                full.as_str(),
                SyntaxKind::ObsidianEmbed,
                kind,
                target,
                full.start(),
            );
            // `![[img.png|300]]` carries a display size, not a caption
            if let Some(alias) = alias.filter(|a| !is_dimension(a)) {
                reference = reference.with_label(alias);
            }
            refs.push(reference);
        }
    }

    fn extract_wikilinks(&self, body: &str, refs: &mut Vec<AssetReference>) {
        if !body.contains("[[") {
            return;
        }
        for caps in WIKILINK_PATTERN.captures_iter(body) {
            let (Some(full), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if preceded_by_bang(body, full.start()) {
                continue;
            }
            let (target, alias) = split_wikilink(inner.as_str());
            if is_external(target) || self.classify(target) != Some(AssetKind::Attachment) {
                continue;
            }
            let mut reference = AssetReference::new(
                full.as_str(),
                SyntaxKind::ObsidianEmbed,
                AssetKind::Attachment,
                target,
                full.start(),
            );
            if let Some(alias) = alias {
                reference = reference.with_label(alias);
            }
            refs.push(reference);
        }
    }

    fn extract_markdown_images(&self, body: &str, refs: &mut Vec<AssetReference>) {
        if !body.contains("](") {
            return;
        }
        for caps in MARKDOWN_IMAGE.captures_iter(body) {
            let Some(full) = caps.get(0) else { continue };
            let Some(path) = link_destination(&caps) else {
                continue;
            };
            if is_external(path) {
                continue;
            }
            let kind = match self.classify(path) {
                Some(AssetKind::Attachment) => AssetKind::Attachment,
                _ => AssetKind::Image,
            };
            let text = caps.name("text").map_or("", |m| m.as_str());
            refs.push(
                AssetReference::new(
                    full.as_str(),
                    SyntaxKind::MarkdownImage,
                    kind,
                    path,
                    full.start(),
                )
                .with_label(text),
            );
        }
    }

    fn extract_markdown_links(&self, body: &str, refs: &mut Vec<AssetReference>) {
        if !body.contains("](") {
            return;
        }
        for caps in MARKDOWN_LINK.captures_iter(body) {
            let Some(full) = caps.get(0) else { continue };
            if preceded_by_bang(body, full.start()) {
                continue;
            }
            let Some(path) = link_destination(&caps) else {
                continue;
            };
            if is_external(path) || self.classify(path) != Some(AssetKind::Attachment) {
                continue;
            }
            let text = caps.name("text").map_or("", |m| m.as_str());
            refs.push(
                AssetReference::new(
                    full.as_str(),
                    SyntaxKind::MarkdownLink,
                    AssetKind::Attachment,
                    path,
                    full.start(),
                )
                .with_label(text),
            );
        }
    }
}

/// Split `target#fragment|alias` into the bare target and the alias
fn split_wikilink(inner: &str) -> (&str, Option<&str>) {
    let (target, alias) = match inner.split_once('|') {
        Some((t, a)) => (t, Some(a.trim())),
        None => (inner, None),
    };
    let target = target.split('#').next().unwrap_or(target).trim();
    (target, alias.filter(|a| !a.is_empty()))
}

/// Destination of a markdown link, angle brackets and `#fragment` removed
fn link_destination<'a>(caps: &regex::Captures<'a>) -> Option<&'a str> {
    let raw = caps.name("angle").or_else(|| caps.name("url"))?.as_str();
    let path = raw.split('#').next().unwrap_or(raw).trim();
    (!path.is_empty()).then_some(path)
}

/// URLs with a scheme are hyperlinks, not vault assets
fn is_external(path: &str) -> bool {
    path.contains("://") || path.starts_with("mailto:") || path.starts_with("data:")
}

fn is_dimension(alias: &str) -> bool {
    !alias.is_empty()
        && alias
            .split('x')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

fn preceded_by_bang(body: &str, start: usize) -> bool {
    start > 0 && body.as_bytes().get(start - 1) == Some(&b'!')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(body: &str) -> Vec<AssetReference> {
        ReferenceExtractor::default().extract(body)
    }

    #[test]
    fn test_obsidian_image_embed() {
        let refs = extract("See ![[img.png]] here");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].raw_markup, "![[img.png]]");
        assert_eq!(refs[0].syntax_kind, SyntaxKind::ObsidianEmbed);
        assert_eq!(refs[0].asset_kind, AssetKind::Image);
        assert_eq!(refs[0].declared_path, "img.png");
        assert_eq!(refs[0].offset, 4);
    }

    #[test]
    fn test_embed_with_folder_and_size() {
        let refs = extract("![[attachments/photo.JPG|300]]");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].declared_path, "attachments/photo.JPG");
        assert_eq!(refs[0].label, None);
    }

    #[test]
    fn test_embedded_pdf_is_attachment() {
        let refs = extract("![[manual.pdf#page=3]]");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].asset_kind, AssetKind::Attachment);
        assert_eq!(refs[0].declared_path, "manual.pdf");
    }

    #[test]
    fn test_note_transclusion_ignored() {
        assert!(extract("![[Other Note]] and ![[Note#Heading]]").is_empty());
    }

    #[test]
    fn test_markdown_image() {
        let refs = extract("Intro ![Diagram](images/arch.svg \"Architecture\") end");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].syntax_kind, SyntaxKind::MarkdownImage);
        assert_eq!(refs[0].declared_path, "images/arch.svg");
        assert_eq!(refs[0].label.as_deref(), Some("Diagram"));
        assert_eq!(
            refs[0].raw_markup,
            "![Diagram](images/arch.svg \"Architecture\")"
        );
    }

    #[test]
    fn test_markdown_image_angle_brackets() {
        let refs = extract("![](<my images/shot 1.png>)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].declared_path, "my images/shot 1.png");
        assert_eq!(refs[0].label, None);
    }

    #[test]
    fn test_wikilink_attachment_with_alias() {
        let refs = extract("Read [[specs/report.docx|the report]] first");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].syntax_kind, SyntaxKind::ObsidianEmbed);
        assert_eq!(refs[0].asset_kind, AssetKind::Attachment);
        assert_eq!(refs[0].declared_path, "specs/report.docx");
        assert_eq!(refs[0].label.as_deref(), Some("the report"));
    }

    #[test]
    fn test_plain_wikilinks_left_alone() {
        assert!(extract("See [[Some Note]] and [[Other|alias]] and [[pic.png]]").is_empty());
    }

    #[test]
    fn test_markdown_link_attachment() {
        let refs = extract("Download [the data](data/sales.CSV) or [docs](guide.md)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].syntax_kind, SyntaxKind::MarkdownLink);
        assert_eq!(refs[0].declared_path, "data/sales.CSV");
        assert_eq!(refs[0].label.as_deref(), Some("the data"));
    }

    #[test]
    fn test_external_urls_excluded() {
        let body = "[site](https://example.com/file.pdf) ![logo](http://cdn.example.com/logo.png) \
                    ![[https://example.com/x.png]]";
        assert!(extract(body).is_empty());
    }

    #[test]
    fn test_order_of_appearance_and_duplicates() {
        let body = "[a](a.pdf)\n![[b.png]]\n![c](c.gif)\n![[b.png]]\n[[d.zip]]";
        let refs = extract(body);
        let paths: Vec<&str> = refs.iter().map(|r| r.declared_path.as_str()).collect();
        assert_eq!(paths, vec!["a.pdf", "b.png", "c.gif", "b.png", "d.zip"]);
        assert_ne!(refs[1].offset, refs[3].offset);
    }

    #[test]
    fn test_extended_extension_sets() {
        let extractor = ReferenceExtractor::new(
            ["tiff".to_string()].into_iter().collect(),
            ["epub".to_string()].into_iter().collect(),
        );
        let refs = extractor.extract("![[scan.tiff]] [[book.epub]] ![[img.png]]");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].asset_kind, AssetKind::Image);
        assert_eq!(refs[1].asset_kind, AssetKind::Attachment);
    }
}
