//! Rewrites asset references to point at their uploaded copies.

use std::collections::HashMap;
use vaultshelf_core::{AssetKind, AssetReference};

/// A reference whose file was uploaded, with the URL it now lives at
#[derive(Debug, Clone, Copy)]
pub struct Replacement<'a> {
    pub reference: &'a AssetReference,
    pub url: &'a str,
}

impl Replacement<'_> {
    /// Markdown that replaces the original reference
    pub fn markup(&self) -> String {
        let label = self.reference.display_label();
        match self.reference.asset_kind {
            AssetKind::Image => format!("![{}]({})", label, self.url),
            AssetKind::Attachment => format!("[{}]({})", label, self.url),
        }
    }
}

/// Replace every literal occurrence of each replacement's raw markup.
///
/// Occurrences are collected up front and substituted in one left-to-right
/// pass, so inserted URLs are never scanned again and repeated markup is
/// replaced at each position. When two raw markups overlap, the one that
/// starts first (then the longer one) wins. References not listed are left
/// exactly as written.
pub fn rewrite_body(body: &str, replacements: &[Replacement<'_>]) -> String {
    let mut markup_for: HashMap<&str, String> = HashMap::new();
    for replacement in replacements {
        markup_for
            .entry(replacement.reference.raw_markup.as_str())
            .or_insert_with(|| replacement.markup());
    }
    if markup_for.is_empty() {
        return body.to_string();
    }

    let mut occurrences: Vec<(usize, &str)> = markup_for
        .keys()
        .copied()
        .filter(|raw| !raw.is_empty())
        .flat_map(|raw| body.match_indices(raw).map(move |(start, _)| (start, raw)))
        .collect();
    occurrences.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())));

    let mut output = String::with_capacity(body.len());
    let mut cursor = 0;
    for (start, raw) in occurrences {
        if start < cursor {
            continue;
        }
        output.push_str(&body[cursor..start]);
        output.push_str(&markup_for[raw]);
        cursor = start + raw.len();
    }
    output.push_str(&body[cursor..]);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReferenceExtractor;

    fn replace_all<'a>(refs: &'a [AssetReference], url: &'a str) -> Vec<Replacement<'a>> {
        refs.iter()
            .map(|reference| Replacement { reference, url })
            .collect()
    }

    #[test]
    fn test_embed_round_trip() {
        let body = "Before ![[img.png]] after";
        let refs = ReferenceExtractor::default().extract(body);
        let out = rewrite_body(body, &replace_all(&refs, "https://docs.example.com/uploads/img.png"));

        assert_eq!(
            out,
            "Before ![img](https://docs.example.com/uploads/img.png) after"
        );
        assert!(!out.contains("![[img.png]]"));
    }

    #[test]
    fn test_attachment_becomes_link() {
        let body = "See [[report.pdf|the report]] and [data](data.csv).";
        let refs = ReferenceExtractor::default().extract(body);
        let replacements = vec![
            Replacement {
                reference: &refs[0],
                url: "https://docs.example.com/attachments/1",
            },
            Replacement {
                reference: &refs[1],
                url: "https://docs.example.com/attachments/2",
            },
        ];
        let out = rewrite_body(body, &replacements);
        assert_eq!(
            out,
            "See [the report](https://docs.example.com/attachments/1) and \
             [data](https://docs.example.com/attachments/2)."
        );
    }

    #[test]
    fn test_repeated_occurrences_all_replaced() {
        let body = "![[a.png]] text ![[a.png]] more ![[a.png]]";
        let refs = ReferenceExtractor::default().extract(body);
        assert_eq!(refs.len(), 3);
        let out = rewrite_body(body, &replace_all(&refs[..1], "u/a"));
        assert_eq!(out, "![a](u/a) text ![a](u/a) more ![a](u/a)");
    }

    #[test]
    fn test_unlisted_references_untouched() {
        let body = "![[ok.png]] and ![[missing.png]]";
        let refs = ReferenceExtractor::default().extract(body);
        let out = rewrite_body(body, &replace_all(&refs[..1], "u/ok"));
        assert_eq!(out, "![ok](u/ok) and ![[missing.png]]");
    }

    #[test]
    fn test_url_containing_markup_not_rescanned() {
        let body = "![[x.png]] ![[y.png]]";
        let refs = ReferenceExtractor::default().extract(body);
        let replacements = vec![
            Replacement {
                reference: &refs[0],
                url: "![[y.png]]",
            },
            Replacement {
                reference: &refs[1],
                url: "u/y",
            },
        ];
        let out = rewrite_body(body, &replacements);
        assert_eq!(out, "![x](![[y.png]]) ![y](u/y)");
    }

    #[test]
    fn test_no_replacements_is_identity() {
        let body = "Nothing ![[here.png]]";
        assert_eq!(rewrite_body(body, &[]), body);
    }
}
