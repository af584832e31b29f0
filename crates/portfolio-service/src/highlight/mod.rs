//! Syntax highlighting for code blocks in rendered README HTML.
//!
//! Every `<pre>` whose first element child is a non-empty `<code>` is
//! replaced by a highlighted
//! `<pre class="syntax-highlight" data-lang="..."><code>...</code></pre>`
//! rendered with a single dark theme. The theme's background colour is
//! stripped so the page stylesheet controls it. Blocks already carrying the
//! `syntax-highlight` class are left alone.
//!
//! Grammars come from the extended `two-face` set, which adds TypeScript,
//! TOML, Dockerfile and others to syntect's defaults.
//!
//! Highlighting is CPU-bound and synchronous; async callers should run it on
//! the blocking pool.

pub mod language;

use crate::observability::metrics;
use kuchikiki::traits::*;
use kuchikiki::{ElementData, NodeDataRef, NodeRef};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use thiserror::Error;

pub use language::{detect_language, normalize_language, PLAINTEXT};

/// Theme used for every block.
pub const THEME_NAME: &str = "base16-ocean.dark";

/// Class added to each highlighted wrapper.
pub const HIGHLIGHT_CLASS: &str = "syntax-highlight";

/// Puts the parser in the body insertion mode before the fragment starts, so
/// leading comments and whitespace stay in the fragment.
const FRAGMENT_CONTEXT: &str = "<!DOCTYPE html><html><head></head><body>";

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("Highlight theme '{0}' is not bundled")]
    ThemeMissing(&'static str),
}

/// Code block highlighter.
///
/// Holds the bundled grammars and theme, plus a record of the language ids
/// that resolved to a grammar so far. The record only grows, and is bounded
/// by the set of bundled grammars' tokens.
pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
    /// Language id -> grammar name. Ids without a grammar are not recorded.
    resolved: RwLock<HashMap<String, String>>,
}

impl Highlighter {
    /// Load the bundled grammars and the dark theme.
    ///
    /// # Errors
    ///
    /// Returns `HighlightError::ThemeMissing` if the theme is not bundled.
    pub fn new() -> Result<Self, HighlightError> {
        let mut themes = ThemeSet::load_defaults();
        let theme = themes
            .themes
            .remove(THEME_NAME)
            .ok_or(HighlightError::ThemeMissing(THEME_NAME))?;

        Ok(Self {
            syntaxes: two_face::syntax::extra_newlines(),
            theme,
            resolved: RwLock::new(HashMap::new()),
        })
    }

    /// Highlight every eligible code block in `html`.
    ///
    /// Never fails: blocks that cannot be rendered are left as they were, and
    /// all other markup passes through.
    pub fn highlight(&self, html: &str) -> String {
        let document = kuchikiki::parse_html().one(format!("{FRAGMENT_CONTEXT}{html}"));

        // Collect first; replacing while iterating would invalidate the walk.
        let blocks: Vec<NodeDataRef<ElementData>> = match document.select("pre") {
            Ok(selection) => selection.collect(),
            Err(()) => return html.to_string(),
        };

        let mut replaced = 0usize;
        for pre in blocks {
            if self.replace_block(&pre) {
                replaced += 1;
            }
        }

        tracing::debug!(target: "portfolio.highlight", blocks = replaced, "Highlighted code blocks");

        serialize_fragment(&document).unwrap_or_else(|| html.to_string())
    }

    /// Language ids that resolved to a real grammar so far, sorted.
    pub fn loaded_languages(&self) -> Vec<String> {
        let resolved = self.resolved.read().unwrap_or_else(PoisonError::into_inner);
        let mut languages: Vec<String> = resolved.keys().cloned().collect();
        languages.sort_unstable();
        languages
    }

    fn replace_block(&self, pre: &NodeDataRef<ElementData>) -> bool {
        if is_highlighted(pre) {
            return false;
        }

        let Some(code) = first_code_child(pre.as_node()) else {
            return false;
        };

        let text = code.text_contents();
        if text.trim().is_empty() {
            return false;
        }

        let pre_lang = pre.attributes.borrow().get("lang").map(str::to_string);
        let code_class = code
            .as_element()
            .and_then(|element| element.attributes.borrow().get("class").map(str::to_string));
        let requested = detect_language(pre_lang.as_deref(), code_class.as_deref());

        let (syntax, lang) = self.resolve(&requested);

        let rendered = match highlighted_html_for_string(&text, &self.syntaxes, syntax, &self.theme)
        {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(
                    target: "portfolio.highlight",
                    language = %lang,
                    error = %e,
                    "Failed to highlight code block, leaving it unchanged"
                );
                return false;
            }
        };

        let Some(replacement) = wrapper_from_rendered(&rendered, &lang) else {
            tracing::warn!(target: "portfolio.highlight", language = %lang, "Highlighter produced no <pre> wrapper");
            return false;
        };

        let original = pre.as_node();
        original.insert_before(replacement);
        original.detach();

        metrics::record_code_block_highlighted(if lang == PLAINTEXT {
            "plaintext"
        } else {
            "supported"
        });

        true
    }

    /// Grammar for a language id, falling back to plain text.
    ///
    /// Returns the grammar together with the id actually used.
    fn resolve(&self, requested: &str) -> (&SyntaxReference, String) {
        let plain = self.syntaxes.find_syntax_plain_text();
        if requested == PLAINTEXT {
            return (plain, PLAINTEXT.to_string());
        }

        let cached = self
            .resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(requested)
            .and_then(|name| self.syntaxes.find_syntax_by_name(name));
        if let Some(syntax) = cached {
            return (syntax, requested.to_string());
        }

        match self.syntaxes.find_syntax_by_token(requested) {
            Some(syntax) => {
                self.resolved
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(requested.to_string(), syntax.name.clone());
                (syntax, requested.to_string())
            }
            None => {
                tracing::debug!(target: "portfolio.highlight", language = %requested, "No grammar for language, using plaintext");
                (plain, PLAINTEXT.to_string())
            }
        }
    }
}

/// Whether `pre` is the output of an earlier pass.
fn is_highlighted(pre: &NodeDataRef<ElementData>) -> bool {
    pre.attributes
        .borrow()
        .get("class")
        .is_some_and(|class| class.split_whitespace().any(|c| c == HIGHLIGHT_CLASS))
}

/// First element child of `node` named `code`.
fn first_code_child(node: &NodeRef) -> Option<NodeRef> {
    node.children().find(|child| {
        child
            .as_element()
            .is_some_and(|element| &*element.name.local == "code")
    })
}

/// Parse the rendered snippet and prepare its `<pre>` for splicing.
///
/// The highlighted spans are moved into a `<code>` child so the block keeps
/// the `pre > code` shape of the markup it replaces.
fn wrapper_from_rendered(rendered: &str, lang: &str) -> Option<NodeRef> {
    let snippet = kuchikiki::parse_html().one(format!("{FRAGMENT_CONTEXT}{rendered}<code></code>"));
    let pre = snippet.select_first("pre").ok()?;
    let code = snippet.select_first("body > code").ok()?;
    let code = code.as_node().clone();
    code.detach();

    let spans: Vec<NodeRef> = pre.as_node().children().collect();
    for span in spans {
        code.append(span);
    }
    pre.as_node().append(code);

    {
        let mut attributes = pre.attributes.borrow_mut();

        let remaining = attributes
            .get("style")
            .map(strip_background_color)
            .unwrap_or_default();
        if remaining.is_empty() {
            attributes.remove("style");
        } else {
            attributes.insert("style", remaining);
        }

        attributes.insert("class", HIGHLIGHT_CLASS.to_string());
        attributes.insert("data-lang", lang.to_string());
    }

    let node = pre.as_node().clone();
    node.detach();
    Some(node)
}

/// Drop the `background-color` declaration from an inline style.
fn strip_background_color(style: &str) -> String {
    style
        .split(';')
        .map(str::trim)
        .filter(|declaration| !declaration.is_empty())
        .filter(|declaration| {
            declaration
                .split(':')
                .next()
                .is_some_and(|property| property.trim() != "background-color")
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Serialize the children of `<body>`, which hold the whole fragment.
fn serialize_fragment(document: &NodeRef) -> Option<String> {
    let body = document.select_first("body").ok()?;
    let mut out = Vec::new();

    for child in body.as_node().children() {
        child.serialize(&mut out).ok()?;
    }

    String::from_utf8(out).ok()
}
