//! Language detection for README code blocks.
//!
//! GitHub renders fenced code in a handful of shapes:
//!
//! ```text
//! <pre lang="rust"><code>...</code></pre>
//! <pre><code class="language-rust">...</code></pre>
//! <div class="highlight highlight-source-rust"><pre>...</pre></div>
//! <pre><code class="highlight highlight-source-python notranslate">...</code></pre>
//! ```
//!
//! Only the attributes of the `<pre>` and its `<code>` child are consulted.

/// Identifier used when no usable language hint exists.
pub const PLAINTEXT: &str = "plaintext";

/// Class prefixes that carry a language hint, in precedence order.
const CLASS_PREFIXES: [&str; 3] = ["language-", "highlight-source-", "highlight-"];

/// Pick the language for a code block.
///
/// `<pre lang>` wins over any class hint. Otherwise the first class on
/// `<code>` with a known prefix and a non-empty remainder is used.
pub fn detect_language(pre_lang: Option<&str>, code_class: Option<&str>) -> String {
    if let Some(lang) = pre_lang.filter(|lang| !lang.trim().is_empty()) {
        return normalize_language(lang);
    }

    code_class
        .into_iter()
        .flat_map(str::split_whitespace)
        .find_map(class_language)
        .map(normalize_language)
        .unwrap_or_else(|| PLAINTEXT.to_string())
}

fn class_language(class: &str) -> Option<&str> {
    CLASS_PREFIXES
        .iter()
        .filter_map(|prefix| class.strip_prefix(prefix))
        .find(|rest| !rest.is_empty())
}

/// Lowercase, drop a `source-` prefix, and fold common aliases.
///
/// An id that normalizes to nothing is treated as plaintext.
pub fn normalize_language(lang: &str) -> String {
    let lower = lang.trim().to_lowercase();
    let id = lower.strip_prefix("source-").unwrap_or(&lower);

    match id {
        "" => PLAINTEXT.to_string(),
        "sh" | "zsh" | "shell" => "bash".to_string(),
        "yml" => "yaml".to_string(),
        other => other.to_string(),
    }
}
