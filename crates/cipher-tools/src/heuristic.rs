//! Local output prediction from literal print statements.
//!
//! Only string literals are understood; anything computed (variables,
//! calls, format arguments) makes the extraction incomplete.

use once_cell::sync::Lazy;
use regex::Regex;

pub const FALLBACK_OUTPUT: &str = "[Local Preview] Basic output simulation active";

struct PrintPattern {
    languages: &'static [&'static str],
    /// Any print statement, literal or not.
    call: Regex,
    /// A print statement whose sole argument is a string literal.
    literal: Regex,
}

static PATTERNS: Lazy<Vec<PrintPattern>> = Lazy::new(|| {
    let specs: [(&[&str], &str, &str); 7] = [
        (
            &["Python"],
            r"\bprint\s*\(",
            r#"\bprint\s*\(\s*(?:"([^"\\]*)"|'([^'\\]*)')\s*\)"#,
        ),
        (
            &["JavaScript", "React.js"],
            r"\bconsole\.log\s*\(",
            r#"\bconsole\.log\s*\(\s*(?:"([^"\\]*)"|'([^'\\]*)')\s*\)"#,
        ),
        (
            &["Java"],
            r"\bSystem\.out\.println\s*\(",
            r#"\bSystem\.out\.println\s*\(\s*"([^"\\]*)"\s*\)"#,
        ),
        (
            &["Go"],
            r"\bfmt\.Println\s*\(",
            r#"\bfmt\.Println\s*\(\s*"([^"\\]*)"\s*\)"#,
        ),
        (
            &["Rust"],
            r"\bprintln!\s*\(",
            r#"\bprintln!\s*\(\s*"([^"\\{}]*)"\s*\)"#,
        ),
        (
            &["C#"],
            r"\bConsole\.WriteLine\s*\(",
            r#"\bConsole\.WriteLine\s*\(\s*"([^"\\]*)"\s*\)"#,
        ),
        (
            &["C++"],
            r"\b(?:std::)?cout\s*<<",
            r#"\b(?:std::)?cout\s*<<\s*"([^"\\]*)"\s*(?:<<\s*(?:std::)?endl\s*)?;"#,
        ),
    ];

    specs
        .into_iter()
        .filter_map(|(languages, call, literal)| {
            match (Regex::new(call), Regex::new(literal)) {
                (Ok(call), Ok(literal)) => Some(PrintPattern {
                    languages,
                    call,
                    literal,
                }),
                (Err(e), _) | (_, Err(e)) => {
                    log::error!("Invalid print pattern for {:?}: {}", languages, e);
                    None
                }
            }
        })
        .collect()
});

/// Literal output lines found in `code`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub lines: Vec<String>,
    /// Every print statement in the file was a literal.
    pub complete: bool,
}

impl Extraction {
    /// The predicted output, only when it accounts for every print.
    pub fn exact(&self) -> Option<String> {
        (self.complete && !self.lines.is_empty()).then(|| self.lines.join("\n"))
    }

    /// Whatever was recognised, for use after the remote call failed.
    pub fn best_effort(&self) -> Option<String> {
        (!self.lines.is_empty()).then(|| self.lines.join("\n"))
    }
}

pub fn extract(language: &str, code: &str) -> Extraction {
    let Some(pattern) = PATTERNS.iter().find(|p| p.languages.contains(&language)) else {
        return Extraction::default();
    };

    let calls = pattern.call.find_iter(code).count();
    let lines: Vec<String> = pattern
        .literal
        .captures_iter(code)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect();

    Extraction {
        complete: calls > 0 && lines.len() == calls,
        lines,
    }
}
