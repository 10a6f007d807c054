//! Whitespace normalization shared by every extractor.
//!
//! All formats converge here: the output has `\n` line endings only, no
//! blank lines, no leading or trailing whitespace on any line, and no runs
//! of interior spaces. Normalizing clean text is a no-op.

/// Normalize raw extracted text into canonical clean text.
///
/// Never fails; empty or whitespace-only input yields an empty string.
///
/// ```
/// assert_eq!(dyslexify::normalize::normalize("  a   b  \n\n  c \n"), "a b\nc");
/// ```
pub fn normalize(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    let joined = unified
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    collapse_spaces(&joined).trim().to_string()
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !prev_space {
                out.push(c);
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out
}
