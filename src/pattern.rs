//! Filename templates with numeric placeholders
//!
//! A template such as `tile_{iii}.tif` names one tile per index. The
//! placeholder is a run of a single letter wrapped in braces; its length is
//! the zero-padded width of the substituted number:
//!
//! | Template | Letter | Value | Result |
//! |----------|--------|-------|--------|
//! | `tile_{iii}.tif` | `i` | 7 | `tile_007.tif` |
//! | `tile_{iii}.tif` | `i` | 12345 | `tile_12345.tif` |
//! | `r{yy}_c{xx}.tif` | `x` | 3 | `r{yy}_c03.tif` |
//! | `plain.tif` | `i` | 7 | `plain.tif` |

/// Placeholder letter for the sequential index used by traversal layouts.
pub const INDEX_PLACEHOLDER: char = 'i';

/// Placeholder letter for the column of a fixed-position layout.
pub const COLUMN_PLACEHOLDER: char = 'x';

/// Placeholder letter for the row of a fixed-position layout.
pub const ROW_PLACEHOLDER: char = 'y';

/// A located `{ll..l}` run inside a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// The full bracketed token, e.g. `{iii}`.
    pub token: String,
    /// Number of placeholder letters, i.e. the zero-padded width.
    pub width: usize,
}

/// Find the first `{<letter>...<letter>}` run in a template.
///
/// Returns `None` when the template has no such run, or when the text
/// between the braces contains anything other than the letter.
pub fn find_placeholder(template: &str, letter: char) -> Option<Placeholder> {
    let open = format!("{{{}", letter);
    let close = format!("{}}}", letter);

    let start = template.find(&open)?;
    let end = start + template[start..].find(&close)? + close.len();

    let token = &template[start..end];
    let inner = &token[1..token.len() - 1];
    if inner.is_empty() || inner.chars().any(|c| c != letter) {
        return None;
    }

    Some(Placeholder { token: token.to_string(), width: inner.chars().count() })
}

/// Render `value` left-padded with zeros to `width` digits. Never truncates.
pub fn zero_pad(value: u64, width: usize) -> String {
    format!("{:0width$}", value, width = width)
}

/// Expand the `letter` placeholder of `template` with `value`.
///
/// Every occurrence of the located token is replaced, so a template may
/// repeat the same placeholder (e.g. `{ii}/{ii}.tif`). A template without a
/// placeholder for `letter` is returned unchanged.
pub fn expand(template: &str, letter: char, value: u64) -> String {
    match find_placeholder(template, letter) {
        Some(placeholder) => template.replace(&placeholder.token, &zero_pad(value, placeholder.width)),
        None => template.to_string(),
    }
}

/// Expand a fixed-position template with its column and row values.
pub fn expand_xy(template: &str, x: u64, y: u64) -> String {
    let with_x = expand(template, COLUMN_PLACEHOLDER, x);
    expand(&with_x, ROW_PLACEHOLDER, y)
}
