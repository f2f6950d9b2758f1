//! Share slugs: short public identifiers that resolve to a document.

use rand::{RngCore, rngs::OsRng};
use regex::Regex;
use std::sync::LazyLock;

const SLUG_MIN_LEN: usize = 3;
const SLUG_MAX_LEN: usize = 40;

static SLUG_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("static regex"));
static NON_ALNUM_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// Normalize user input into a URL-safe slug.
///
/// Lowercases, turns every run of characters outside `[a-z0-9]` (including
/// `_` and whitespace) into a single dash and trims dashes at both ends.
/// Returns the normalized slug and whether it is acceptable as a share slug.
pub fn sanitize(input: &str) -> (String, bool) {
    let lowered = input.trim().to_lowercase();
    let dashed = NON_ALNUM_RUN.replace_all(&lowered, "-");
    let slug = dashed.trim_matches('-').to_string();

    let valid = (SLUG_MIN_LEN..=SLUG_MAX_LEN).contains(&slug.len()) && SLUG_SHAPE.is_match(&slug);
    (slug, valid)
}

/// Generate a random share slug of the form `xxxx-xxxxxx` from the OS CSPRNG.
pub fn generate() -> String {
    let mut buf = [0u8; 5];
    OsRng.fill_bytes(&mut buf);
    format!("{}-{}", to_hex(&buf[..2]), to_hex(&buf[2..]))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
