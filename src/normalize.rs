use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Canonicalizes a vendor display name into the key used to match document filenames
///
/// Diacritics are stripped (compatibility decomposition, then everything outside
/// ASCII is dropped), all whitespace is removed and the result is upper-cased.
pub fn normalize(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii)
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
