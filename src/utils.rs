use std::borrow::Cow;

/// Replaces line feeds so a value read from a spreadsheet stays on one log line
pub fn make_single_line(s: &str) -> Cow<'_, str> {
    if s.contains('\n') {
        Cow::Owned(s.replace("\r\n", "↵").replace('\n', "↵"))
    } else {
        Cow::Borrowed(s)
    }
}
