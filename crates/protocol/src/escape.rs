//! Percent-escaping of file names for the `filename*=` parameter.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped in file names, on top of controls and non-ASCII.
const FILENAME: &AsciiSet = &CONTROLS
    .add(b'%')
    .add(b' ')
    .add(b'\'')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'&')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b'?');

/// Escapes `name` for use in `Content-Disposition: attachment; filename*=utf-8''…`.
///
/// Among printable ASCII only `% ' ! " # $ & ( ) * + ?` and space are
/// escaped, the same reserved set the vault's own web client uses.
///
/// This escapes more than that set: control characters and non-ASCII
/// bytes are percent-encoded as UTF-8 too. The web client passes them
/// through raw, which a header value cannot carry.
pub fn escape_filename(name: &str) -> String {
    utf8_percent_encode(name, FILENAME).to_string()
}
