//! Identifier quoting

use regex::Regex;
use std::sync::LazyLock;

static BARE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z_0-9]*$").expect("valid identifier regex"));

/// Quote a table identifier: bare when it is a plain name, backticked otherwise
pub fn quote_identifier(name: &str) -> String {
    if BARE_IDENTIFIER.is_match(name) {
        name.to_string()
    } else {
        bqsql_registry::helpers::backtick_quote(name)
    }
}
