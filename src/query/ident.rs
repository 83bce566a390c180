//! Identifier quoting.

use serde::Deserialize;

/// SQL flavour used when quoting identifiers and rendering empty inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Backtick quoting, `INSERT INTO t () VALUES ()`
    #[default]
    MySql,
    /// Double-quote quoting, `INSERT INTO t DEFAULT VALUES`
    Ansi,
}

impl Dialect {
    pub fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Ansi => '"',
        }
    }

    /// Quote `ident` as a single identifier, doubling any embedded quote character.
    ///
    /// The input is not split on `.`; quote each part of a qualified name separately.
    pub fn quote(self, ident: &str) -> String {
        let q = self.quote_char();
        let mut out = String::with_capacity(ident.len() + 2);
        out.push(q);
        for c in ident.chars() {
            if c == q {
                out.push(q);
            }
            out.push(c);
        }
        out.push(q);
        out
    }
}

/// Quote an identifier for MySQL-flavoured SQL.
///
/// # Examples
///
/// ```
/// assert_eq!(keel::quote_identifier("member"), "`member`");
/// assert_eq!(keel::quote_identifier("odd`name"), "`odd``name`");
/// ```
pub fn quote_identifier(ident: &str) -> String {
    Dialect::MySql.quote(ident)
}
