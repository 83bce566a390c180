//! Pieces shared by the statement builders: placeholder counting, WHERE /
//! ORDER BY / LIMIT rendering, and the single-use builder state machine.

use sea_query::Value;

use crate::config;
use crate::descriptor::EntityDescriptor;
use crate::entity::Entity;
use crate::error::{KeelError, Result};

use super::ident::Dialect;

/// LIMIT rendered when only an OFFSET was requested.
pub(crate) const NO_LIMIT: u64 = i64::MAX as u64;

#[derive(Clone, Copy)]
enum Lexeme {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Blank out the contents of quoted literals, quoted identifiers and
/// comments, one output char per input char.
///
/// Quote delimiters are kept; comment markers are blanked with the comment.
/// Single, double and backtick quotes are recognised. A doubled quote stays
/// inside the literal and a backslash escapes the next character inside
/// `'...'` and `"..."`. Comments are `-- ...` to end of line and `/* ... */`.
pub(crate) fn mask_sql(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut state = Lexeme::Code;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match state {
            Lexeme::Code => match c {
                '\'' | '"' | '`' => {
                    state = Lexeme::Quoted(c);
                    out.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = Lexeme::LineComment;
                    out.push_str("  ");
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = Lexeme::BlockComment;
                    out.push_str("  ");
                }
                _ => out.push(c),
            },
            Lexeme::Quoted(q) => {
                if c == '\\' && q != '`' {
                    out.push(' ');
                    if chars.next().is_some() {
                        out.push(' ');
                    }
                } else if c == q {
                    state = Lexeme::Code;
                    out.push(c);
                } else {
                    out.push(' ');
                }
            }
            Lexeme::LineComment => {
                if c == '\n' {
                    state = Lexeme::Code;
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            Lexeme::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = Lexeme::Code;
                    out.push(' ');
                }
                out.push(' ');
            }
        }
    }
    out
}

/// Count `?` placeholders outside quotes and comments.
pub(crate) fn count_placeholders(template: &str) -> usize {
    mask_sql(template).chars().filter(|&c| c == '?').count()
}

/// Values accepted wherever a template takes bound parameters.
///
/// ```
/// # use keel::{IntoParams, Value};
/// assert!(().into_params().is_empty());
/// assert_eq!([3, 4].into_params(), vec![Value::Int(Some(3)), Value::Int(Some(4))]);
/// ```
pub trait IntoParams {
    fn into_params(self) -> Vec<Value>;
}

impl IntoParams for () {
    fn into_params(self) -> Vec<Value> {
        Vec::new()
    }
}

impl IntoParams for Vec<Value> {
    fn into_params(self) -> Vec<Value> {
        self
    }
}

impl IntoParams for &[Value] {
    fn into_params(self) -> Vec<Value> {
        self.to_vec()
    }
}

impl<V: Into<Value>, const N: usize> IntoParams for [V; N] {
    fn into_params(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

/// WHERE fragments plus ORDER BY, LIMIT and OFFSET.
#[derive(Debug, Default, Clone)]
pub(crate) struct Filtering {
    conditions: Vec<(String, Vec<Value>)>,
    order_by: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
}

impl Filtering {
    pub(crate) fn condition(&mut self, template: &str, params: Vec<Value>) -> Result<()> {
        let expected = count_placeholders(template);
        if expected != params.len() {
            return Err(KeelError::build(format!(
                "condition `{template}` has {expected} placeholder(s) but {} value(s) were bound",
                params.len()
            )));
        }
        self.conditions.push((template.to_string(), params));
        Ok(())
    }

    /// `col = ?` for every identity column.
    pub(crate) fn identity(&mut self, dialect: Dialect, identity: &[(String, Value)]) {
        for (column, value) in identity {
            self.conditions
                .push((format!("{} = ?", dialect.quote(column)), vec![value.clone()]));
        }
    }

    pub(crate) fn order_by(&mut self, fragment: &str) {
        self.order_by.push(fragment.to_string());
    }

    pub(crate) fn render_where(&self, sql: &mut String, params: &mut Vec<Value>) {
        for (i, (template, values)) in self.conditions.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE (" } else { " AND (" });
            sql.push_str(template);
            sql.push(')');
            params.extend(values.iter().cloned());
        }
    }

    pub(crate) fn render_tail(&self, sql: &mut String) {
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT {NO_LIMIT} OFFSET {offset}")),
            (None, None) => {}
        }
    }

    pub(crate) fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        self.render_where(sql, params);
        self.render_tail(sql);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Open,
    RunningHooks,
    Compiled,
}

/// State every builder carries: descriptor, dialect, stage and the first
/// error raised by a chained call.
pub(crate) struct BuilderCore<T: 'static> {
    descriptor: Option<&'static EntityDescriptor<T>>,
    deferred: Option<KeelError>,
    stage: Stage,
    dialect: Dialect,
}

impl<T: Entity> BuilderCore<T> {
    pub(crate) fn new() -> Self {
        let (descriptor, deferred) = match T::descriptor() {
            Ok(descriptor) => (Some(descriptor), None),
            Err(err) => (None, Some(err)),
        };
        Self {
            descriptor,
            deferred,
            stage: Stage::Open,
            dialect: config::settings().dialect,
        }
    }
}

impl<T: 'static> BuilderCore<T> {
    pub(crate) fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub(crate) fn set_dialect(&mut self, dialect: Dialect) {
        if self.mutable("with_dialect") {
            self.dialect = dialect;
        }
    }

    pub(crate) fn descriptor(&self) -> Option<&'static EntityDescriptor<T>> {
        self.descriptor
    }

    /// Keep the first error; later ones are consequences of it.
    pub(crate) fn defer(&mut self, err: KeelError) {
        if self.deferred.is_none() {
            self.deferred = Some(err);
        }
    }

    /// Whether a mutation may proceed. A mutation after compile is recorded.
    pub(crate) fn mutable(&mut self, operation: &str) -> bool {
        if self.stage == Stage::Compiled {
            self.defer(KeelError::build(format!("`{operation}` called on a compiled builder")));
            return false;
        }
        true
    }

    /// Leave the open stage, entering `next`.
    pub(crate) fn begin(&mut self, next: Stage) -> Result<&'static EntityDescriptor<T>> {
        match self.stage {
            Stage::Open => {}
            Stage::RunningHooks => {
                const MESSAGE: &str = "compile called from a before-insert hook";
                self.defer(KeelError::build(MESSAGE));
                return Err(KeelError::build(MESSAGE));
            }
            Stage::Compiled => {
                return Err(self
                    .deferred
                    .take()
                    .unwrap_or_else(|| KeelError::build("builder already compiled; builders are single-use")));
            }
        }
        self.stage = next;
        if next == Stage::Compiled {
            self.take_deferred()?;
        }
        match self.descriptor {
            Some(descriptor) => Ok(descriptor),
            None => Err(self
                .deferred
                .take()
                .unwrap_or_else(|| KeelError::build("entity descriptor unavailable"))),
        }
    }

    pub(crate) fn finish(&mut self) {
        self.stage = Stage::Compiled;
    }

    pub(crate) fn take_deferred(&mut self) -> Result<()> {
        match self.deferred.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
