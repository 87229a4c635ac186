//! Placeholder dialects.
//!
//! Statements are always assembled with `?` placeholders. A [`Dialect`] with
//! [`BindType::Dollar`] rewrites them to `$1..$n` in a single scan that leaves
//! quoted text alone.

/// Placeholder spelling understood by the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindType {
    /// `?` positional placeholders (emitted verbatim).
    #[default]
    Question,
    /// `$1`, `$2`, ... numbered placeholders (PostgreSQL).
    Dollar,
}

/// Target SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dialect {
    pub bind_type: BindType,
}

impl Dialect {
    /// `?`-style placeholders.
    pub const QUESTION: Dialect = Dialect {
        bind_type: BindType::Question,
    };

    /// PostgreSQL: `$N` placeholders.
    pub const POSTGRES: Dialect = Dialect {
        bind_type: BindType::Dollar,
    };

    pub fn new(bind_type: BindType) -> Self {
        Self { bind_type }
    }

    /// Rewrite `?` placeholders into this dialect's spelling.
    ///
    /// Copied as-is: `'...'` string literals (including `E'...'` escape
    /// strings), `"..."` quoted identifiers, `$tag$...$tag$` bodies, `--` and
    /// `/* */` comments, and the `?|` and `?&` operators. `??` is an escaped
    /// literal `?` and collapses to a single `?` under `Dollar`.
    pub fn rebind(&self, sql: &str) -> String {
        match self.bind_type {
            BindType::Question => sql.to_string(),
            BindType::Dollar => {
                let mut out = String::with_capacity(sql.len() + 8);
                let mut n = 0usize;
                scan(sql, |tok| match tok {
                    Token::Text(s) => out.push_str(s),
                    Token::Escaped => out.push('?'),
                    Token::Placeholder => {
                        n += 1;
                        out.push('$');
                        out.push_str(&n.to_string());
                    }
                });
                out
            }
        }
    }
}

/// Number of positional `?` placeholders in `sql`, using the same rules as
/// [`Dialect::rebind`].
#[cfg(test)]
pub(crate) fn count_placeholders(sql: &str) -> usize {
    let mut n = 0;
    scan(sql, |tok| {
        if matches!(tok, Token::Placeholder) {
            n += 1;
        }
    });
    n
}

enum Token<'a> {
    Text(&'a str),
    Escaped,
    Placeholder,
}

fn scan<'a>(sql: &'a str, mut emit: impl FnMut(Token<'a>)) {
    let bytes = sql.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                let backslash = quote == b'\'' && is_escape_string(bytes, i);
                // Doubled quotes close and reopen the literal.
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += if backslash && bytes[i] == b'\\' { 2 } else { 1 };
                }
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = find(bytes, i + 2, b"\n").map_or(bytes.len(), |end| end + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = find(bytes, i + 2, b"*/").map_or(bytes.len(), |end| end + 2);
            }
            b'$' => match dollar_tag(bytes, i) {
                Some(tag_len) => {
                    let tag = &bytes[i..i + tag_len];
                    i = find(bytes, i + tag_len, tag).map_or(bytes.len(), |end| end + tag_len);
                }
                None => i += 1,
            },
            b'?' => match bytes.get(i + 1) {
                Some(b'?') => {
                    emit(Token::Text(&sql[start..i]));
                    emit(Token::Escaped);
                    i += 2;
                    start = i;
                }
                Some(b'|') | Some(b'&') => i += 2,
                _ => {
                    emit(Token::Text(&sql[start..i]));
                    emit(Token::Placeholder);
                    i += 1;
                    start = i;
                }
            },
            _ => i += 1,
        }
    }
    if start < sql.len() {
        emit(Token::Text(&sql[start..]));
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// `E'...'`: the quote at `i` follows a lone `E`/`e`, not the end of a longer
/// identifier.
fn is_escape_string(bytes: &[u8], i: usize) -> bool {
    i >= 1
        && matches!(bytes[i - 1], b'E' | b'e')
        && (i < 2 || !is_ident_byte(bytes[i - 2]))
}

/// Length of a `$tag$` opener at `i` (`$$` included). `$1` is not a tag.
fn dollar_tag(bytes: &[u8], i: usize) -> Option<usize> {
    let rest = &bytes[i + 1..];
    if rest.first().is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let ident = rest.iter().take_while(|b| is_ident_byte(**b)).count();
    (rest.get(ident) == Some(&b'$')).then_some(ident + 2)
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
