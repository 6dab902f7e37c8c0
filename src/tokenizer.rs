//! Splitting of raw input lines into argument vectors.
//!
//! There is no quoting, escaping or substitution: a token is a maximal run of
//! characters that are not delimiters, so a token can never contain whitespace.

/// Characters that separate tokens: space, tab, carriage return, newline and bell.
pub const DELIMITERS: [char; 5] = [' ', '\t', '\r', '\n', '\x07'];

/// An owned, ordered argument vector produced from one input line.
///
/// The first element (if any) is the command name. The vector owns copies of
/// its tokens, so the line it was built from can be dropped or reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Argv {
    tokens: Vec<String>,
}

impl Argv {
    /// Build an argument vector from already separated tokens.
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    /// The command name, or `None` for an empty line.
    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// Everything after the command name.
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_inner(self) -> Vec<String> {
        self.tokens
    }
}

impl<S: Into<String>> FromIterator<S> for Argv {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Split `line` into an [`Argv`], skipping runs of delimiters.
pub fn split_line(line: &str) -> Argv {
    line.split(DELIMITERS)
        .filter(|token| !token.is_empty())
        .collect()
}
