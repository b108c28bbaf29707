//! Defines the Scope type and parsing/formatting of parameter lists.
use std::collections::BTreeSet;
use std::{cmp, fmt, str};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Scope of a given request or grant, a set of scope-tokens.
///
/// Scopes are interpreted as a conjunction of scope tokens, i.e. a scope is fulfilled if all of
/// its scope tokens are fulfilled.  This induces a partial ordering on scopes where scope `A`
/// is less or equal than scope `B` if all scope tokens of `A` are also found in `B`.
///
/// The tokens keep the order in which they were first inserted, duplicates are collapsed.
/// Equality does not depend on that order.
///
/// ```
/// # use authflow::primitives::scope::Scope;
/// let granted = "some_scope other_scope".parse::<Scope>().unwrap();
/// let required = "some_scope".parse::<Scope>().unwrap();
/// assert!(required <= granted);
/// assert!(required.allow_access(&granted));
/// assert!(!granted.allow_access(&required));
/// ```
///
/// Scope-tokens parsed with `FromStr` are restricted to the following subset of ascii:
///   - The character '!'
///   - The character range '\x23' to '\x5b' which includes numbers and upper case letters
///   - The character range '\x5d' to '\x7e' which includes lower case letters
///
/// Individual scope-tokens are separated by spaces or commas. No token ever contains one of
/// these delimiters, every way of adding values splits them first. Formatting a scope and
/// parsing it again with [`Scope::parse_ordered`] or through serde gives an equal scope.
///
/// [`Scope::parse_ordered`]: #method.parse_ordered
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Scope {
    tokens: IndexSet<String>,
}

/// Error returned from parsing a scope as encoded in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseScopeErr {
    /// A character was encountered which is not allowed to appear in scope strings.
    InvalidCharacter(char),
}

impl Scope {
    /// An empty scope.
    pub fn new() -> Self {
        Scope::default()
    }

    fn invalid_scope_char(ch: char) -> bool {
        match ch {
            '\x21' => false,
            ch if ('\x23'..='\x5b').contains(&ch) => false,
            ch if ('\x5d'..='\x7e').contains(&ch) => false,
            ' ' => false,
            _ => true,
        }
    }

    /// Parse without validating characters, keeping the order of first appearance.
    pub fn parse_ordered(list: &str) -> Scope {
        split_parameter_list(list).collect()
    }

    /// Normalize a candidate collection of scope values.
    ///
    /// A single element containing a space or a comma is a delimited list that was bound as a
    /// whole and is split into its sorted tokens. Elements of any other candidate are split in
    /// place, keeping their order, with duplicates collapsed.
    pub fn normalize<I, S>(candidate: I) -> Scope
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values: Vec<String> = candidate.into_iter().map(Into::into).collect();
        if values.len() == 1 && values[0].contains(|ch: char| ch == ' ' || ch == ',') {
            let single = values.remove(0);
            return parse_parameter_list(&single).into_iter().collect();
        }

        values.into_iter().collect()
    }

    /// Add a value, returning whether any of its tokens was not already present.
    ///
    /// A value containing delimiters adds each of its tokens.
    pub fn insert<S: Into<String>>(&mut self, value: S) -> bool {
        let value = value.into();
        let mut added = false;
        for token in split_parameter_list(&value) {
            added |= self.tokens.insert(token);
        }
        added
    }

    /// Check if a single token is part of the scope.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// The number of distinct tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// If there are no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Determines if this scope has enough privileges to access some resource requiring the scope
    /// on the right side. This operation is equivalent to comparison via `>=`.
    pub fn privileged_to(&self, rhs: &Scope) -> bool {
        rhs <= self
    }

    /// Determines if a resource protected by this scope should allow access to a token with the
    /// grant on the right side. This operation is equivalent to comparison via `<=`.
    pub fn allow_access(&self, rhs: &Scope) -> bool {
        self <= rhs
    }

    /// Create an iterator over the individual scopes, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(AsRef::as_ref)
    }
}

/// Parse a delimited list into a sorted set.
///
/// Tokens are separated by whitespace or commas, empty tokens are dropped. The sorted result
/// makes the comparison of lists independent of the order in which they were submitted.
pub fn parse_parameter_list(list: &str) -> BTreeSet<String> {
    split_parameter_list(list).collect()
}

/// Join a list of values with single spaces.
pub fn format_parameter_list<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    format_delimited(values, ' ')
}

/// Join a list of values with a custom delimiter.
pub fn format_delimited<I, S>(values: I, delimiter: char) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut output = String::new();
    for value in values {
        if !output.is_empty() {
            output.push(delimiter);
        }
        output.push_str(value.as_ref());
    }
    output
}

fn split_parameter_list(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

impl<S: Into<String>> std::iter::FromIterator<S> for Scope {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut scope = Scope::new();
        for value in iter {
            scope.insert(value);
        }
        scope
    }
}

impl str::FromStr for Scope {
    type Err = ParseScopeErr;

    fn from_str(string: &str) -> Result<Scope, ParseScopeErr> {
        if let Some(ch) = string
            .chars()
            .filter(|&ch| ch != ',')
            .find(|&ch| Scope::invalid_scope_char(ch))
        {
            return Err(ParseScopeErr::InvalidCharacter(ch));
        }

        Ok(Scope::parse_ordered(string))
    }
}

impl Serialize for Scope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        Ok(Scope::parse_ordered(&string))
    }
}

impl fmt::Display for ParseScopeErr {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseScopeErr::InvalidCharacter(chr) => {
                write!(fmt, "Encountered invalid character in scope: {}", chr)
            }
        }
    }
}

impl std::error::Error for ParseScopeErr {}

impl fmt::Debug for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_tuple("Scope").field(&self.tokens).finish()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&format_parameter_list(self.iter()))
    }
}

impl PartialOrd for Scope {
    fn partial_cmp(&self, rhs: &Self) -> Option<cmp::Ordering> {
        let intersect_count = self.tokens.intersection(&rhs.tokens).count();
        if intersect_count == self.tokens.len() && intersect_count == rhs.tokens.len() {
            Some(cmp::Ordering::Equal)
        } else if intersect_count == self.tokens.len() {
            Some(cmp::Ordering::Less)
        } else if intersect_count == rhs.tokens.len() {
            Some(cmp::Ordering::Greater)
        } else {
            None
        }
    }
}
