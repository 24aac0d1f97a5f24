//! Requested field selection
//!
//! Selections are written as nested name lists, e.g.
//! `id balance signatures { node_id r }`. Commas are treated as whitespace.

use std::fmt;

use super::errors::{FilterError, FilterResult};

/// One selected field and its sub-selection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldSelection {
    pub name: String,
    pub selection: Vec<FieldSelection>,
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Name(&'a str),
    Open,
    Close,
}

fn tokenize(text: &str) -> FilterResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        let is_name_char = c.is_ascii_alphanumeric() || c == '_';
        if is_name_char {
            if start.is_none() {
                start = Some(i);
            }
            continue;
        }
        if let Some(s) = start.take() {
            tokens.push(Token::Name(&text[s..i]));
        }
        match c {
            '{' => tokens.push(Token::Open),
            '}' => tokens.push(Token::Close),
            ',' => {}
            c if c.is_whitespace() => {}
            other => {
                return Err(FilterError::invalid_selection(format!(
                    "Unexpected character '{}' in selection",
                    other
                )))
            }
        }
    }
    if let Some(s) = start {
        tokens.push(Token::Name(&text[s..]));
    }
    Ok(tokens)
}

impl FieldSelection {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selection: Vec::new(),
        }
    }

    /// Parses a selection text into a list of top-level fields
    pub fn parse(text: &str) -> FilterResult<Vec<FieldSelection>> {
        let tokens = tokenize(text)?;
        let mut pos = 0;
        let fields = Self::parse_list(&tokens, &mut pos)?;
        if pos != tokens.len() {
            return Err(FilterError::invalid_selection("Unbalanced '}' in selection"));
        }
        Ok(fields)
    }

    fn parse_list(tokens: &[Token<'_>], pos: &mut usize) -> FilterResult<Vec<FieldSelection>> {
        let mut fields: Vec<FieldSelection> = Vec::new();
        while let Some(token) = tokens.get(*pos) {
            match token {
                Token::Name(name) => {
                    *pos += 1;
                    let mut field = FieldSelection::leaf(*name);
                    if tokens.get(*pos) == Some(&Token::Open) {
                        *pos += 1;
                        field.selection = Self::parse_list(tokens, pos)?;
                        if tokens.get(*pos) != Some(&Token::Close) {
                            return Err(FilterError::invalid_selection(format!(
                                "Missing '}}' after {}",
                                name
                            )));
                        }
                        *pos += 1;
                    }
                    match fields.iter_mut().find(|f| f.name == field.name) {
                        Some(existing) => existing.merge(&field.selection),
                        None => fields.push(field),
                    }
                }
                Token::Close => return Ok(fields),
                Token::Open => {
                    return Err(FilterError::invalid_selection("Unexpected '{' in selection"))
                }
            }
        }
        Ok(fields)
    }

    /// Merges another sub-selection into this one
    pub fn merge(&mut self, other: &[FieldSelection]) {
        for field in other {
            match self.selection.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => existing.merge(&field.selection),
                None => self.selection.push(field.clone()),
            }
        }
    }

    /// Adds a dotted path (`a.b.c`) to a selection list
    pub fn add_path(selection: &mut Vec<FieldSelection>, path: &str) {
        let mut names = path.split('.').filter(|n| !n.is_empty());
        let Some(first) = names.next() else {
            return;
        };
        let index = match selection.iter().position(|f| f.name == first) {
            Some(i) => i,
            None => {
                selection.push(FieldSelection::leaf(first));
                selection.len() - 1
            }
        };
        let rest: Vec<&str> = names.collect();
        if !rest.is_empty() {
            Self::add_path(&mut selection[index].selection, &rest.join("."));
        }
    }
}

impl fmt::Display for FieldSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.selection.is_empty() {
            write!(f, " {{ {} }}", selection_to_string(&self.selection))?;
        }
        Ok(())
    }
}

/// Canonical text form of a selection list
pub fn selection_to_string(selection: &[FieldSelection]) -> String {
    selection
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
