use crate::consts;
use crate::util;

// An ordered multimap of header fields. Name comparison is ASCII case-insensitive, insertion
// order and duplicates are preserved, and lookups return the first match.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Headers::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries.iter().filter(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    // Appends a field, keeping any existing fields of the same name.
    pub fn append(&mut self, name: &str, value: &str) -> bool {
        if !is_token_string(name) || name.is_empty() || !is_valid_header_value(value) {
            false
        } else {
            self.entries.push((name.to_string(), value.to_string()));
            true
        }
    }

    // Replace-or-append semantics for single-valued fields: all existing fields of this name are
    // dropped first.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        if !is_token_string(name) || name.is_empty() || !is_valid_header_value(value) {
            false
        } else {
            self.erase(name);
            self.entries.push((name.to_string(), value.to_string()));
            true
        }
    }

    // Removes all fields matching `name`.
    pub fn erase(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    // Extends the value of the last field in insertion order, used for folded continuation lines.
    pub(crate) fn extend_last(&mut self, continuation: &str) -> bool {
        match self.entries.last_mut() {
            Some((_, value)) => {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(continuation);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, String)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn is_valid_header_value(value: &str) -> bool {
    value.chars().all(|c| util::is_visible_char(c) || consts::OPTIONAL_WHITESPACE.contains(&c))
}

const TOKEN_CHARS: &str = "!#$%&'*+-.^_`|~";

fn is_token_char(ch: char) -> bool {
    TOKEN_CHARS.contains(ch) || ch.is_ascii_alphanumeric()
}

pub fn is_token_string(str: &str) -> bool {
    str.chars().all(is_token_char)
}
