use std::fmt::{self, Display, Formatter};

use linked_hash_map::LinkedHashMap;

use crate::http::syntax;

// A media type following the `type/subtype; parameter=value` grammar.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MimeType {
    pub kind: String,
    pub subtype: String,
    pub parameters: LinkedHashMap<String, String>,
}

impl MimeType {
    pub fn new(kind: &str, subtype: &str) -> Self {
        MimeType {
            kind: kind.to_string(),
            subtype: subtype.to_string(),
            parameters: LinkedHashMap::new(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        let mut pieces = syntax::split_outside_quotes(raw, ';').into_iter();

        let essence = pieces.next().unwrap_or_default();
        let essence = essence.trim();
        let (kind, subtype) = match essence.find('/') {
            Some(index) => (&essence[..index], &essence[index + 1..]),
            None => (essence, ""),
        };

        let mut mime = MimeType::new(kind.trim(), subtype.trim());
        for piece in pieces {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let (name, value) = syntax::parse_kv(piece);
            mime.parameters.insert(name.to_ascii_lowercase(), value);
        }
        mime
    }

    pub fn empty(&self) -> bool {
        self.kind.is_empty() && self.subtype.is_empty()
    }

    pub fn essence(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }

    // Compares `type/subtype` case-insensitively, ignoring parameters.
    pub fn matches(&self, essence: &str) -> bool {
        self.essence().eq_ignore_ascii_case(essence)
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

impl From<&str> for MimeType {
    fn from(raw: &str) -> Self {
        MimeType::parse(raw)
    }
}

impl Display for MimeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.empty() {
            return Ok(());
        }
        write!(f, "{}", self.essence())?;
        for (name, value) in &self.parameters {
            write!(f, "; {}={}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_type() {
        let mime = MimeType::parse("text/html");
        assert_eq!(mime.kind, "text");
        assert_eq!(mime.subtype, "html");
        assert!(mime.parameters.is_empty());
        assert!(mime.matches("TEXT/HTML"));
    }

    #[test]
    fn parses_parameters() {
        let mime = MimeType::parse("text/html; Charset=UTF-8");
        assert_eq!(mime.parameter("charset"), Some("UTF-8"));
        assert_eq!(mime.to_string(), "text/html; charset=UTF-8");
    }

    #[test]
    fn parses_quoted_boundary() {
        let mime = MimeType::parse(r#"multipart/form-data; boundary="a;b""#);
        assert!(mime.matches("multipart/form-data"));
        assert_eq!(mime.parameter("boundary"), Some("a;b"));
    }

    #[test]
    fn empty_type_formats_empty() {
        assert!(MimeType::default().empty());
        assert_eq!(MimeType::default().to_string(), "");
    }
}
