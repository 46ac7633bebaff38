use std::fmt::{self, Display, Formatter};

// A protocol name plus version, e.g. `HTTP/1.1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Protocol {
    pub name: String,
    pub major: u8,
    pub minor: u8,
}

impl Protocol {
    pub fn new(name: &str, major: u8, minor: u8) -> Self {
        Protocol { name: name.to_string(), major, minor }
    }

    pub fn http_1_0() -> Self {
        Protocol::new("HTTP", 1, 0)
    }

    pub fn http_1_1() -> Self {
        Protocol::new("HTTP", 1, 1)
    }

    // Parses `NAME/<d>.<d>`.
    pub fn parse(raw: &str) -> Option<Self> {
        let slash = raw.find('/')?;
        let (name, version) = (&raw[..slash], &raw[slash + 1..]);

        let mut digits = version.splitn(2, '.');
        let major = digits.next()?;
        let minor = digits.next()?;
        if name.is_empty() || major.len() != 1 || minor.len() != 1 {
            return None;
        }

        Some(Protocol {
            name: name.to_string(),
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }

    pub fn is_http(&self) -> bool {
        self.name == "HTTP"
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::http_1_1()
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.name, self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats() {
        assert_eq!(Protocol::parse("HTTP/1.1"), Some(Protocol::http_1_1()));
        assert_eq!(Protocol::parse("HTTP/1.0"), Some(Protocol::http_1_0()));
        assert_eq!(Protocol::http_1_1().to_string(), "HTTP/1.1");
    }

    #[test]
    fn rejects_malformed_versions() {
        assert_eq!(Protocol::parse("HTTP"), None);
        assert_eq!(Protocol::parse("HTTP/11"), None);
        assert_eq!(Protocol::parse("HTTP/1.1.1"), None);
        assert_eq!(Protocol::parse("/1.1"), None);
        assert_eq!(Protocol::parse("HTTP/a.b"), None);
    }
}
