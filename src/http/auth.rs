use linked_hash_map::LinkedHashMap;

use crate::consts;
use crate::http::headers::is_token_string;
use crate::http::syntax;

// Credentials carried by an Authorization or Proxy-Authorization header. `Basic` payloads are
// decoded into user/password; token schemes keep their `k=v` parameter list. `auth_string` is
// the raw payload either way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Auth {
    pub scheme: String,
    pub user: String,
    pub password: String,
    pub auth_string: String,
    pub realm: String,
    pub parameters: LinkedHashMap<String, String>,
}

impl Auth {
    pub fn basic(user: &str, password: &str) -> Self {
        Auth {
            scheme: consts::H_AUTH_BASIC.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            ..Auth::default()
        }
    }

    pub fn empty(&self) -> bool {
        self.scheme.is_empty()
    }

    pub fn parse(header: &str) -> Auth {
        let header = header.trim();
        let (scheme, payload) = match header.find(' ') {
            Some(index) => (&header[..index], header[index + 1..].trim_start()),
            None => (header, ""),
        };

        let mut auth = Auth {
            scheme: scheme.to_string(),
            auth_string: payload.to_string(),
            ..Auth::default()
        };

        if scheme.eq_ignore_ascii_case(consts::H_AUTH_BASIC) {
            if let Ok(Ok(credentials)) = base64::decode(payload).map(String::from_utf8) {
                let mut parts = credentials.splitn(2, ':');
                auth.user = parts.next().unwrap_or("").to_string();
                auth.password = parts.next().unwrap_or("").to_string();
            }
        } else {
            for piece in syntax::split_outside_quotes(payload, ',') {
                let piece = piece.trim();
                if piece.is_empty() {
                    continue;
                }
                let (name, value) = syntax::parse_kv(piece);
                match name.as_str() {
                    name if name.eq_ignore_ascii_case(consts::H_AUTH_REALM) => auth.realm = value,
                    "username" => {
                        auth.user = value.clone();
                        auth.parameters.insert(name, value);
                    }
                    _ => {
                        auth.parameters.insert(name, value);
                    }
                }
            }
        }
        auth
    }

    // The header value to send these credentials back out with.
    pub fn header_value(&self) -> String {
        if self.scheme.eq_ignore_ascii_case(consts::H_AUTH_BASIC) && !self.user.is_empty() {
            let credentials = format!("{}:{}", self.user, self.password);
            format!("{} {}", self.scheme, base64::encode(credentials))
        } else {
            format!("{} {}", self.scheme, self.auth_string).trim_end().to_string()
        }
    }
}

// One challenge from a WWW-Authenticate or Proxy-Authenticate header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthChallenge {
    pub scheme: String,
    pub realm: String,
    pub parameters: LinkedHashMap<String, String>,
}

impl AuthChallenge {
    pub fn new(scheme: &str, realm: &str) -> Self {
        AuthChallenge {
            scheme: scheme.to_string(),
            realm: realm.to_string(),
            parameters: LinkedHashMap::new(),
        }
    }

    pub fn header_value(&self) -> String {
        let mut params = Vec::new();
        if !self.realm.is_empty() {
            params.push(format!("{}=\"{}\"", consts::H_AUTH_REALM, self.realm));
        }
        for (name, value) in &self.parameters {
            params.push(format!("{}={}", name, value));
        }
        if params.is_empty() {
            self.scheme.clone()
        } else {
            format!("{} {}", self.scheme, params.join(", "))
        }
    }
}

// Parses a challenge list. Groups are separated by commas outside quoted strings; a piece that
// reads as a bare scheme token (optionally followed by its first parameter) opens a new group.
pub fn parse_challenges(header: &str) -> Vec<AuthChallenge> {
    let mut challenges: Vec<AuthChallenge> = Vec::new();

    for piece in syntax::split_outside_quotes(header, ',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }

        let (first, rest) = match piece.find(' ') {
            Some(index) => (&piece[..index], piece[index + 1..].trim_start()),
            None => (piece, ""),
        };

        // `Basic realm="x"` or a lone `Negotiate` start a challenge; `k=v` continues the last.
        let param = if is_token_string(first) && !first.contains('=') && (rest.is_empty() || rest.contains('=')) {
            challenges.push(AuthChallenge::new(first, ""));
            rest
        } else {
            piece
        };

        if param.is_empty() {
            continue;
        }
        if let Some(challenge) = challenges.last_mut() {
            let (name, value) = syntax::parse_kv(param);
            if name.eq_ignore_ascii_case(consts::H_AUTH_REALM) {
                challenge.realm = value;
            } else {
                challenge.parameters.insert(name, value);
            }
        }
    }
    challenges
}
