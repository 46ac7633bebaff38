use std::io::BufReader;
use std::time::Duration;

use async_std::fs;
use rustls::internal::pemfile;
use rustls::NoClientAuth;
use serde::Deserialize;

use crate::consts;
use crate::io::socket::ListenAddress;

// Server settings loaded from a YAML file. Everything but the address has a default.
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    pub address: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default)]
    pub keep_alive: bool,

    pub tls: Option<TlsConfig>,
}

#[derive(Clone, Deserialize)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

fn default_timeout_secs() -> u64 {
    consts::MAX_READ_TIMEOUT.as_secs()
}

fn default_max_request_size() -> usize {
    consts::MAX_REQUEST_SIZE
}

fn default_max_body_size() -> usize {
    consts::MAX_BODY_LENGTH
}

impl ServerConfig {
    pub async fn load(path: &str) -> Option<Self> {
        serde_yaml::from_str(&fs::read_to_string(path).await.ok()?).ok()
    }

    pub fn listen_address(&self) -> Option<ListenAddress> {
        ListenAddress::parse(&self.address)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TlsConfig {
    // Builds a rustls server configuration from the PEM certificate chain and private key on
    // disk. Both PKCS#8 and RSA key encodings are accepted.
    pub async fn load_tls(&self) -> Option<rustls::ServerConfig> {
        let certs = fs::read(&self.cert_path).await.ok()?;
        let certs = pemfile::certs(&mut BufReader::new(certs.as_slice())).ok()?;

        let key_data = fs::read(&self.key_path).await.ok()?;
        let key = pemfile::pkcs8_private_keys(&mut BufReader::new(key_data.as_slice()))
            .ok()
            .and_then(|mut keys| if keys.is_empty() { None } else { Some(keys.remove(0)) })
            .or_else(|| {
                pemfile::rsa_private_keys(&mut BufReader::new(key_data.as_slice()))
                    .ok()
                    .and_then(|mut keys| if keys.is_empty() { None } else { Some(keys.remove(0)) })
            })?;

        let mut config = rustls::ServerConfig::new(NoClientAuth::new());
        config.set_single_cert(certs, key).ok()?;
        Some(config)
    }
}
