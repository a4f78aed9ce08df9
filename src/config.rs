use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use pgwire::tokio::TlsAcceptor;
use pgwire::tokio::tokio_rustls::rustls::ServerConfig;

use crate::catalog::{CatalogError, ServiceCatalog};
use crate::limits::MIN_SLOT_MINUTES;
use crate::model::Schedule;

/// Process configuration, read once from `SLOTBOOK_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub password: String,
    /// `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub max_connections: usize,
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub schedule: Schedule,
    pub services_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        let schedule = Schedule {
            open_hour: parse_or(&get, "SLOTBOOK_OPEN_HOUR", 8)?,
            close_hour: parse_or(&get, "SLOTBOOK_CLOSE_HOUR", 18)?,
            slot_minutes: parse_or(&get, "SLOTBOOK_SLOT_MINUTES", 30)?,
        };
        validate_schedule(&schedule)?;

        let tls_cert = get("SLOTBOOK_TLS_CERT").map(PathBuf::from);
        let tls_key = get("SLOTBOOK_TLS_KEY").map(PathBuf::from);
        if tls_cert.is_some() != tls_key.is_some() {
            return Err(ConfigError::Invalid {
                key: "SLOTBOOK_TLS_CERT",
                reason: "SLOTBOOK_TLS_CERT and SLOTBOOK_TLS_KEY must be set together".into(),
            });
        }

        let max_connections = parse_or(&get, "SLOTBOOK_MAX_CONNECTIONS", 256usize)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "SLOTBOOK_MAX_CONNECTIONS",
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            bind: get("SLOTBOOK_BIND").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "SLOTBOOK_PORT", 5433)?,
            password: get("SLOTBOOK_PASSWORD").unwrap_or_else(|| "slotbook".into()),
            data_dir: get("SLOTBOOK_DATA_DIR").map(PathBuf::from),
            max_connections,
            compact_threshold: parse_or(&get, "SLOTBOOK_COMPACT_THRESHOLD", 1000)?,
            metrics_port: get("SLOTBOOK_METRICS_PORT")
                .map(|v| parse_value("SLOTBOOK_METRICS_PORT", &v))
                .transpose()?,
            tls_cert,
            tls_key,
            schedule,
            services_path: get("SLOTBOOK_SERVICES").map(PathBuf::from),
        })
    }

    pub fn catalog(&self) -> Result<ServiceCatalog, ConfigError> {
        match &self.services_path {
            Some(path) => ServiceCatalog::load(path).map_err(ConfigError::Catalog),
            None => Ok(ServiceCatalog::default()),
        }
    }

    /// TLS acceptor for the wire listener, or `None` when TLS is not configured.
    pub fn tls_acceptor(&self) -> Result<Option<TlsAcceptor>, ConfigError> {
        let (Some(cert_path), Some(key_path)) = (&self.tls_cert, &self.tls_key) else {
            return Ok(None);
        };
        let tls_err = |reason: String| ConfigError::Invalid {
            key: "SLOTBOOK_TLS_CERT",
            reason,
        };

        let cert_file = File::open(cert_path)
            .map_err(|e| tls_err(format!("{}: {e}", cert_path.display())))?;
        let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(cert_file))
            .collect::<Result<_, _>>()
            .map_err(|e| tls_err(format!("bad certificate: {e}")))?;

        let key_file = File::open(key_path)
            .map_err(|e| tls_err(format!("{}: {e}", key_path.display())))?;
        let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
            .map_err(|e| tls_err(format!("bad private key: {e}")))?
            .ok_or_else(|| tls_err("no private key found in key file".into()))?;

        let mut server = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| tls_err(e.to_string()))?;
        server.alpn_protocols = vec![b"postgresql".to_vec()];

        Ok(Some(TlsAcceptor::from(Arc::new(server))))
    }
}

fn validate_schedule(s: &Schedule) -> Result<(), ConfigError> {
    if s.close_hour > 24 {
        return Err(ConfigError::Invalid {
            key: "SLOTBOOK_CLOSE_HOUR",
            reason: "must be at most 24".into(),
        });
    }
    if s.open_hour >= s.close_hour {
        return Err(ConfigError::Invalid {
            key: "SLOTBOOK_OPEN_HOUR",
            reason: format!("open hour {} is not before close hour {}", s.open_hour, s.close_hour),
        });
    }
    let open_minutes = (s.close_hour - s.open_hour) * 60;
    if s.slot_minutes < MIN_SLOT_MINUTES || s.slot_minutes > open_minutes {
        return Err(ConfigError::Invalid {
            key: "SLOTBOOK_SLOT_MINUTES",
            reason: format!("must be between {MIN_SLOT_MINUTES} and {open_minutes}"),
        });
    }
    Ok(())
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&'static str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match get(key) {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: format!("{raw:?}: {e}"),
    })
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid { key: &'static str, reason: String },
    Catalog(CatalogError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, reason } => write!(f, "invalid {key}: {reason}"),
            ConfigError::Catalog(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
