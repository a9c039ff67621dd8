//! Transport-security material for MySQL targets.
//!
//! Trust bundles are read through an explicit [`FileReader`] so tests can
//! substitute the filesystem without touching process-wide state.
//!
//! Peer-name verification is OFF by default: the chain is validated against
//! the supplied bundle but the server hostname is not matched. Deployments
//! on private networks rely on this; set [`TlsPolicy::verify_hostname`] to
//! restore full verification.

use crate::error::{ConfigError, ProbeError};
use mysql_async::SslOpts;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// Source of file contents, injected wherever trust material is loaded.
pub trait FileReader: Send + Sync {
    fn read_file(&self, path: &str) -> std::io::Result<Vec<u8>>;
}

/// Production reader backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileReader;

impl FileReader for OsFileReader {
    fn read_file(&self, path: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TlsPolicy {
    pub verify_hostname: bool,
}

/// Validated PEM trust bundle plus the verification policy to apply.
#[derive(Clone)]
pub struct TlsMaterial {
    pem: Arc<[u8]>,
    certificates: usize,
    policy: TlsPolicy,
}

impl TlsMaterial {
    /// Parses a PEM bundle. Blocks that fail to parse are skipped, but at
    /// least one certificate must survive.
    pub fn from_pem(bytes: &[u8], policy: TlsPolicy) -> Result<Self, ProbeError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ProbeError::SecurityConfig(format!("CA bundle is not valid PEM text: {}", e)))?;

        let mut accepted = String::new();
        let mut certificates = 0;
        let mut rest = text;
        while let Some(start) = rest.find(PEM_BEGIN) {
            let Some(len) = rest[start..].find(PEM_END) else { break };
            let end = start + len + PEM_END.len();
            let block = &rest[start..end];
            match native_tls::Certificate::from_pem(block.as_bytes()) {
                Ok(_) => {
                    accepted.push_str(block);
                    accepted.push('\n');
                    certificates += 1;
                }
                Err(e) => debug!("skipping unparseable certificate block: {}", e),
            }
            rest = &rest[end..];
        }

        if certificates == 0 {
            return Err(ProbeError::SecurityConfig("error appending CA cert: no certificate found".into()));
        }

        Ok(Self {
            pem: Arc::from(accepted.into_bytes()),
            certificates,
            policy,
        })
    }

    /// Reads and validates the bundle at `path`. Called once per descriptor.
    pub fn load(path: &str, reader: &dyn FileReader, policy: TlsPolicy) -> Result<Self, ConfigError> {
        let bytes = reader.read_file(path).map_err(|source| ConfigError::CaFileRead {
            path: path.to_string(),
            source,
        })?;
        Ok(Self::from_pem(&bytes, policy)?)
    }

    pub fn certificate_count(&self) -> usize {
        self.certificates
    }

    pub fn policy(&self) -> TlsPolicy {
        self.policy
    }

    /// SSL options for a dedicated `mysql_async` connection. The bundle
    /// replaces the built-in roots.
    pub fn mysql_ssl_opts(&self) -> SslOpts {
        SslOpts::default()
            .with_root_certs(vec![self.pem.to_vec().into()])
            .with_disable_built_in_roots(true)
            .with_danger_skip_domain_validation(!self.policy.verify_hostname)
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("certificates", &self.certificates)
            .field("policy", &self.policy)
            .finish()
    }
}
