//! Target descriptors: one database endpoint to check.
//!
//! A descriptor is an immutable value. Its identity for labeling is the
//! (host, port, name) triple; duplicates are not collapsed anywhere, two
//! identical descriptors are simply probed twice.

use crate::tls::TlsMaterial;
use serde::Serialize;
use std::fmt;

/// Database family behind a target, selects the probe implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    MySql,
    MongoDb,
}

impl DatabaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::MySql => "mysql",
            DatabaseKind::MongoDb => "mongodb",
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

// Never print the password, descriptors end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Labeling identity of a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TargetId {
    pub host: String,
    pub port: u16,
    pub name: String,
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}/{}]", self.host, self.port, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct TargetDescriptor {
    pub kind: DatabaseKind,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub credentials: Credentials,
    /// Driver-native connection string, set for targets configured from one (MongoDB).
    pub uri: Option<String>,
    pub tls: Option<TlsMaterial>,
}

impl TargetDescriptor {
    pub fn mysql(
        host: impl Into<String>,
        port: u16,
        name: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            kind: DatabaseKind::MySql,
            host: host.into(),
            port,
            name: name.into(),
            credentials: Credentials { user: user.into(), password: password.into() },
            uri: None,
            tls: None,
        }
    }

    pub fn with_tls(mut self, tls: TlsMaterial) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn id(&self) -> TargetId {
        TargetId {
            host: self.host.clone(),
            port: self.port,
            name: self.name.clone(),
        }
    }

    /// `user@host:port/name`, the form used when listing discovered targets.
    pub fn display_dsn(&self) -> String {
        format!("{}@{}:{}/{}", self.credentials.user, self.host, self.port, self.name)
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}/{}]", self.host, self.port, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_and_display() {
        let target = TargetDescriptor::mysql("db.local", 3306, "app", "root", "secret");
        assert_eq!(target.to_string(), "[db.local:3306/app]");
        assert_eq!(target.id().to_string(), "[db.local:3306/app]");
        assert_eq!(target.display_dsn(), "root@db.local:3306/app");
    }

    #[test]
    fn test_debug_hides_password() {
        let target = TargetDescriptor::mysql("db.local", 3306, "app", "root", "secret");
        let debug = format!("{:?}", target);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("root"));
    }
}
