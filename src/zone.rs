//! The authoritative-zone aggregate.
//!
//! A [`Zone`] is the unit every control-plane operation mutates: ownership
//! handles, lifecycle status, TSIG connections for UPDATE and AXFR, and an
//! ACL for shared access. Construction goes through [`Zone::build`], which
//! validates every raw field independently and returns the full list of
//! problems rather than the first one. All mutation is copy-on-write; a
//! constructed value never changes in place.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hickory_proto::rr::RecordType;
use regex::Regex;
use std::fmt;
use uuid::Uuid;

use crate::crypto::CryptoAlgebra;
use crate::error::Error;
use crate::validation::{self, ValidationError};

/// Lifecycle status of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStatus {
    /// Zone is live and serving changes.
    Active,
    /// Zone has been deleted.
    Deleted,
    /// An update is being applied to the backend.
    PendingUpdate,
    /// A delete is being applied to the backend.
    PendingDelete,
    /// A zone transfer from the backend is in flight.
    Syncing,
}

/// Access granted to a user or group by an ACL rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    /// Explicitly no access.
    NoAccess,
    /// Read-only access to record sets.
    Read,
    /// Create and update record sets.
    Write,
    /// Write access plus record-set deletion.
    Delete,
}

/// A single ACL rule granting access to records in a shared zone.
///
/// A rule applies to one user, one group, or (when neither is set) all
/// authenticated callers. `record_mask` narrows the rule to record names
/// matching the given regex; `record_types` narrows it to the listed types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AclRule {
    /// Access level this rule grants.
    pub access_level: AccessLevel,
    /// Free-form note for administrators.
    pub description: Option<String>,
    /// User the rule applies to.
    pub user_id: Option<String>,
    /// Group the rule applies to.
    pub group_id: Option<String>,
    /// Regex over record names the rule covers; absent means all names.
    pub record_mask: Option<String>,
    /// Record types the rule covers; empty means all types.
    pub record_types: Vec<RecordType>,
}

impl AclRule {
    fn validate(&self, field: &str) -> Result<(), ValidationError> {
        if self.user_id.is_some() && self.group_id.is_some() {
            return Err(ValidationError::new(
                field,
                "rule may name a user or a group, not both",
            ));
        }
        if let Some(mask) = &self.record_mask {
            if Regex::new(mask).is_err() {
                return Err(ValidationError::new(
                    field,
                    format!("record mask \"{mask}\" is not a valid regex"),
                ));
            }
        }
        Ok(())
    }
}

/// The set of ACL rules attached to a zone.
///
/// Behaves as a set under rule value identity while preserving insertion
/// order. Additions and deletions return new values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneAcl {
    rules: Vec<AclRule>,
}

impl ZoneAcl {
    /// Builds an ACL, validating every rule independently.
    pub fn build(rules: Vec<AclRule>) -> Result<Self, Vec<ValidationError>> {
        let errors: Vec<ValidationError> = rules
            .iter()
            .enumerate()
            .filter_map(|(i, rule)| rule.validate(&format!("acl.rules[{i}]")).err())
            .collect();
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut acl = Self::default();
        for rule in rules {
            if !acl.rules.contains(&rule) {
                acl.rules.push(rule);
            }
        }
        Ok(acl)
    }

    /// The rules in insertion order.
    pub fn rules(&self) -> &[AclRule] {
        &self.rules
    }

    /// Returns true if an equal rule is present.
    pub fn contains(&self, rule: &AclRule) -> bool {
        self.rules.contains(rule)
    }

    /// Returns a new ACL with the rule added; a no-op if already present.
    #[must_use]
    pub fn add_rule(&self, rule: AclRule) -> Self {
        if self.contains(&rule) {
            return self.clone();
        }
        let mut rules = self.rules.clone();
        rules.push(rule);
        Self { rules }
    }

    /// Returns a new ACL with the rule removed; a no-op if absent.
    #[must_use]
    pub fn delete_rule(&self, rule: &AclRule) -> Self {
        Self {
            rules: self
                .rules
                .iter()
                .filter(|r| *r != rule)
                .cloned()
                .collect(),
        }
    }
}

/// TSIG connection to a backend nameserver.
///
/// `key` holds the TSIG secret. It arrives in plaintext from the caller, is
/// transitioned to its stored form with [`ZoneConnection::encrypted`] before
/// persistence, and back with [`ZoneConnection::decrypted`] only at the
/// moment a signed DNS message is built. The two forms are distinguished by
/// lifecycle, not type.
#[derive(Clone, PartialEq, Eq)]
pub struct ZoneConnection {
    /// Display name of the connection.
    pub name: String,
    /// TSIG key name as known to the backend.
    pub key_name: String,
    /// TSIG secret, plaintext or stored form depending on lifecycle stage.
    pub key: String,
    /// Backend nameserver as `host[:port]`.
    pub primary_server: String,
}

impl ZoneConnection {
    /// Creates a connection from raw fields without validating them; the
    /// zone builder validates connections in context.
    pub fn new(
        name: impl Into<String>,
        key_name: impl Into<String>,
        key: impl Into<String>,
        primary_server: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            key_name: key_name.into(),
            key: key.into(),
            primary_server: primary_server.into(),
        }
    }

    fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if let Err(e) = validation::check_length(&format!("{prefix}.name"), &self.name, 1, 255) {
            errors.push(e);
        }
        if let Err(e) = validation::check_present(&format!("{prefix}.key_name"), &self.key_name) {
            errors.push(e);
        }
        if let Err(e) = validation::check_present(&format!("{prefix}.key"), &self.key) {
            errors.push(e);
        }
        if let Err(e) =
            validation::check_host_port(&format!("{prefix}.primary_server"), &self.primary_server)
        {
            errors.push(e);
        }
        errors
    }

    /// Returns a copy with the key replaced by its encrypted form.
    pub fn encrypted(&self, crypto: &dyn CryptoAlgebra) -> Result<Self, Error> {
        Ok(Self {
            key: crypto.encrypt(&self.key)?,
            ..self.clone()
        })
    }

    /// Returns a copy with the key replaced by its decrypted form.
    pub fn decrypted(&self, crypto: &dyn CryptoAlgebra) -> Result<Self, Error> {
        Ok(Self {
            key: crypto.decrypt(&self.key)?,
            ..self.clone()
        })
    }
}

// Key material must not reach logs or error output.
impl fmt::Debug for ZoneConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneConnection")
            .field("name", &self.name)
            .field("key_name", &self.key_name)
            .field("key", &"<redacted>")
            .field("primary_server", &self.primary_server)
            .finish()
    }
}

/// Raw fields for building a zone.
#[derive(Debug, Clone, Default)]
pub struct ZoneRequest {
    /// Fully qualified zone name.
    pub name: String,
    /// Zone administrator contact address.
    pub email: String,
    /// Group that administers the zone.
    pub admin_group_id: String,
    /// Owning account; defaults to `"system"`.
    pub account: Option<String>,
    /// Whether ACL rules may grant non-owner access.
    pub shared: bool,
    /// TSIG connection used for DNS UPDATE.
    pub connection: Option<ZoneConnection>,
    /// TSIG connection used for zone transfer.
    pub transfer_connection: Option<ZoneConnection>,
    /// Initial ACL rules.
    pub acl_rules: Vec<AclRule>,
}

/// The authoritative-zone aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Unique identifier, assigned at build time, immutable.
    pub id: String,
    /// Fully qualified zone name with trailing dot.
    pub name: String,
    /// Zone administrator contact address.
    pub email: String,
    /// Lifecycle status.
    pub status: ZoneStatus,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Last modification time.
    pub updated: Option<DateTime<Utc>>,
    /// Completion time of the most recent backend sync.
    pub latest_sync: Option<DateTime<Utc>>,
    /// TSIG connection used for DNS UPDATE.
    pub connection: Option<ZoneConnection>,
    /// TSIG connection used for zone transfer.
    pub transfer_connection: Option<ZoneConnection>,
    /// Owning account.
    pub account: String,
    /// Group that administers the zone.
    pub admin_group_id: String,
    /// Whether ACL rules may grant non-owner access.
    pub shared: bool,
    /// Access rules for shared zones.
    pub acl: ZoneAcl,
}

impl Zone {
    /// Builds a zone from raw fields, accumulating every validation error.
    ///
    /// Each independent field is checked regardless of earlier failures so
    /// the caller can surface all problems in one response.
    pub fn build(request: ZoneRequest) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = validation::check_zone_name("name", &request.name) {
            errors.push(e);
        }
        if let Err(e) = validation::check_email("email", &request.email) {
            errors.push(e);
        }
        if let Err(e) = validation::check_present("admin_group_id", &request.admin_group_id) {
            errors.push(e);
        }
        if let Some(connection) = &request.connection {
            errors.extend(connection.validate("connection"));
        }
        if let Some(transfer) = &request.transfer_connection {
            errors.extend(transfer.validate("transfer_connection"));
        }

        let acl = match ZoneAcl::build(request.acl_rules) {
            Ok(acl) => acl,
            Err(rule_errors) => {
                errors.extend(rule_errors);
                ZoneAcl::default()
            }
        };

        crate::metrics::record_zone_validation(errors.len());
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: request.name,
            email: request.email,
            status: ZoneStatus::Active,
            created: Utc::now(),
            updated: None,
            latest_sync: None,
            connection: request.connection,
            transfer_connection: request.transfer_connection,
            account: request.account.unwrap_or_else(|| "system".to_string()),
            admin_group_id: request.admin_group_id,
            shared: request.shared,
            acl,
        })
    }

    /// True if this is an IPv4 reverse zone (`in-addr.arpa.`).
    pub fn is_ipv4(&self) -> bool {
        self.name.to_ascii_lowercase().ends_with("in-addr.arpa.")
    }

    /// True if this is an IPv6 reverse zone (`ip6.arpa.`).
    pub fn is_ipv6(&self) -> bool {
        self.name.to_ascii_lowercase().ends_with("ip6.arpa.")
    }

    /// True if this is a reverse zone of either family.
    pub fn is_reverse(&self) -> bool {
        self.is_ipv4() || self.is_ipv6()
    }

    /// Returns a new zone with the rule added to the ACL; idempotent.
    #[must_use]
    pub fn add_acl_rule(&self, rule: AclRule) -> Self {
        Self {
            acl: self.acl.add_rule(rule),
            ..self.clone()
        }
    }

    /// Returns a new zone with the rule removed from the ACL; idempotent.
    #[must_use]
    pub fn delete_acl_rule(&self, rule: &AclRule) -> Self {
        Self {
            acl: self.acl.delete_rule(rule),
            ..self.clone()
        }
    }

    /// Returns a new zone in the given status, stamped as updated now.
    #[must_use]
    pub fn with_status(&self, status: ZoneStatus) -> Self {
        Self {
            status,
            updated: Some(Utc::now()),
            ..self.clone()
        }
    }

    /// Returns a new zone recording a completed backend sync.
    #[must_use]
    pub fn with_latest_sync(&self, at: DateTime<Utc>) -> Self {
        Self {
            latest_sync: Some(at),
            ..self.clone()
        }
    }

    /// Returns a copy with both connections' keys in stored (encrypted)
    /// form, ready for persistence.
    pub fn with_connections_encrypted(&self, crypto: &dyn CryptoAlgebra) -> Result<Self, Error> {
        Ok(Self {
            connection: self
                .connection
                .as_ref()
                .map(|c| c.encrypted(crypto))
                .transpose()?,
            transfer_connection: self
                .transfer_connection
                .as_ref()
                .map(|c| c.encrypted(crypto))
                .transpose()?,
            ..self.clone()
        })
    }
}

/// Persistent store of zones.
///
/// Implementations live outside this crate; zones are stored with their
/// TSIG keys already in encrypted form. Absence is `Ok(None)`, never an
/// error.
#[async_trait]
pub trait ZoneRepository: Send + Sync {
    /// Fetches a zone by id.
    async fn get_zone(&self, zone_id: &str) -> Result<Option<Zone>, Error>;

    /// Fetches a zone by fully qualified name.
    async fn get_zone_by_name(&self, name: &str) -> Result<Option<Zone>, Error>;

    /// Stores a zone, returning the stored value.
    async fn put_zone(&self, zone: Zone) -> Result<Zone, Error>;
}
