//! Field validators for the zone aggregate.
//!
//! Every validator checks one field independently and returns a single
//! [`ValidationError`] on failure. The zone builder collects the results of
//! all of them so a caller sees every problem with a request at once rather
//! than the first one found.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// A single field-level validation failure.
///
/// Carries the offending field path and a human-readable message. These are
/// accumulated into a `Vec<ValidationError>` by the zone builder and mapped
/// to 400 responses by the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the field that failed (e.g. `connection.primary_server`).
    pub field: String,
    /// Description of the failure.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error for the given field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// RFC-5322-lite email shape: local part, `@`, dotted domain.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)+$").unwrap()
});

/// RFC 1123 hostname: LDH labels, no leading/trailing hyphen, optional root dot.
static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)*[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.?$",
    )
    .unwrap()
});

/// Checks that a string's length falls within `min..=max` bytes.
pub fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    if value.len() < min || value.len() > max {
        return Err(ValidationError::new(
            field,
            format!("length must be between {min} and {max} characters"),
        ));
    }
    Ok(())
}

/// Validates a zone name: 2..=255 bytes, trailing dot, LDH labels.
///
/// Classless-delegation labels such as `0/26` are accepted so that reverse
/// zones delegated on a CIDR boundary (RFC 2317) validate.
pub fn check_zone_name(field: &str, name: &str) -> Result<(), ValidationError> {
    check_length(field, name, 2, 255)?;

    if !name.ends_with('.') {
        return Err(ValidationError::new(
            field,
            "must be a fully qualified domain name ending in a dot",
        ));
    }

    for label in name.trim_end_matches('.').split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(ValidationError::new(
                field,
                format!("label \"{label}\" must be 1 to 63 characters"),
            ));
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '/')
        {
            return Err(ValidationError::new(
                field,
                format!("label \"{label}\" contains invalid characters"),
            ));
        }
    }

    Ok(())
}

/// Validates a zone administrator email address.
pub fn check_email(field: &str, value: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(value) {
        return Err(ValidationError::new(field, "must be a valid email address"));
    }
    Ok(())
}

/// Checks that a string is non-empty.
pub fn check_present(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

/// Returns true if `host` is a syntactically valid hostname.
pub fn is_valid_hostname(host: &str) -> bool {
    !host.is_empty() && host.len() <= 255 && HOSTNAME_RE.is_match(host)
}

/// Returns true if `host` is a dotted-quad IPv4 literal.
pub fn is_ipv4_literal(host: &str) -> bool {
    host.parse::<std::net::Ipv4Addr>().is_ok()
}

/// Validates a `host[:port]` nameserver address.
///
/// The host part must be a valid hostname or an IPv4 literal; the port, when
/// present, must be in 1..=65535.
pub fn check_host_port(field: &str, value: &str) -> Result<(), ValidationError> {
    let (host, port) = match value.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (value, None),
    };

    if !is_valid_hostname(host) && !is_ipv4_literal(host) {
        return Err(ValidationError::new(
            field,
            format!("\"{host}\" is not a valid hostname or IPv4 address"),
        ));
    }

    if let Some(port) = port {
        match port.parse::<u16>() {
            Ok(p) if p > 0 => {}
            _ => {
                return Err(ValidationError::new(
                    field,
                    format!("port \"{port}\" must be between 1 and 65535"),
                ));
            }
        }
    }

    Ok(())
}
