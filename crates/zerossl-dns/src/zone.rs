//! Configured zones and host decomposition.

use crate::error::{DnsError, Result};
use crate::options::BackendKind;
use std::hash::{Hash, Hasher};

/// A DNS zone under which subdomains may be validated.
///
/// Identity is the zone name only: two `Domain`s with the same name are equal
/// regardless of their prefixes.
#[derive(Debug, Clone)]
pub struct Domain {
    name: String,
    allowed_prefixes: Vec<String>,
    preferred_backend: Option<BackendKind>,
}

impl Domain {
    /// Create a zone with its allowed prefixes. Names are trimmed and lowercased.
    pub fn new<I, S>(name: &str, allowed_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<String> = Vec::new();
        for prefix in allowed_prefixes {
            let prefix = normalize(prefix.as_ref());
            if !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        }

        Self {
            name: normalize(name),
            allowed_prefixes: prefixes,
            preferred_backend: None,
        }
    }

    /// Pin this zone to a backend kind.
    #[must_use]
    pub const fn with_backend(mut self, kind: BackendKind) -> Self {
        self.preferred_backend = Some(kind);
        self
    }

    /// Zone name, lowercase, without trailing dot.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allowed prefixes, lowercase.
    pub fn allowed_prefixes(&self) -> &[String] {
        &self.allowed_prefixes
    }

    /// Backend this zone asks for, if any.
    pub const fn preferred_backend(&self) -> Option<BackendKind> {
        self.preferred_backend
    }

    /// A prefix is permitted when it is empty, equals an allowed prefix, or
    /// is a dot-suffix of one (`devnet` under `test.devnet`).
    pub fn permits(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return true;
        }
        let prefix = prefix.to_ascii_lowercase();
        let dotted = format!(".{prefix}");
        self.allowed_prefixes
            .iter()
            .any(|allowed| *allowed == prefix || allowed.ends_with(&dotted))
    }

    /// Split `host` against this zone, `None` when it is not under the zone or
    /// carries an empty label.
    fn split<'h>(&self, host: &'h str) -> Option<(&'h str, &'h str)> {
        let rest = host.strip_suffix(self.name.as_str())?.strip_suffix('.')?;
        if rest.split('.').any(str::is_empty) {
            return None;
        }
        Some(rest.split_once('.').unwrap_or((rest, "")))
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Domain {}

impl Hash for Domain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// A host decomposed against its zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostParts {
    /// First label of the host.
    pub subdomain: String,
    /// Labels between the subdomain and the zone, empty if none.
    pub prefix: String,
    /// The zone the host belongs to.
    pub zone: Domain,
}

/// Resolve `host` against `zones`. When zones nest, the longest one wins.
pub(crate) fn resolve(zones: &[Domain], host: &str) -> Result<HostParts> {
    let normalized = normalize(host);

    let (zone, (subdomain, prefix)) = zones
        .iter()
        .filter_map(|zone| zone.split(&normalized).map(|parts| (zone, parts)))
        .max_by_key(|(zone, _)| zone.name.len())
        .ok_or_else(|| DnsError::ZoneNotConfigured {
            host: host.to_string(),
        })?;

    if !zone.permits(prefix) {
        return Err(DnsError::PrefixNotAllowed {
            prefix: prefix.to_string(),
            zone: zone.name.clone(),
        });
    }

    Ok(HostParts {
        subdomain: subdomain.to_string(),
        prefix: prefix.to_string(),
        zone: zone.clone(),
    })
}

fn normalize(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}
