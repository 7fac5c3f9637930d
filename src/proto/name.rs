use crate::asn1::constants::PrincipalNameType;
use crate::asn1::kerberos_string::KerberosString;
use crate::asn1::principal_name::PrincipalName;
use crate::error::KrbError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A principal name: a sequence of components and an advisory name type.
///
/// Equality and hashing consider the components only; RFC 4120 treats the
/// name type as a hint, and two names that differ only in type are the same
/// principal.
#[derive(Debug, Clone, Eq)]
pub struct Name {
    name_type: i32,
    components: Vec<String>,
}

impl Name {
    pub fn new(name_type: i32, components: Vec<String>) -> Self {
        Name {
            name_type,
            components,
        }
    }

    pub fn principal(name: &str) -> Self {
        Name {
            name_type: PrincipalNameType::NtPrincipal as i32,
            components: vec![name.to_string()],
        }
    }

    /// A two component service/host name such as `HTTP/web.example.com`.
    pub fn service_host(service: &str, host: &str) -> Self {
        Name {
            name_type: PrincipalNameType::NtSrvHst as i32,
            components: vec![service.to_string(), host.to_string()],
        }
    }

    /// The ticket granting service for a realm.
    pub fn krbtgt(realm: &str) -> Self {
        Name {
            name_type: PrincipalNameType::NtSrvInst as i32,
            components: vec!["krbtgt".to_string(), realm.to_string()],
        }
    }

    /// Parse an SPN of the form `service/host@REALM`; the realm part is
    /// optional and returned separately when present.
    pub fn parse_spn(spn: &str) -> Result<(Self, Option<String>), KrbError> {
        let (name_part, realm) = match spn.split_once('@') {
            Some((n, r)) => (n, Some(r.to_string())),
            None => (spn, None),
        };
        if name_part.is_empty() {
            return Err(KrbError::NameNotServicePrincipal);
        }
        let components: Vec<String> = name_part.split('/').map(str::to_string).collect();
        if components.iter().any(|c| c.is_empty()) {
            return Err(KrbError::NameNotServicePrincipal);
        }
        Ok((
            Name {
                name_type: PrincipalNameType::NtPrincipal as i32,
                components,
            },
            realm,
        ))
    }

    pub fn name_type(&self) -> i32 {
        self.name_type
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The slash-joined form used as a map key and in logs.
    pub fn principal_string(&self) -> String {
        self.components.join("/")
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.principal_string())
    }
}

impl TryFrom<&Name> for PrincipalName {
    type Error = KrbError;

    fn try_from(value: &Name) -> Result<Self, Self::Error> {
        let name_string = value
            .components
            .iter()
            .map(|c| KerberosString::from_str(c))
            .collect::<Result<Vec<_>, _>>()?;
        if name_string.is_empty() {
            return Err(KrbError::PrincipalNameInvalidComponents);
        }
        Ok(PrincipalName {
            name_type: value.name_type,
            name_string,
        })
    }
}

impl From<&PrincipalName> for Name {
    fn from(value: &PrincipalName) -> Self {
        Name {
            name_type: value.name_type,
            components: value
                .name_string
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_name_type() {
        let a = Name::new(1, vec!["HTTP".into(), "host".into()]);
        let b = Name::new(3, vec!["HTTP".into(), "host".into()]);
        assert_eq!(a, b);

        let c = Name::new(1, vec!["HTTP".into(), "other".into()]);
        assert_ne!(a, c);
    }

    #[test]
    fn spn_parsing() {
        let (name, realm) = Name::parse_spn("HTTP/web.example.com@EXAMPLE.COM")
            .expect("Failed to parse SPN");
        assert_eq!(name.components(), &["HTTP", "web.example.com"]);
        assert_eq!(realm.as_deref(), Some("EXAMPLE.COM"));

        let (name, realm) = Name::parse_spn("host/server").expect("Failed to parse SPN");
        assert_eq!(name.components(), &["host", "server"]);
        assert!(realm.is_none());

        assert!(Name::parse_spn("@REALM").is_err());
        assert!(Name::parse_spn("a//b").is_err());
    }

    #[test]
    fn principal_string_joins_components() {
        assert_eq!(
            Name::service_host("HTTP", "web").principal_string(),
            "HTTP/web"
        );
        assert_eq!(Name::principal("alice").principal_string(), "alice");
    }
}
