//! Protocol addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;

/// A protocol address of the form `[local@]domain[/resource]`.
///
/// The domain is normalised to lowercase. Accounts are keyed by their bare
/// form (see [`Address::bare`]); roster items are keyed by whatever address
/// the live service reports, which is normally bare as well.
///
/// Serialized as its string form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    local: Option<String>,
    domain: String,
    resource: Option<String>,
}

impl Address {
    /// Build an address from its parts.
    pub fn new(
        local: Option<&str>,
        domain: &str,
        resource: Option<&str>,
    ) -> Result<Self, AddressError> {
        let display = || {
            let mut s = String::new();
            if let Some(local) = local {
                s.push_str(local);
                s.push('@');
            }
            s.push_str(domain);
            if let Some(resource) = resource {
                s.push('/');
                s.push_str(resource);
            }
            s
        };

        if matches!(local, Some("")) {
            return Err(AddressError::EmptyLocalpart(display()));
        }
        if domain.is_empty() {
            return Err(AddressError::EmptyDomain(display()));
        }
        if matches!(resource, Some("")) {
            return Err(AddressError::EmptyResource(display()));
        }

        Ok(Self {
            local: local.map(str::to_string),
            domain: domain.to_lowercase(),
            resource: resource.map(str::to_string),
        })
    }

    /// Parse an address from its string form.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        if input.is_empty() {
            return Err(AddressError::Empty);
        }

        let (bare, resource) = match input.split_once('/') {
            Some((bare, resource)) => (bare, Some(resource)),
            None => (input, None),
        };
        let (local, domain) = match bare.split_once('@') {
            Some((local, domain)) => (Some(local), domain),
            None => (None, bare),
        };

        Self::new(local, domain, resource)
    }

    /// The address without its resource.
    pub fn bare(&self) -> Self {
        Self {
            local: self.local.clone(),
            domain: self.domain.clone(),
            resource: None,
        }
    }

    /// Whether the address has no resource.
    pub fn is_bare(&self) -> bool {
        self.resource.is_none()
    }

    /// The part before `@`, if any.
    pub fn localpart(&self) -> Option<&str> {
        self.local.as_deref()
    }

    /// The domain part.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The part after `/`, if any.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(local) = &self.local {
            write!(f, "{}@", local)?;
        }
        f.write_str(&self.domain)?;
        if let Some(resource) = &self.resource {
            write!(f, "/{}", resource)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_address() {
        let addr = Address::parse("romeo@Montague.lit/orchard").unwrap();
        assert_eq!(addr.localpart(), Some("romeo"));
        assert_eq!(addr.domain(), "montague.lit");
        assert_eq!(addr.resource(), Some("orchard"));
        assert_eq!(addr.to_string(), "romeo@montague.lit/orchard");
    }

    #[test]
    fn parses_domain_only() {
        let addr = Address::parse("conference.example").unwrap();
        assert_eq!(addr.localpart(), None);
        assert!(addr.is_bare());
    }

    #[test]
    fn resource_may_contain_separators() {
        let addr = Address::parse("room@muc.example/nick@home/2").unwrap();
        assert_eq!(addr.localpart(), Some("room"));
        assert_eq!(addr.resource(), Some("nick@home/2"));
    }

    #[test]
    fn bare_strips_resource() {
        let full = Address::parse("juliet@capulet.lit/balcony").unwrap();
        let bare = full.bare();
        assert!(bare.is_bare());
        assert_eq!(bare, Address::parse("juliet@capulet.lit").unwrap());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!(Address::parse(""), Err(AddressError::Empty));
        assert!(matches!(
            Address::parse("@example.org"),
            Err(AddressError::EmptyLocalpart(_))
        ));
        assert!(matches!(
            Address::parse("user@"),
            Err(AddressError::EmptyDomain(_))
        ));
        assert!(matches!(
            Address::parse("user@example.org/"),
            Err(AddressError::EmptyResource(_))
        ));
    }

    #[test]
    fn serializes_as_string() {
        let addr = Address::parse("a@b.example").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"a@b.example\"");

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);

        assert!(serde_json::from_str::<Address>("\"@nope\"").is_err());
    }
}
