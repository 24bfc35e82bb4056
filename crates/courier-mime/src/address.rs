//! Mailbox (display name + email address) value type.

use crate::encoding::{encode_rfc2047, needs_rfc2047};
use crate::error::{Error, Result};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Email address with an optional display name.
///
/// Two mailboxes are equal when their addresses match ignoring ASCII case
/// and their display names match exactly.
#[derive(Debug, Clone)]
pub struct Mailbox {
    email: String,
    name: Option<String>,
}

impl Mailbox {
    /// Creates a mailbox with just an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(email: impl Into<String>) -> Result<Self> {
        let email = email.into();
        validate(&email)?;
        Ok(Self { email, name: None })
    }

    /// Creates a mailbox with a display name. An empty name is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let mut mailbox = Self::new(email)?;
        let name = name.into();
        if !name.is_empty() {
            mailbox.name = Some(name);
        }
        Ok(mailbox)
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the domain part of the address.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.email.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

fn validate(addr: &str) -> Result<()> {
    if addr.is_empty() {
        return Err(Error::InvalidAddress("Address cannot be empty".into()));
    }

    let Some((local, domain)) = addr.split_once('@') else {
        return Err(Error::InvalidAddress(format!("{addr}: missing @")));
    };

    if domain.contains('@') {
        return Err(Error::InvalidAddress(format!(
            "{addr}: must have exactly one @"
        )));
    }

    if local.is_empty() || domain.is_empty() {
        return Err(Error::InvalidAddress(format!(
            "{addr}: local and domain parts cannot be empty"
        )));
    }

    if addr
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>')
    {
        return Err(Error::InvalidAddress(format!(
            "{addr}: contains forbidden characters"
        )));
    }

    Ok(())
}

impl PartialEq for Mailbox {
    fn eq(&self, other: &Self) -> bool {
        self.email.eq_ignore_ascii_case(&other.email) && self.name == other.name
    }
}

impl Eq for Mailbox {}

impl Hash for Mailbox {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.email.to_ascii_lowercase().hash(state);
        self.name.hash(state);
    }
}

/// Renders `"Display Name" <email>` or `<email>` for use in headers.
impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if needs_rfc2047(name) => {
                write!(f, "{} <{}>", encode_rfc2047(name, "utf-8"), self.email)
            }
            Some(name) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.email)
            }
            None => write!(f, "<{}>", self.email),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_valid_address() {
        let mailbox = Mailbox::new("user@example.com").unwrap();
        assert_eq!(mailbox.email(), "user@example.com");
        assert!(mailbox.name().is_none());
        assert_eq!(mailbox.domain(), "example.com");
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(Mailbox::new("").is_err());
        assert!(Mailbox::new("userexample.com").is_err());
        assert!(Mailbox::new("@example.com").is_err());
        assert!(Mailbox::new("user@").is_err());
        assert!(Mailbox::new("a@b@c").is_err());
        assert!(Mailbox::new("us er@example.com").is_err());
        assert!(Mailbox::new("user@example.com>").is_err());
    }

    #[test]
    fn test_with_name() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com").unwrap();
        assert_eq!(mailbox.name(), Some("John Doe"));
        assert_eq!(mailbox.email(), "john@example.com");
    }

    #[test]
    fn test_empty_name_is_absent() {
        let mailbox = Mailbox::with_name("", "john@example.com").unwrap();
        assert!(mailbox.name().is_none());
        assert_eq!(mailbox, Mailbox::new("john@example.com").unwrap());
    }

    #[test]
    fn test_equality_ignores_email_case() {
        let a = Mailbox::with_name("Ann", "Ann@Example.com").unwrap();
        let b = Mailbox::with_name("Ann", "ann@example.com").unwrap();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_equality_respects_name_case() {
        let a = Mailbox::with_name("Ann", "ann@example.com").unwrap();
        let b = Mailbox::with_name("ann", "ann@example.com").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let bare = Mailbox::new("user@example.com").unwrap();
        assert_eq!(bare.to_string(), "<user@example.com>");

        let named = Mailbox::with_name("Test Address Display", "from@test.com").unwrap();
        assert_eq!(named.to_string(), "\"Test Address Display\" <from@test.com>");

        let quoted = Mailbox::with_name("Say \"hi\"", "hi@test.com").unwrap();
        assert_eq!(quoted.to_string(), "\"Say \\\"hi\\\"\" <hi@test.com>");
    }

    #[test]
    fn test_display_non_ascii_name() {
        let mailbox = Mailbox::with_name("Héllo", "h@example.com").unwrap();
        assert_eq!(mailbox.to_string(), "=?utf-8?B?SMOpbGxv?= <h@example.com>");
    }
}
