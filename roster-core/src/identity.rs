//! Identity and account management.
//!
//! An [`Identity`] groups accounts under one name and gates them: an account
//! is effectively enabled only while both it and its identity are enabled.
//! Account addresses are unique by bare form across all identities.
//!
//! Every mutating operation returns the notifications it produced, in
//! emission order, instead of invoking callbacks.

use roster_types::Address;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

use crate::colour::Colour;

/// Errors from identity and account management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// An account with the same bare address exists.
    #[error("duplicate account address: {0}")]
    DuplicateAddress(Address),

    /// No account with that address.
    #[error("unknown account: {0}")]
    UnknownAccount(Address),

    /// No identity with that id.
    #[error("unknown identity: {0}")]
    UnknownIdentity(IdentityId),
}

/// Identifies an identity within one [`Identities`] registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityId(u64);

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "identity-{}", self.0)
    }
}

/// Notifications from identity and account management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// An identity was created.
    IdentityAdded(IdentityId),
    /// An identity was removed.
    IdentityRemoved(IdentityId),
    /// An identity became enabled.
    IdentityEnabled(IdentityId),
    /// An identity became disabled.
    IdentityDisabled(IdentityId),
    /// An account was created.
    AccountAdded(Address),
    /// An account was removed.
    AccountRemoved(Address),
    /// An account became effectively enabled.
    AccountEnabled(Address),
    /// An account stopped being effectively enabled.
    AccountDisabled(Address),
}

/// One account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    address: Address,
    resource: Option<String>,
    enabled: bool,
    colour: Colour,
    allow_unencrypted: bool,
}

impl Account {
    /// Bare address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Resource to bind when connecting.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Replace the resource to bind.
    pub fn set_resource(&mut self, resource: Option<String>) {
        self.resource = resource;
    }

    /// The account's own enabled flag, ignoring its identity.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Display colour.
    pub fn colour(&self) -> Colour {
        self.colour
    }

    /// Replace the display colour.
    pub fn set_colour(&mut self, colour: Colour) {
        self.colour = colour;
    }

    /// Whether unencrypted connections are acceptable.
    pub fn allow_unencrypted(&self) -> bool {
        self.allow_unencrypted
    }

    /// Allow or refuse unencrypted connections.
    pub fn set_allow_unencrypted(&mut self, allow: bool) {
        self.allow_unencrypted = allow;
    }
}

/// A named group of accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    name: String,
    enabled: bool,
    accounts: Vec<Account>,
}

impl Identity {
    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether the identity is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Accounts in creation order.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    fn position(&self, address: &Address) -> Option<usize> {
        self.accounts.iter().position(|a| &a.address == address)
    }
}

/// Registry of identities and their accounts.
#[derive(Debug, Clone, Default)]
pub struct Identities {
    next_id: u64,
    identities: BTreeMap<IdentityId, Identity>,
    by_address: HashMap<Address, IdentityId>,
}

impl Identities {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an enabled identity.
    pub fn new_identity(&mut self, name: impl Into<String>) -> (IdentityId, Vec<IdentityEvent>) {
        self.next_id += 1;
        let id = IdentityId(self.next_id);
        self.identities.insert(
            id,
            Identity {
                name: name.into(),
                enabled: true,
                accounts: Vec::new(),
            },
        );
        (
            id,
            vec![
                IdentityEvent::IdentityAdded(id),
                IdentityEvent::IdentityEnabled(id),
            ],
        )
    }

    /// Create an enabled account under `identity`.
    ///
    /// The account is keyed by the bare form of `address`; a resource, if
    /// present, becomes the account's resource. Without an explicit colour,
    /// one is derived from the bare address.
    pub fn new_account(
        &mut self,
        identity: IdentityId,
        address: &Address,
        colour: Option<Colour>,
    ) -> Result<Vec<IdentityEvent>, IdentityError> {
        let bare = address.bare();
        if self.by_address.contains_key(&bare) {
            return Err(IdentityError::DuplicateAddress(bare));
        }
        let owner = self
            .identities
            .get_mut(&identity)
            .ok_or(IdentityError::UnknownIdentity(identity))?;

        let colour = colour.unwrap_or_else(|| Colour::from_text(&bare.to_string()));
        owner.accounts.push(Account {
            address: bare.clone(),
            resource: address.resource().map(str::to_string),
            enabled: true,
            colour,
            allow_unencrypted: false,
        });
        self.by_address.insert(bare.clone(), identity);

        let mut events = vec![IdentityEvent::AccountAdded(bare.clone())];
        if owner.enabled {
            events.push(IdentityEvent::AccountEnabled(bare));
        }
        Ok(events)
    }

    /// Remove an account.
    pub fn remove_account(&mut self, address: &Address) -> Result<Vec<IdentityEvent>, IdentityError> {
        let bare = address.bare();
        let id = *self
            .by_address
            .get(&bare)
            .ok_or_else(|| IdentityError::UnknownAccount(bare.clone()))?;
        let owner = self
            .identities
            .get_mut(&id)
            .ok_or(IdentityError::UnknownIdentity(id))?;
        let pos = owner
            .position(&bare)
            .ok_or_else(|| IdentityError::UnknownAccount(bare.clone()))?;

        let account = owner.accounts.remove(pos);
        self.by_address.remove(&bare);

        let mut events = Vec::with_capacity(2);
        if owner.enabled && account.enabled {
            events.push(IdentityEvent::AccountDisabled(bare.clone()));
        }
        events.push(IdentityEvent::AccountRemoved(bare));
        Ok(events)
    }

    /// Remove an identity and all of its accounts.
    pub fn remove_identity(&mut self, id: IdentityId) -> Result<Vec<IdentityEvent>, IdentityError> {
        let identity = self
            .identities
            .remove(&id)
            .ok_or(IdentityError::UnknownIdentity(id))?;

        let mut events = Vec::new();
        for account in &identity.accounts {
            if identity.enabled && account.enabled {
                events.push(IdentityEvent::AccountDisabled(account.address.clone()));
            }
            events.push(IdentityEvent::AccountRemoved(account.address.clone()));
            self.by_address.remove(&account.address);
        }
        if identity.enabled {
            events.push(IdentityEvent::IdentityDisabled(id));
        }
        events.push(IdentityEvent::IdentityRemoved(id));
        Ok(events)
    }

    /// Set an account's own enabled flag.
    ///
    /// Nothing is emitted when the flag is unchanged or the identity is
    /// disabled.
    pub fn set_account_enabled(
        &mut self,
        address: &Address,
        enabled: bool,
    ) -> Result<Vec<IdentityEvent>, IdentityError> {
        let bare = address.bare();
        let id = *self
            .by_address
            .get(&bare)
            .ok_or_else(|| IdentityError::UnknownAccount(bare.clone()))?;
        let owner = self
            .identities
            .get_mut(&id)
            .ok_or(IdentityError::UnknownIdentity(id))?;
        let identity_enabled = owner.enabled;
        let account = owner
            .accounts
            .iter_mut()
            .find(|a| a.address == bare)
            .ok_or_else(|| IdentityError::UnknownAccount(bare.clone()))?;

        if account.enabled == enabled {
            return Ok(Vec::new());
        }
        account.enabled = enabled;

        if !identity_enabled {
            return Ok(Vec::new());
        }
        Ok(vec![if enabled {
            IdentityEvent::AccountEnabled(bare)
        } else {
            IdentityEvent::AccountDisabled(bare)
        }])
    }

    /// Set an identity's enabled flag, cascading to its enabled accounts.
    ///
    /// Enabling emits the identity first, then its accounts. Disabling emits
    /// the accounts first, then the identity.
    pub fn set_identity_enabled(
        &mut self,
        id: IdentityId,
        enabled: bool,
    ) -> Result<Vec<IdentityEvent>, IdentityError> {
        let identity = self
            .identities
            .get_mut(&id)
            .ok_or(IdentityError::UnknownIdentity(id))?;
        if identity.enabled == enabled {
            return Ok(Vec::new());
        }
        identity.enabled = enabled;

        let mut events = Vec::new();
        if enabled {
            events.push(IdentityEvent::IdentityEnabled(id));
        }
        for account in identity.accounts.iter().filter(|a| a.enabled) {
            events.push(if enabled {
                IdentityEvent::AccountEnabled(account.address.clone())
            } else {
                IdentityEvent::AccountDisabled(account.address.clone())
            });
        }
        if !enabled {
            events.push(IdentityEvent::IdentityDisabled(id));
        }
        Ok(events)
    }

    /// Find an account by any form of its address.
    pub fn lookup(&self, address: &Address) -> Option<(IdentityId, &Account)> {
        let bare = address.bare();
        let id = *self.by_address.get(&bare)?;
        let account = self.identities.get(&id)?.accounts.iter().find(|a| a.address == bare)?;
        Some((id, account))
    }

    /// Mutable access to an account's settings.
    pub fn account_mut(&mut self, address: &Address) -> Option<&mut Account> {
        let bare = address.bare();
        let id = *self.by_address.get(&bare)?;
        self.identities
            .get_mut(&id)?
            .accounts
            .iter_mut()
            .find(|a| a.address == bare)
    }

    /// Identity owning the account.
    pub fn account_identity(&self, address: &Address) -> Option<IdentityId> {
        self.by_address.get(&address.bare()).copied()
    }

    /// Look up an identity.
    pub fn identity(&self, id: IdentityId) -> Option<&Identity> {
        self.identities.get(&id)
    }

    /// Mutable access to an identity's settings.
    pub fn identity_mut(&mut self, id: IdentityId) -> Option<&mut Identity> {
        self.identities.get_mut(&id)
    }

    /// Whether both the account and its identity are enabled.
    pub fn is_account_enabled(&self, address: &Address) -> bool {
        match self.lookup(address) {
            Some((id, account)) => {
                account.enabled && self.identities.get(&id).is_some_and(|i| i.enabled)
            }
            None => false,
        }
    }

    /// Identities in creation order.
    pub fn identities(&self) -> impl Iterator<Item = (IdentityId, &Identity)> + '_ {
        self.identities.iter().map(|(id, identity)| (*id, identity))
    }

    /// All accounts, grouped by identity in creation order.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> + '_ {
        self.identities.values().flat_map(|i| i.accounts.iter())
    }
}
