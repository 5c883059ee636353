//! Grant entry model and canonical line rendering.
//!
//! A [`GrantSpec`] describes one privilege-grant line for a user or group.
//! Rendering is deterministic: the same spec always produces the same line,
//! and the strict pattern built by
//! [`EntryMatcher`](crate::matcher::EntryMatcher) recognises exactly that
//! line. Keeping both sides derived from the spec prevents the written and
//! recognised forms from drifting apart.

use crate::error::GrantError;

/// Marker prefixed to group names in a rendered entry.
const GROUP_PREFIX: char = '%';

/// Whether a grant applies to a user account or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    /// A user account, rendered as the bare name.
    User,
    /// A group, rendered with a `%` prefix.
    Group,
}

/// The user or group receiving a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    name: String,
    kind: PrincipalKind,
}

impl Principal {
    /// Creates a principal of the given kind.
    ///
    /// Surrounding whitespace is stripped: classification trims each line
    /// before matching, so a name carrying padding would render an entry
    /// that is never recognised as present.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::EmptyPrincipal`] when the name is empty or
    /// whitespace-only.
    pub fn new(name: impl Into<String>, kind: PrincipalKind) -> Result<Self, GrantError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(GrantError::EmptyPrincipal);
        }
        Ok(Self {
            name: trimmed.to_owned(),
            kind,
        })
    }

    /// Creates a user principal.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::EmptyPrincipal`] when the name is empty.
    pub fn user(name: impl Into<String>) -> Result<Self, GrantError> {
        Self::new(name, PrincipalKind::User)
    }

    /// Creates a group principal.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::EmptyPrincipal`] when the name is empty.
    pub fn group(name: impl Into<String>) -> Result<Self, GrantError> {
        Self::new(name, PrincipalKind::Group)
    }

    /// Returns the bare principal name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the principal kind.
    #[must_use]
    pub const fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// Returns the identity token as it appears at the start of a rendered
    /// entry: the bare name for users, `%name` for groups.
    #[must_use]
    pub fn identity(&self) -> String {
        match self.kind {
            PrincipalKind::User => self.name.clone(),
            PrincipalKind::Group => format!("{GROUP_PREFIX}{}", self.name),
        }
    }
}

/// Immutable description of one desired grant line.
///
/// Defaults match the most common grant: all hosts, all commands, password
/// required.
///
/// ```
/// use sudokeep::{GrantSpec, Principal};
///
/// let deployer = Principal::group("deployers")?;
/// let spec = GrantSpec::new(deployer).without_password();
/// assert_eq!(spec.render(), "%deployers ALL=(ALL) NOPASSWD: ALL");
/// # Ok::<(), sudokeep::GrantError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantSpec {
    principal: Principal,
    host: String,
    commands: String,
    password_required: bool,
}

impl GrantSpec {
    /// Creates a spec granting the principal all commands on all hosts,
    /// password required.
    #[must_use]
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            host: "ALL".to_owned(),
            commands: "ALL".to_owned(),
            password_required: true,
        }
    }

    /// Restricts the grant to the given host scope token.
    #[must_use]
    pub fn on_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Restricts the grant to the given command scope token.
    #[must_use]
    pub fn for_commands(mut self, commands: impl Into<String>) -> Self {
        self.commands = commands.into();
        self
    }

    /// Marks the grant as usable without a password.
    #[must_use]
    pub const fn without_password(mut self) -> Self {
        self.password_required = false;
        self
    }

    /// Returns the principal receiving the grant.
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the host scope token.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the command scope token.
    #[must_use]
    pub fn commands(&self) -> &str {
        &self.commands
    }

    /// Returns whether the grant requires a password.
    #[must_use]
    pub const fn password_required(&self) -> bool {
        self.password_required
    }

    /// Renders the canonical entry line, without a line terminator.
    #[must_use]
    pub fn render(&self) -> String {
        let marker = if self.password_required {
            ""
        } else {
            " NOPASSWD:"
        };
        format!(
            "{} {}=(ALL){marker} {}",
            self.principal.identity(),
            self.host,
            self.commands,
        )
    }
}
