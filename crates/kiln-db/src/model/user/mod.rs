use serde::{Deserialize, Serialize};

/// Key under which group memberships are stored on a user.
pub const GROUP_SOURCE_KEY: &str = "fas_groups";

/// Group memberships of a user, tagged with their source key.
///
/// Replaced wholesale on every login; memberships never accumulate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSet {
    /// `None` when the membership is unknown (e.g. Kerberos login of a
    /// federated account).
    // serde needs a literal; kept equal to GROUP_SOURCE_KEY by the tests
    #[serde(rename = "fas_groups")]
    pub names: Option<Vec<String>>,
}

impl GroupSet {
    #[must_use]
    pub const fn new(names: Option<Vec<String>>) -> Self {
        Self { names }
    }

    /// Returns the group names, or an empty slice when unknown.
    #[must_use]
    pub fn names(&self) -> &[String] {
        self.names.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, group: &str) -> bool {
        self.names().iter().any(|name| name == group)
    }
}

/// The durable internal user record, keyed by normalized username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: uuid::Uuid,
    pub name: String,
    pub mail: String,
    pub timezone: Option<String>,
    pub admin: bool,
    pub openid_groups: Option<GroupSet>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    /// Role label used in login log lines.
    #[must_use]
    pub const fn role(&self) -> &'static str {
        if self.admin { "Admin" } else { "User" }
    }

    /// Returns `true` if the last login reported membership in `group`.
    #[must_use]
    pub fn can_build_in_group(&self, group: &str) -> bool {
        self.openid_groups
            .as_ref()
            .is_some_and(|groups| groups.contains(group))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub mail: String,
    pub timezone: Option<String>,
}
