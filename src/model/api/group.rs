use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    model::{
        db::group::{Group, NewGroup},
        mongodb::{serde_hex_id, Id},
    },
};

pub const MIN_NAME_LENGTH: usize = 2;

/// A group as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl TryFrom<GroupSpec> for NewGroup {
    type Error = Error;

    fn try_from(spec: GroupSpec) -> Result<Self, Self::Error> {
        let name = spec.name.trim().to_string();
        if name.chars().count() < MIN_NAME_LENGTH {
            return Err(Error::bad_request(format!(
                "Group name must be at least {MIN_NAME_LENGTH} characters."
            )));
        }
        Ok(Self {
            name,
            description: spec.description.trim().to_string(),
        })
    }
}

/// A group as shown to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDescription {
    #[serde(with = "serde_hex_id")]
    pub id: Id,
    pub name: String,
    pub description: String,
}

impl From<Group> for GroupDescription {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.group.name,
            description: group.group.description,
        }
    }
}
