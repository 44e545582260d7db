use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core group data: a named ballot category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCore {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A group without an ID.
pub type NewGroup = GroupCore;

/// A group from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub group: GroupCore,
}

impl Deref for Group {
    type Target = GroupCore;

    fn deref(&self) -> &Self::Target {
        &self.group
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl GroupCore {
        pub fn example() -> Self {
            Self {
                name: "Presidential".to_string(),
                description: "Candidates for the presidential race.".to_string(),
            }
        }

        pub fn example2() -> Self {
            Self {
                name: "Parliamentary".to_string(),
                description: String::new(),
            }
        }
    }
}
