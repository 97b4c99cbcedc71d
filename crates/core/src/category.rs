use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

impl CategoryId {
    /// Reserved system category holding the unassigned remainder of a statement.
    pub const UNASSIGNED: CategoryId = CategoryId(0);

    pub fn is_system(self) -> bool {
        self == Self::UNASSIGNED
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    pub fn new(id: i64, name: &str) -> Self {
        Category {
            id: CategoryId(id),
            name: name.to_string(),
        }
    }

    pub fn unassigned() -> Self {
        Category {
            id: CategoryId::UNASSIGNED,
            name: "Not assigned".to_string(),
        }
    }
}
