pub mod account;
pub mod assignment;
pub mod category;
pub mod error;
pub mod money;
pub mod statement;

pub use account::{Account, AccountId};
pub use assignment::{Assignment, AssignmentStatus};
pub use category::{Category, CategoryId};
pub use error::{Result, StatementError};
pub use statement::{Statement, StatementId};
