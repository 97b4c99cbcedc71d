pub mod error;
pub mod feed;
pub mod match_engine;
pub mod pipeline;
pub mod rules;
pub mod settings;
pub mod store;
pub(crate) mod util;

pub use error::{ImportError, Result};
pub use feed::RawStatement;
pub use match_engine::{compare_valuta, find_duplicates, matches, matches_and_repair};
pub use pipeline::{ImportReport, Importer};
pub use rules::{
    CategoryCache, ClassificationContext, ClassificationRule, Fingerprint, MatchType, RuleField,
};
pub use settings::ImportSettings;
pub use store::StatementStore;
