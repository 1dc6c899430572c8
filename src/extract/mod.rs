pub mod rules;

pub use rules::RuleExtractor;
