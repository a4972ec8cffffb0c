pub mod candidates;
pub mod classifier;
pub mod matches;
pub mod notifier;
pub mod scorer;
pub mod similarity_finder;
