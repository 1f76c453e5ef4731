pub mod fixtures;
pub mod reports;
pub mod tester;

pub use fixtures::{Fixture, PromotionRun, TesterAssets};
pub use tester::*;
