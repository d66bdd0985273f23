pub mod lifecycle;

pub use lifecycle::{check_settleable, mark_resolved, MarketError, MarketRules};
