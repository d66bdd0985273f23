pub mod settlement;
pub mod unlock_watcher;
