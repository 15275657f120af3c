mod connection;
mod helpers;
mod ledger;
mod migrations;
mod registry;
mod scan_sessions;

pub use connection::Database;
pub use ledger::MarkOutcome;
