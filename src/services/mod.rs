pub mod ledger;
pub mod report;
pub mod sqlite;
pub mod storage;
