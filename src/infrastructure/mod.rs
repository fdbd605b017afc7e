pub mod journal_repo;
pub mod ledger;
pub mod models;
pub mod order_repo;

#[cfg(test)]
pub(crate) mod test_db;
