mod category;
mod transaction;
mod transaction_type;

pub use category::Category;
pub use transaction::Transaction;
pub use transaction_type::TransactionType;

#[cfg(test)]
mod tests;
