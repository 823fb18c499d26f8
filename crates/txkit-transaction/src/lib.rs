/// txkit - Transaction building, signing, and verification.
///
/// Provides the Transaction type with inputs, outputs, and spendable
/// context, the legacy signature-hash computation, the solver that
/// produces unlocking scripts for the standard templates, and per-input
/// script verification.

pub mod transaction;
pub mod input;
pub mod output;
pub mod spendable;
pub mod sighash;
pub mod solver;
pub mod verify;

mod error;
pub use error::TransactionError;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use spendable::Spendable;
pub use transaction::Transaction;
