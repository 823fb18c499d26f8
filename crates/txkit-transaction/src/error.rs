/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. missing inputs or outputs).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// An error occurred during input signing.
    #[error("signing error: {0}")]
    SigningError(String),
    /// Signing or fee computation was requested for an input whose
    /// previous output is not attached.
    #[error("missing spendable on input {0}")]
    MissingSpendable(usize),
    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// A spendable descriptor string could not be parsed.
    #[error("invalid spendable descriptor: {0}")]
    InvalidSpendable(String),
    /// An underlying script error (forwarded from `txkit-script`).
    #[error("script error: {0}")]
    Script(#[from] txkit_script::ScriptError),
    /// An underlying primitives error (forwarded from `txkit-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] txkit_primitives::PrimitivesError),
}
