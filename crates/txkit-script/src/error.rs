/// Error types for script operations.
///
/// Covers parsing errors, encoding/decoding failures, address validation,
/// and script classification problems.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Generic invalid script error.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// Invalid opcode data encountered during ASM parsing.
    #[error("invalid opcode data")]
    InvalidOpcodeData,

    /// Attempted to use append_opcodes for a push data opcode.
    #[error("use append_push_data for push data opcodes: {0}")]
    InvalidOpcodeType(String),

    /// Invalid address string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid address length after Base58 decoding.
    #[error("invalid address length for '{0}'")]
    InvalidAddressLength(String),

    /// Address version byte not recognized for the active network.
    #[error("address not supported: {0}")]
    UnsupportedAddress(String),

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Not enough data in script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds maximum allowed size.
    #[error("data too big")]
    DataTooBig,
}
