/// txkit - Script parsing, classification, execution, and addresses.
///
/// Provides the Bitcoin Script type, opcode definitions, script chunk
/// parsing, standard-template classification (P2PKH, P2PK, multisig,
/// P2SH), address generation/validation, and a script interpreter
/// sufficient to verify the standard templates.

pub mod script;
pub mod opcodes;
pub mod chunk;
pub mod template;
pub mod address;
pub mod interpreter;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use address::{Address, Network};
pub use chunk::ScriptChunk;
pub use template::ScriptTemplate;
