pub mod pcb;
pub mod pcb_schema;
pub mod sexp;
pub mod writer;

// Re-export for convenience
pub use pcb::{PcbParseError, PcbParser};
pub use pcb_schema::*;
pub use sexp::{ParseError, SExp, SExpParser};
pub use writer::{AppliedChanges, PcbDocument};
