// flatjson command-line tool
//
// Thin adapters around flatjson-core:
// - `flatten`: JSON or JSON Lines in, one flattened object per line out
// - `generate`: synthetic order records for exercising a delivery stream

mod init;

pub mod flatten;
pub mod generate;

pub use init::init_tracing;
