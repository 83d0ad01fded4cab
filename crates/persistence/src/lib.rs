//! On-disk entry formats shared by the node and the CLI.
//!
//! Everything here works on byte slices; where the bytes live is the
//! Durable Store's business.

pub mod error;
pub mod naming;
pub mod record;
pub mod snapshot;
pub mod fixtures;

pub use error::{PersistenceError, Result};
pub use record::{decode_record, encode_record};
pub use snapshot::{decode_snapshot, encode_snapshot};
