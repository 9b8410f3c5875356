// Tax module - record compaction and position pairing for the declaration forms

pub mod compact;
pub mod pairing;

pub use compact::{compact, compact_by, Compactable};
pub use pairing::{pair_derivatives, pair_securities, DerivativeItem, SecurityItem};
