pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{credit, debit, init_tracing, ManualClock};
