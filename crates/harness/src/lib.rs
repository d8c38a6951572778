pub mod faulty;
pub mod league;

pub use faulty::{Fault, FaultyStore, StoreOp};
pub use league::{TestLeague, all_rows, sample_document};
