//! Core utilities: wall-clock seam for timeout deadlines and ledger timestamps.

pub mod clock;
