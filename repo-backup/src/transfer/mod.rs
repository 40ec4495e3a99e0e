//! Progress accounting for transfer batches.

pub mod progress;
