//! Bounded-concurrency job queue.
//!
//! Keeps up to `limit` jobs running at once; excess submissions wait in a
//! FIFO queue and are admitted one-for-one as running jobs retire. A single
//! `join_all` barrier blocks until nothing is running or waiting, and
//! completed results are buffered for `collect_results`.

mod queue;

pub use queue::{JobFactory, JobFuture, JobQueue};
