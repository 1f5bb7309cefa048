pub mod order;
pub mod stats;
pub mod task_ops;
