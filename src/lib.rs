//! MIND runtime core: job graphs, CPU backends, and session state.
pub mod conformance;
pub mod exec;
pub mod graph;
pub mod job;
pub mod ops;
pub mod session;
pub mod shapes;
pub mod tensor;
pub mod types;

pub use exec::BackendKind;
pub use job::{Job, JobBuilder, JobConfig, JobError};
pub use session::reset_default_session;
pub use tensor::Tensor;
pub use types::{DType, TensorType};
