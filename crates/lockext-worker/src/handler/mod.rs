//! Stage boundaries and the workers that feed them.
//!
//! - **Query stage**: a new inventory partition starts the eligibility query
//! - **Manifest stage**: a query result is validated and turned into a job
//!
//! Each stage maps every outcome to a [`Disposition`]; [`StageWorker`]
//! settles the JetStream message accordingly.

mod stage;
mod worker;

pub use stage::{Disposition, ManifestStage, QueryStage, Stage};
pub use worker::{StageWorker, WorkerHandles};
