mod barrier;
mod history;
mod service;
mod shutdown;
mod tasks;
mod throttle;
mod worker;

pub use barrier::{FirstCycleBarrier, SteadyState};
pub use history::{DedupHistory, SharedHistory};
pub use service::WatchService;
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
pub use tasks::{check_sources, SourceCheck};
pub use throttle::DeliveryThrottle;
pub use worker::{PollWorker, WorkerContext, WorkerReport};
