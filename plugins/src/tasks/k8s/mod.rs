pub mod pod_logs;

pub use pod_logs::{PodLogs, NAMESPACE_OPTION};
