// Domain models: topology entities, probe metrics, per-run site report

mod metric;
mod report;
mod topology;

pub use metric::{FailureKind, IpRole, ProbeMetric, ProbeMetrics, Status};
pub use report::{AuditEntry, SiteReport};
pub use topology::{BaseAddress, ClientAddress, LoopbackAddress, Site, SiteType};
