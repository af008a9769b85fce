pub mod applicants;
pub mod metrics;

pub use applicants::{applicant_columns, Applicant, ApplicantFilter, FieldKind, FilterField};
pub use metrics::{
    AnalysisRefresh, DataService, HealthStatus, MetricRow, MetricSection, MetricsResponse,
    Transaction, TransactionTrace, UserTransactions,
};
