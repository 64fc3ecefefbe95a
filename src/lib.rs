pub mod features;
pub mod shared;

pub use features::documents::{
    CrossReferenceResolver, DocumentStore, LedgerKind, LedgerRef, PaymentFact, SqliteDocumentStore,
};
pub use features::due_dates::{resolve, DueDateRule, ReferenceMonth};
pub use features::generator::{
    run_cycle, run_cycle_concurrently, ConcurrentCycleConfig, CycleReport, GenerationOutcome,
    GenerationResult, SkipReason,
};
pub use features::payment_sync::{on_payment_fact_changed, SyncOutcome};
pub use features::templates::{RecurringTemplate, TemplateStatus};
pub use shared::errors::{AppError, AppResult};
