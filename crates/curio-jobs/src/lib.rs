//! curio-jobs
//!
//! Asynchronous external-lookup pipeline for unknown catalog items.
//!
//! The import engine never creates catalog items itself: records whose
//! external id matched nothing are handed to an out-of-process worker via a
//! durable queue, and the worker's progress is observable only through an
//! ephemeral, TTL-bounded status record the client polls.
//!
//! Both infrastructure touchpoints are narrow injected capabilities
//! ([`JobQueue`], [`JobStatusStore`]) so the pipeline is testable with
//! in-memory doubles and portable across queue/cache choices. Shipped
//! implementations: a Postgres outbox queue ([`PgLookupQueue`]) with a
//! matching shared status table ([`PgStatusStore`]), and a moka-backed
//! in-process TTL store ([`MokaStatusStore`]) for embedders that dispatch
//! and poll within one process.

mod dispatch;
mod memory;
mod outbox;
mod pg_status;
mod queue;
mod status;

pub use dispatch::{DispatchError, Dispatcher, JobStatusError, DEFAULT_STATUS_TTL};
pub use memory::{MemoryJobQueue, MokaStatusStore};
pub use outbox::PgLookupQueue;
pub use pg_status::PgStatusStore;
pub use queue::{JobQueue, LookupJob, QueueError, LOOKUP_JOB_TYPE};
pub use status::{status_key, JobStatusRecord, JobStatusStore, StatusStoreError, STATUS_QUEUED};
