pub mod batch;
pub mod course_record;
pub mod enrollment;
pub mod fetcher;
pub mod lock;
pub mod maintenance;
pub mod page_upsert;
pub mod product_ledger;
pub mod resync;
pub mod scheduler;
pub mod strapi_sync;

pub use batch::{BatchOrchestrator, BatchProgress, BatchRequest};
pub use enrollment::{EnrollmentReport, EnrollmentService};
pub use fetcher::{CourseEndpoint, CourseFetcher, HttpCourseEndpoint};
pub use lock::SyncLock;
pub use maintenance::CategoryNormalizer;
pub use page_upsert::PageUpsert;
pub use product_ledger::ProductLedger;
pub use resync::ResyncService;
pub use scheduler::SyncScheduler;
pub use strapi_sync::{StrapiSyncService, StrapiSyncStats};
