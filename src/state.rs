use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::NonceIssuer;
use crate::config::AppConfig;
use crate::db::{FieldStore, MetaStore, SqliteMetaStore};
use crate::error::AppError;
use crate::notices::AdminNotices;
use crate::services::{
    BatchOrchestrator, CategoryNormalizer, CourseFetcher, CourseEndpoint, EnrollmentService,
    HttpCourseEndpoint, PageUpsert, ProductLedger, ResyncService, StrapiSyncService, SyncLock,
};
use crate::strapi::{NoopStrapiClient, StrapiClient, StrapiHttpClient};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub meta: Arc<dyn MetaStore>,
    pub endpoint: Arc<dyn CourseEndpoint>,
    pub strapi: Arc<dyn StrapiClient>,
    pub nonces: NonceIssuer,
    pub notices: AdminNotices,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: AppConfig,
        endpoint: Arc<dyn CourseEndpoint>,
        strapi: Arc<dyn StrapiClient>,
    ) -> Self {
        Self {
            meta: Arc::new(SqliteMetaStore::new(db.clone())),
            nonces: NonceIssuer::new(&config.nonce_secret),
            notices: AdminNotices::new(),
            config: Arc::new(config),
            db,
            endpoint,
            strapi,
        }
    }

    /// Wires the HTTP course endpoint and, when configured, the Strapi client.
    pub fn from_config(db: SqlitePool, config: AppConfig) -> Result<Self, AppError> {
        let endpoint = Arc::new(HttpCourseEndpoint::new(&config.course_endpoint_url, config.fetch_timeout)?);
        let strapi: Arc<dyn StrapiClient> = match &config.strapi {
            Some(strapi) => Arc::new(StrapiHttpClient::new(strapi.clone(), config.fetch_timeout)?),
            None => {
                tracing::info!("STRAPI_API_URL not set, Strapi sync disabled");
                Arc::new(NoopStrapiClient)
            }
        };
        Ok(Self::new(db, config, endpoint, strapi))
    }

    pub fn field_store(&self) -> Option<FieldStore> {
        self.config
            .fields_enabled
            .then(|| FieldStore::new(self.db.clone()))
    }

    pub fn fetcher(&self) -> CourseFetcher {
        CourseFetcher::new(self.db.clone(), self.endpoint.clone(), self.config.clone())
    }

    pub fn product_ledger(&self) -> Option<ProductLedger> {
        if !self.config.commerce_enabled {
            return None;
        }
        self.field_store().map(|fields| {
            ProductLedger::new(
                self.db.clone(),
                self.meta.clone(),
                fields,
                self.config.orphan_policy,
                self.config.site_url.clone(),
            )
        })
    }

    pub fn page_upsert(&self) -> PageUpsert {
        PageUpsert::new(
            self.db.clone(),
            self.meta.clone(),
            self.field_store(),
            self.product_ledger(),
            self.config.default_image_id,
            self.notices.clone(),
        )
    }

    pub fn orchestrator(&self) -> BatchOrchestrator {
        BatchOrchestrator::new(
            self.db.clone(),
            self.fetcher(),
            self.page_upsert(),
            self.nonces.clone(),
            self.config.batch_size,
        )
    }

    pub fn resync(&self) -> ResyncService {
        ResyncService::new(self.meta.clone(), self.fetcher(), self.page_upsert())
    }

    pub fn enrollment(&self) -> EnrollmentService {
        EnrollmentService::new(self.db.clone(), self.meta.clone())
    }

    pub fn strapi_sync(&self) -> StrapiSyncService {
        StrapiSyncService::new(
            self.db.clone(),
            self.strapi.clone(),
            SyncLock::new(self.meta.clone(), self.config.sync_lock_ttl),
        )
    }

    pub fn category_normalizer(&self) -> Option<CategoryNormalizer> {
        self.field_store()
            .map(|fields| CategoryNormalizer::new(self.db.clone(), self.meta.clone(), fields, self.notices.clone()))
    }
}
