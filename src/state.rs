use std::sync::Arc;
use crate::config::{BookingSettings, Config};
use crate::domain::ports::{
    BlockedPeriodRepository, BookingRepository, CatalogRepository, DraftRepository, EmailService,
    JobRepository, PaymentGateway, PaymentRepository, ProfileRepository, RefundRepository,
};
use crate::domain::services::{
    availability::AvailabilityService, draft_service::DraftService, finalizer::BookingFinalizer,
    notifications::NotificationService, payment_service::PaymentService, refund::RefundService,
};
use crate::error::AppError;

/// One adapter per port, all backed by the same pool.
#[derive(Clone)]
pub struct Repositories {
    pub catalog: Arc<dyn CatalogRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub blocked_periods: Arc<dyn BlockedPeriodRepository>,
    pub drafts: Arc<dyn DraftRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub refunds: Arc<dyn RefundRepository>,
    pub jobs: Arc<dyn JobRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub settings: Arc<BookingSettings>,
    pub repos: Repositories,
    pub gateway: Arc<dyn PaymentGateway>,
    pub email_service: Arc<dyn EmailService>,
    pub availability: Arc<AvailabilityService>,
    pub drafts: Arc<DraftService>,
    pub finalizer: Arc<BookingFinalizer>,
    pub payments: Arc<PaymentService>,
    pub refunds: Arc<RefundService>,
    pub notifications: Arc<NotificationService>,
}

impl AppState {
    pub fn new(
        config: Config,
        settings: BookingSettings,
        repos: Repositories,
        gateway: Arc<dyn PaymentGateway>,
        email_service: Arc<dyn EmailService>,
    ) -> Result<Self, AppError> {
        let settings = Arc::new(settings);

        let availability = Arc::new(AvailabilityService::new(
            settings.clone(),
            repos.blocked_periods.clone(),
            repos.bookings.clone(),
        ));
        let drafts = Arc::new(DraftService::new(
            settings.clone(),
            repos.drafts.clone(),
            repos.catalog.clone(),
            repos.profiles.clone(),
            availability.clone(),
        ));
        let finalizer = Arc::new(BookingFinalizer::new(
            settings.clone(),
            repos.drafts.clone(),
            repos.payments.clone(),
            repos.bookings.clone(),
            repos.jobs.clone(),
        ));
        let payments = Arc::new(PaymentService::new(
            settings.clone(),
            repos.payments.clone(),
            gateway.clone(),
            drafts.clone(),
            finalizer.clone(),
        ));
        let refunds = Arc::new(RefundService::new(settings.clone(), repos.refunds.clone()));
        let notifications = Arc::new(NotificationService::new(
            repos.bookings.clone(),
            repos.profiles.clone(),
            email_service.clone(),
            config.admin_email.clone(),
        )?);

        Ok(Self {
            config,
            settings,
            repos,
            gateway,
            email_service,
            availability,
            drafts,
            finalizer,
            payments,
            refunds,
            notifications,
        })
    }
}
