use std::sync::Arc;
use chrono::{NaiveDate, Utc};
use tracing::{info, warn};
use crate::config::BookingSettings;
use crate::domain::models::auth::Identity;
use crate::domain::models::draft::{DraftReservation, NewDraftParams, PaymentOption, ResolvedPayment};
use crate::domain::models::profile::{CustomerItem, CustomerProfile};
use crate::domain::ports::{CatalogRepository, DraftRepository, ProfileRepository};
use crate::domain::services::availability::AvailabilityService;
use crate::error::{AppError, FieldError};

#[derive(Debug, Clone)]
pub struct Selection {
    pub service_type_id: String,
    pub booking_date: NaiveDate,
    pub customer_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ItemDetails {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub registration: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProfileDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Turns the submitted option into its tagged form, snapshotting the amount due.
pub fn resolve_payment(
    option: PaymentOption,
    draft: &DraftReservation,
    settings: &BookingSettings,
) -> Result<ResolvedPayment, AppError> {
    let toggles = &settings.payment_options;
    let resolved = match option {
        PaymentOption::OnlineFull if toggles.online_full => Some(ResolvedPayment::FullOnline { amount: draft.total_amount }),
        PaymentOption::OnlineDeposit if toggles.online_deposit && settings.deposit.enabled => {
            Some(ResolvedPayment::DepositOnline { amount: draft.deposit_amount.unwrap_or(0) })
        }
        PaymentOption::InStore if toggles.in_store => Some(ResolvedPayment::InStore),
        _ => None,
    };
    resolved.ok_or_else(|| {
        AppError::InvalidFields(vec![FieldError::new("payment_option", "This payment option is not available")])
    })
}

pub struct DraftService {
    settings: Arc<BookingSettings>,
    draft_repo: Arc<dyn DraftRepository>,
    catalog_repo: Arc<dyn CatalogRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    availability: Arc<AvailabilityService>,
}

impl DraftService {
    pub fn new(
        settings: Arc<BookingSettings>,
        draft_repo: Arc<dyn DraftRepository>,
        catalog_repo: Arc<dyn CatalogRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        availability: Arc<AvailabilityService>,
    ) -> Self {
        Self { settings, draft_repo, catalog_repo, profile_repo, availability }
    }

    pub async fn create(&self, selection: Selection) -> Result<DraftReservation, AppError> {
        let (service_name, total) = self.validate_selection(&selection).await?;

        let mut draft = DraftReservation::new(NewDraftParams {
            service_type_id: selection.service_type_id,
            service_name,
            booking_date: selection.booking_date,
            total_amount: total,
            customer_notes: selection.customer_notes,
            ttl: self.settings.draft_ttl(),
        });
        draft.deposit_amount = self.deposit_for(total);

        let created = self.draft_repo.create(&draft).await?;
        info!(date = %created.booking_date, service = %created.service_name, "Draft reservation created");
        Ok(created)
    }

    /// Loads a live draft. Missing and expired drafts are both NotFound.
    pub async fn load(&self, token: &str) -> Result<DraftReservation, AppError> {
        let draft = self.draft_repo.find_by_token(token).await?
            .ok_or_else(|| AppError::NotFound("Reservation not found or expired".into()))?;
        if draft.is_expired(Utc::now()) {
            return Err(AppError::NotFound("Reservation not found or expired".into()));
        }
        Ok(draft)
    }

    pub async fn update_selection(&self, token: &str, selection: Selection) -> Result<DraftReservation, AppError> {
        let mut draft = self.load(token).await?;
        let (service_name, total) = self.validate_selection(&selection).await?;

        draft.service_type_id = selection.service_type_id;
        draft.service_name = service_name;
        draft.booking_date = selection.booking_date;
        draft.total_amount = total;
        draft.deposit_amount = self.deposit_for(total);
        draft.customer_notes = selection.customer_notes;

        // The previously chosen option is re-priced, or dropped if no longer offered.
        if let Some(previous) = draft.payment() {
            let repriced = resolve_payment(previous.option(), &draft, &self.settings).ok();
            draft.set_payment(repriced);
        }

        self.save(draft).await
    }

    pub async fn attach_item(&self, token: &str, details: ItemDetails) -> Result<DraftReservation, AppError> {
        let mut draft = self.load(token).await?;
        self.ensure_still_available(&draft).await?;

        let existing = match &draft.item_id {
            Some(id) => self.profile_repo.find_item(id).await?,
            None => None,
        };

        let item = match existing {
            Some(mut item) => {
                item.make = details.make;
                item.model = details.model;
                item.year = details.year;
                item.registration = details.registration;
                self.profile_repo.update_item(&item).await?
            }
            None => {
                let item = CustomerItem::new(
                    draft.profile_id.clone(),
                    details.make,
                    details.model,
                    details.year,
                    details.registration,
                );
                self.profile_repo.create_item(&item).await?
            }
        };

        draft.item_id = Some(item.id);
        self.save(draft).await
    }

    /// Attaches customer details. An authenticated caller's own profile always wins, and the
    /// draft's item follows whichever profile ends up attached.
    pub async fn attach_profile(
        &self,
        token: &str,
        details: ProfileDetails,
        actor: Option<&Identity>,
    ) -> Result<DraftReservation, AppError> {
        let mut draft = self.load(token).await?;
        self.ensure_still_available(&draft).await?;

        let owned = match actor {
            Some(identity) => self.profile_repo.find_profile_by_user(&identity.user_id).await?,
            None => None,
        };

        let reusable = match (owned, &draft.profile_id) {
            (Some(profile), _) => Some(profile),
            (None, Some(id)) => self.profile_repo.find_profile(id).await?
                .filter(|p| p.user_id.is_none() || p.user_id.as_deref() == actor.map(|a| a.user_id.as_str())),
            (None, None) => None,
        };

        let profile = match reusable {
            Some(mut profile) => {
                profile.name = details.name;
                profile.email = details.email;
                profile.phone = details.phone;
                profile.updated_at = Utc::now();
                self.profile_repo.update_profile(&profile).await?
            }
            None => {
                let profile = CustomerProfile::new(
                    actor.map(|a| a.user_id.clone()),
                    details.name,
                    details.email,
                    details.phone,
                );
                self.profile_repo.create_profile(&profile).await?
            }
        };

        if let Some(item_id) = &draft.item_id
            && let Some(item) = self.profile_repo.find_item(item_id).await?
            && item.profile_id.as_deref() != Some(profile.id.as_str()) {
            if item.profile_id.is_some() {
                warn!(item = %item.id, profile = %profile.id, "Item moved to the profile attached later in the flow");
            }
            self.profile_repo.reassign_item(&item.id, &profile.id).await?;
        }

        draft.profile_id = Some(profile.id);
        self.save(draft).await
    }

    pub async fn choose_payment_option(&self, token: &str, option: PaymentOption) -> Result<DraftReservation, AppError> {
        let mut draft = self.load(token).await?;
        self.ensure_still_available(&draft).await?;

        let resolved = resolve_payment(option, &draft, &self.settings)?;
        draft.set_payment(Some(resolved));
        self.save(draft).await
    }

    pub async fn discard(&self, token: &str) -> Result<(), AppError> {
        if self.draft_repo.delete(token).await? {
            info!("Draft reservation discarded");
        }
        Ok(())
    }

    /// Re-checks the committed date. Contention since creation yields StaleSelection.
    pub async fn ensure_still_available(&self, draft: &DraftReservation) -> Result<(), AppError> {
        let today = self.availability.today();
        if let Err(reason) = self.availability.check_date(draft.booking_date, today).await? {
            warn!(date = %draft.booking_date, %reason, "Draft date no longer available");
            return Err(AppError::StaleSelection(format!("{}. Please choose another date.", reason)));
        }
        Ok(())
    }

    async fn validate_selection(&self, selection: &Selection) -> Result<(String, i64), AppError> {
        let service = self.catalog_repo.find_by_id(&selection.service_type_id).await?
            .filter(|s| s.is_active)
            .ok_or_else(|| AppError::InvalidFields(vec![FieldError::new("service_type_id", "Unknown service")]))?;

        let today = self.availability.today();
        if let Err(reason) = self.availability.check_date(selection.booking_date, today).await? {
            return Err(AppError::InvalidFields(vec![FieldError::new("booking_date", reason.to_string())]));
        }
        Ok((service.name, service.base_price))
    }

    fn deposit_for(&self, total: i64) -> Option<i64> {
        self.settings.deposit.enabled.then(|| self.settings.deposit.amount_for(total))
    }

    async fn save(&self, mut draft: DraftReservation) -> Result<DraftReservation, AppError> {
        draft.touch(self.settings.draft_ttl());
        self.draft_repo.update(&draft).await
    }
}
