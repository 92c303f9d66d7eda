use crate::config::ServiceConfig;
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    CaseDetail, CaseRecord, CaseStatistics, CaseStatus, CreateCasePayload, CreateEventPayload,
    DocumentRecord, DocumentType, DownloadLink, EventRecord, EventType, UpdateCasePayload,
    UploadedFile, User,
};
use crate::policy;
use crate::storage::ObjectStorage;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::sync::Arc;

const ALLOWED_MIME_TYPES: [&str; 7] = [
    "application/pdf",
    "image/jpeg",
    "image/png",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

const SEARCH_RESULT_CAP: i64 = 5;
const UPCOMING_EVENTS_CAP: i64 = 5;

/// Orchestrates all case operations. Every method takes the
/// authenticated user explicitly; there is no ambient request state.
pub struct CaseService<S: ObjectStorage> {
    db: Arc<Database>,
    storage: Arc<S>,
    config: ServiceConfig,
}

impl<S: ObjectStorage> CaseService<S> {
    pub fn new(db: Arc<Database>, storage: Arc<S>, config: ServiceConfig) -> Self {
        Self {
            db,
            storage,
            config,
        }
    }

    /// Any authenticated user may create a case and becomes its owner.
    pub fn create(&self, payload: &CreateCasePayload, acting: &User) -> AppResult<CaseRecord> {
        if let Some(client_id) = &payload.client_id {
            if self.db.get_user(client_id)?.is_none() {
                return Err(AppError::NotFound(format!(
                    "client user {} not found",
                    client_id
                )));
            }
        }

        self.db.upsert_user(acting)?;
        let case = self.db.insert_case(payload, &acting.id)?;
        tracing::info!(case_id = %case.id, owner = %acting.id, "case created");
        Ok(case)
    }

    /// Loads a case with relations populated, enforcing the view rule.
    ///
    /// Owner views older than the debounce window advance the review
    /// timestamp; client and admin views never do. The check-then-set is
    /// deliberately non-atomic (see DESIGN.md).
    pub fn get(&self, case_id: &str, acting: &User) -> AppResult<CaseDetail> {
        let mut case = self.load_case_checked(case_id, acting)?;

        if acting.id == case.owner_id {
            let now = Utc::now();
            let stale_after = now - Duration::seconds(self.config.review_debounce_seconds);
            if case.last_reviewed_at < stale_after {
                self.db.touch_last_reviewed(&case.id, now)?;
                case.last_reviewed_at = now;
                tracing::debug!(case_id = %case.id, "review timestamp advanced");
            }
        }

        self.load_detail(case)
    }

    /// All cases where the user is owner or client, most recent first.
    pub fn list(&self, acting: &User) -> AppResult<Vec<CaseRecord>> {
        self.db.list_cases_for(&acting.id)
    }

    /// Lookup-widget search: case-insensitive substring over title and
    /// docket number, capped, no ownership filter.
    pub fn search(&self, term: &str) -> AppResult<Vec<CaseRecord>> {
        self.db.search_cases(term, SEARCH_RESULT_CAP)
    }

    /// Partial update. Reuses get()'s permission path, so an owner update
    /// also counts as a review.
    pub fn update(
        &self,
        case_id: &str,
        attrs: &UpdateCasePayload,
        acting: &User,
    ) -> AppResult<CaseRecord> {
        self.get(case_id, acting)?;

        if let Some(client_id) = &attrs.client_id {
            if self.db.get_user(client_id)?.is_none() {
                return Err(AppError::NotFound(format!(
                    "client user {} not found",
                    client_id
                )));
            }
        }

        self.db.apply_case_update(case_id, attrs)?;
        self.db
            .get_case(case_id)?
            .ok_or_else(|| AppError::NotFound("case not found".to_string()))
    }

    /// Deletes the case and cascades to its documents and events.
    pub fn remove(&self, case_id: &str, acting: &User) -> AppResult<()> {
        self.load_case_checked(case_id, acting)?;
        self.db.delete_case_cascade(case_id)?;
        tracing::info!(case_id = %case_id, by = %acting.id, "case deleted");
        Ok(())
    }

    /// Validates and stores an uploaded file, then records the document.
    pub async fn attach_document(
        &self,
        case_id: &str,
        file: &UploadedFile,
        acting: &User,
    ) -> AppResult<DocumentRecord> {
        let case = self.load_case_checked(case_id, acting)?;
        self.validate_file(file)?;

        let unique_name = storage_key(&case, &file.file_name);
        let stored_path = self
            .storage
            .upload(&file.bytes, &self.config.storage_folder, &unique_name)
            .await?;

        let doc_type = DocumentType::from_mime(&file.mime_type);
        let document = self
            .db
            .insert_document(&case.id, &file.file_name, &stored_path, doc_type)?;
        tracing::info!(case_id = %case.id, path = %stored_path, "document attached");
        Ok(document)
    }

    /// Issues a time-limited download URL, permission-checked against the
    /// document's case.
    pub async fn get_download_link(
        &self,
        document_id: &str,
        acting: &User,
    ) -> AppResult<DownloadLink> {
        let (document, case) = self
            .db
            .get_document_with_case(document_id)?
            .ok_or_else(|| AppError::NotFound("document not found".to_string()))?;

        if !policy::can_view(acting, &case) {
            return Err(AppError::Forbidden(
                "no permission to download this file".to_string(),
            ));
        }

        let url = self.storage.create_signed_url(&document.storage_path).await?;
        Ok(DownloadLink { url })
    }

    pub fn add_event(
        &self,
        case_id: &str,
        payload: &CreateEventPayload,
        acting: &User,
    ) -> AppResult<EventRecord> {
        let case = self.load_case_checked(case_id, acting)?;
        let date = parse_event_date(&payload.date)?;
        self.db.insert_event(
            &case.id,
            &payload.title,
            date,
            payload.event_type,
            payload.description.as_deref(),
        )
    }

    /// Stricter rule than viewing: only the owning attorney may delete,
    /// not the client and not an admin.
    pub fn remove_event(&self, event_id: &str, acting: &User) -> AppResult<()> {
        let (event, case) = self
            .db
            .get_event_with_case(event_id)?
            .ok_or_else(|| AppError::NotFound("event not found".to_string()))?;

        if !policy::can_delete_event(acting, &case) {
            return Err(AppError::Forbidden(
                "no permission to delete this event".to_string(),
            ));
        }

        self.db.delete_event(&event.id)
    }

    /// The next few events on the user's own cases, soonest first.
    pub fn list_upcoming_events(&self, acting: &User) -> AppResult<Vec<EventRecord>> {
        self.db
            .list_owner_events(&acting.id, Some(start_of_today()), Some(UPCOMING_EVENTS_CAP))
    }

    /// Calendar view: every event on the user's own cases, ascending.
    pub fn list_all_events(&self, acting: &User) -> AppResult<Vec<EventRecord>> {
        self.db.list_owner_events(&acting.id, None, None)
    }

    pub fn statistics(&self, acting: &User) -> AppResult<CaseStatistics> {
        let total = self.db.count_owned_cases(&acting.id)?;
        let en_sentencia = self
            .db
            .count_owned_cases_with_status(&acting.id, CaseStatus::Judgment)?;

        let (from, to) = current_month_window();
        let audiencias_mes =
            self.db
                .count_owner_events_between(&acting.id, EventType::Hearing, from, to)?;

        Ok(CaseStatistics {
            total,
            en_sentencia,
            audiencias_mes,
        })
    }

    /// NOT_FOUND before FORBIDDEN, always.
    fn load_case_checked(&self, case_id: &str, acting: &User) -> AppResult<CaseRecord> {
        let case = self
            .db
            .get_case(case_id)?
            .ok_or_else(|| AppError::NotFound("case not found".to_string()))?;

        if !policy::can_view(acting, &case) {
            return Err(AppError::Forbidden(
                "no permission to access this case".to_string(),
            ));
        }

        Ok(case)
    }

    fn load_detail(&self, case: CaseRecord) -> AppResult<CaseDetail> {
        let owner = self.db.get_user(&case.owner_id)?.ok_or_else(|| {
            AppError::Internal(format!("case {} references missing owner", case.id))
        })?;
        let client = match &case.client_id {
            Some(client_id) => self.db.get_user(client_id)?,
            None => None,
        };
        let documents = self.db.list_documents(&case.id)?;
        let events = self.db.list_events(&case.id)?;

        Ok(CaseDetail {
            case,
            owner,
            client,
            documents,
            events,
        })
    }

    fn validate_file(&self, file: &UploadedFile) -> AppResult<()> {
        if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
            return Err(AppError::InvalidInput(format!(
                "file type not allowed: {}. Only PDF, Word, Excel or images",
                file.file_name
            )));
        }
        if file.size > self.config.max_file_bytes {
            return Err(AppError::InvalidInput(format!(
                "file too large (max {} bytes): {}",
                self.config.max_file_bytes, file.file_name
            )));
        }
        Ok(())
    }
}

/// Storage key: docket number (or a fallback token) plus a unique
/// millisecond suffix, keeping the original extension.
fn storage_key(case: &CaseRecord, file_name: &str) -> String {
    let docket = case.docket_no.as_deref().unwrap_or("sn");
    let extension = std::path::Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    format!(
        "causa-{}-{}{}",
        docket,
        Utc::now().timestamp_millis(),
        extension
    )
}

fn parse_event_date(raw: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(AppError::InvalidInput(format!("malformed date '{}'", raw)))
}

fn start_of_today() -> DateTime<Utc> {
    let today = Utc::now().date_naive();
    // Midnight always exists for a calendar date.
    match today.and_hms_opt(0, 0, 0) {
        Some(naive) => Utc.from_utc_datetime(&naive),
        None => Utc::now(),
    }
}

/// [start of today, end of the last day of the current month].
fn current_month_window() -> (DateTime<Utc>, DateTime<Utc>) {
    let from = start_of_today();
    let today = from.date_naive();
    let next_month = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
    };
    let to = next_month
        .and_then(|first| first.pred_opt())
        .and_then(|last| last.and_hms_opt(23, 59, 59))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(from);
    (from, to)
}
