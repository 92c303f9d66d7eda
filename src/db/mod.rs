use crate::errors::{AppError, AppResult};
use crate::models::{
    CaseRecord, CaseStatus, CreateCasePayload, DocumentRecord, DocumentType, DormantCase,
    EventRecord, EventType, LegalArea, Role, UpdateCasePayload, User,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Relational store for cases, documents, events and the user mirror.
/// Single source of truth; concurrent writers are serialized on the
/// connection mutex, last writer wins.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }

    // --- users (external identity mirror) ---

    pub fn upsert_user(&self, user: &User) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, email, name, role) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET email = ?2, name = ?3, role = ?4",
            params![user.id, user.email, user.name, user.role.as_str()],
        )?;
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> AppResult<Option<User>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, email, name, role FROM users WHERE id = ?1",
            [user_id],
            parse_user_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    // --- cases ---

    pub fn insert_case(&self, payload: &CreateCasePayload, owner_id: &str) -> AppResult<CaseRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let legal_area = payload.legal_area.unwrap_or(LegalArea::Civil);
        let status = payload.status.unwrap_or(CaseStatus::Intake);

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO cases (
               id, title, docket_no, court, client_phone, legal_area, status, notes,
               created_at, updated_at, last_reviewed_at, owner_id, client_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?9, ?10, ?11)",
            params![
                id,
                payload.title,
                payload.docket_no,
                payload.court,
                payload.client_phone,
                legal_area.as_str(),
                status.as_str(),
                payload.notes,
                now.to_rfc3339(),
                owner_id,
                payload.client_id,
            ],
        )?;

        Ok(CaseRecord {
            id,
            title: payload.title.clone(),
            docket_no: payload.docket_no.clone(),
            court: payload.court.clone(),
            client_phone: payload.client_phone.clone(),
            legal_area,
            status,
            notes: payload.notes.clone(),
            created_at: now,
            updated_at: now,
            last_reviewed_at: now,
            owner_id: owner_id.to_string(),
            client_id: payload.client_id.clone(),
        })
    }

    pub fn get_case(&self, case_id: &str) -> AppResult<Option<CaseRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{CASE_COLUMNS} FROM cases WHERE id = ?1"),
            [case_id],
            parse_case_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    pub fn list_cases_for(&self, user_id: &str) -> AppResult<Vec<CaseRecord>> {
        let conn = self.lock()?;
        let mut statement = conn.prepare(&format!(
            "{CASE_COLUMNS} FROM cases WHERE owner_id = ?1 OR client_id = ?1
             ORDER BY updated_at DESC"
        ))?;
        let rows = statement.query_map([user_id], parse_case_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
    }

    pub fn search_cases(&self, term: &str, limit: i64) -> AppResult<Vec<CaseRecord>> {
        let conn = self.lock()?;
        let mut statement = conn.prepare(&format!(
            "{CASE_COLUMNS} FROM cases
             WHERE lower(title) LIKE '%' || lower(?1) || '%'
                OR lower(COALESCE(docket_no, '')) LIKE '%' || lower(?1) || '%'
             LIMIT ?2"
        ))?;
        let rows = statement.query_map(params![term, limit], parse_case_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
    }

    /// Applies only the provided fields and advances updated_at.
    pub fn apply_case_update(
        &self,
        case_id: &str,
        attrs: &UpdateCasePayload,
    ) -> AppResult<()> {
        let mut sets: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        let push = |column: &str, value: String, sets: &mut Vec<String>, values: &mut Vec<String>| {
            sets.push(format!("{} = ?{}", column, values.len() + 1));
            values.push(value);
        };

        if let Some(title) = &attrs.title {
            push("title", title.clone(), &mut sets, &mut values);
        }
        if let Some(docket_no) = &attrs.docket_no {
            push("docket_no", docket_no.clone(), &mut sets, &mut values);
        }
        if let Some(court) = &attrs.court {
            push("court", court.clone(), &mut sets, &mut values);
        }
        if let Some(client_phone) = &attrs.client_phone {
            push("client_phone", client_phone.clone(), &mut sets, &mut values);
        }
        if let Some(legal_area) = attrs.legal_area {
            push("legal_area", legal_area.as_str().to_string(), &mut sets, &mut values);
        }
        if let Some(status) = attrs.status {
            push("status", status.as_str().to_string(), &mut sets, &mut values);
        }
        if let Some(notes) = &attrs.notes {
            push("notes", notes.clone(), &mut sets, &mut values);
        }
        if let Some(client_id) = &attrs.client_id {
            push("client_id", client_id.clone(), &mut sets, &mut values);
        }

        push("updated_at", Utc::now().to_rfc3339(), &mut sets, &mut values);

        let query = format!(
            "UPDATE cases SET {} WHERE id = ?{}",
            sets.join(", "),
            values.len() + 1
        );
        values.push(case_id.to_string());

        let conn = self.lock()?;
        let dyn_params: Vec<&dyn rusqlite::ToSql> = values
            .iter()
            .map(|value| value as &dyn rusqlite::ToSql)
            .collect();
        conn.execute(&query, rusqlite::params_from_iter(dyn_params))?;
        Ok(())
    }

    /// Best-effort check-then-set lives in the service; this write alone
    /// never moves the timestamp backwards.
    pub fn touch_last_reviewed(&self, case_id: &str, at: DateTime<Utc>) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE cases SET last_reviewed_at = ?1
             WHERE id = ?2 AND last_reviewed_at < ?1",
            params![at.to_rfc3339(), case_id],
        )?;
        Ok(())
    }

    /// Deletes the case and its dependents in one transaction.
    pub fn delete_case_cascade(&self, case_id: &str) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM events WHERE case_id = ?1", [case_id])?;
        tx.execute("DELETE FROM documents WHERE case_id = ?1", [case_id])?;
        tx.execute("DELETE FROM cases WHERE id = ?1", [case_id])?;
        tx.commit()?;
        Ok(())
    }

    // --- documents ---

    pub fn insert_document(
        &self,
        case_id: &str,
        file_name: &str,
        storage_path: &str,
        doc_type: DocumentType,
    ) -> AppResult<DocumentRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (id, case_id, file_name, storage_path, doc_type, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, case_id, file_name, storage_path, doc_type.as_str(), now.to_rfc3339()],
        )?;

        Ok(DocumentRecord {
            id,
            case_id: case_id.to_string(),
            file_name: file_name.to_string(),
            storage_path: storage_path.to_string(),
            doc_type,
            uploaded_at: now,
        })
    }

    pub fn list_documents(&self, case_id: &str) -> AppResult<Vec<DocumentRecord>> {
        let conn = self.lock()?;
        let mut statement = conn.prepare(
            "SELECT id, case_id, file_name, storage_path, doc_type, uploaded_at
             FROM documents WHERE case_id = ?1 ORDER BY uploaded_at ASC",
        )?;
        let rows = statement.query_map([case_id], parse_document_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
    }

    pub fn get_document_with_case(
        &self,
        document_id: &str,
    ) -> AppResult<Option<(DocumentRecord, CaseRecord)>> {
        let document = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT id, case_id, file_name, storage_path, doc_type, uploaded_at
                 FROM documents WHERE id = ?1",
                [document_id],
                parse_document_row,
            )
            .optional()?
        };
        let Some(document) = document else {
            return Ok(None);
        };
        let case = self.get_case(&document.case_id)?.ok_or_else(|| {
            AppError::Internal(format!(
                "document {} references missing case {}",
                document.id, document.case_id
            ))
        })?;
        Ok(Some((document, case)))
    }

    // --- events ---

    pub fn insert_event(
        &self,
        case_id: &str,
        title: &str,
        date: DateTime<Utc>,
        event_type: EventType,
        description: Option<&str>,
    ) -> AppResult<EventRecord> {
        let id = Uuid::new_v4().to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO events (id, case_id, title, event_date, event_type, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, case_id, title, date.to_rfc3339(), event_type.as_str(), description],
        )?;

        Ok(EventRecord {
            id,
            case_id: case_id.to_string(),
            title: title.to_string(),
            date,
            event_type,
            description: description.map(ToString::to_string),
        })
    }

    pub fn list_events(&self, case_id: &str) -> AppResult<Vec<EventRecord>> {
        let conn = self.lock()?;
        let mut statement = conn.prepare(
            "SELECT id, case_id, title, event_date, event_type, description
             FROM events WHERE case_id = ?1 ORDER BY event_date ASC",
        )?;
        let rows = statement.query_map([case_id], parse_event_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
    }

    pub fn get_event_with_case(
        &self,
        event_id: &str,
    ) -> AppResult<Option<(EventRecord, CaseRecord)>> {
        let event = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT id, case_id, title, event_date, event_type, description
                 FROM events WHERE id = ?1",
                [event_id],
                parse_event_row,
            )
            .optional()?
        };
        let Some(event) = event else {
            return Ok(None);
        };
        let case = self.get_case(&event.case_id)?.ok_or_else(|| {
            AppError::Internal(format!(
                "event {} references missing case {}",
                event.id, event.case_id
            ))
        })?;
        Ok(Some((event, case)))
    }

    pub fn delete_event(&self, event_id: &str) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM events WHERE id = ?1", [event_id])?;
        Ok(())
    }

    pub fn list_owner_events(
        &self,
        owner_id: &str,
        from: Option<DateTime<Utc>>,
        limit: Option<i64>,
    ) -> AppResult<Vec<EventRecord>> {
        let conn = self.lock()?;
        let mut query = String::from(
            "SELECT e.id, e.case_id, e.title, e.event_date, e.event_type, e.description
             FROM events e JOIN cases c ON c.id = e.case_id
             WHERE c.owner_id = ?1",
        );
        let mut boxed_params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(owner_id.to_string())];

        if let Some(from) = from {
            query.push_str(&format!(" AND e.event_date >= ?{}", boxed_params.len() + 1));
            boxed_params.push(Box::new(from.to_rfc3339()));
        }
        query.push_str(" ORDER BY e.event_date ASC");
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT ?{}", boxed_params.len() + 1));
            boxed_params.push(Box::new(limit));
        }

        let mut statement = conn.prepare(&query)?;
        let dyn_params: Vec<&dyn rusqlite::ToSql> = boxed_params
            .iter()
            .map(|value| value.as_ref())
            .collect();
        let rows = statement.query_map(rusqlite::params_from_iter(dyn_params), parse_event_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
    }

    // --- statistics ---

    pub fn count_owned_cases(&self, owner_id: &str) -> AppResult<i64> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COUNT(*) FROM cases WHERE owner_id = ?1",
            [owner_id],
            |row| row.get(0),
        )
        .map_err(AppError::from)
    }

    pub fn count_owned_cases_with_status(
        &self,
        owner_id: &str,
        status: CaseStatus,
    ) -> AppResult<i64> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COUNT(*) FROM cases WHERE owner_id = ?1 AND status = ?2",
            params![owner_id, status.as_str()],
            |row| row.get(0),
        )
        .map_err(AppError::from)
    }

    pub fn count_owner_events_between(
        &self,
        owner_id: &str,
        event_type: EventType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<i64> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COUNT(*) FROM events e JOIN cases c ON c.id = e.case_id
             WHERE c.owner_id = ?1 AND e.event_type = ?2
               AND e.event_date >= ?3 AND e.event_date <= ?4",
            params![owner_id, event_type.as_str(), from.to_rfc3339(), to.to_rfc3339()],
            |row| row.get(0),
        )
        .map_err(AppError::from)
    }

    /// Test hook: set a review timestamp without the monotonic guard.
    #[cfg(test)]
    pub(crate) fn force_last_reviewed(&self, case_id: &str, at: DateTime<Utc>) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE cases SET last_reviewed_at = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), case_id],
        )?;
        Ok(())
    }

    // --- dormancy sweep ---

    /// Cases whose last review is strictly earlier than the cutoff,
    /// regardless of status, joined with the owner's contact details.
    pub fn find_dormant_cases(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<DormantCase>> {
        let conn = self.lock()?;
        let mut statement = conn.prepare(
            "SELECT c.id, c.title, c.last_reviewed_at, u.email, u.name
             FROM cases c JOIN users u ON u.id = c.owner_id
             WHERE c.last_reviewed_at < ?1
             ORDER BY c.last_reviewed_at ASC",
        )?;
        let rows = statement.query_map([cutoff.to_rfc3339()], |row| {
            Ok(DormantCase {
                case_id: row.get(0)?,
                title: row.get(1)?,
                last_reviewed_at: parse_time(&row.get::<_, String>(2)?)?,
                owner_email: row.get(3)?,
                owner_name: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
    }
}

const CASE_COLUMNS: &str = "SELECT id, title, docket_no, court, client_phone, legal_area, status, notes, created_at, updated_at, last_reviewed_at, owner_id, client_id";

fn parse_case_row(row: &rusqlite::Row<'_>) -> Result<CaseRecord, rusqlite::Error> {
    Ok(CaseRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        docket_no: row.get(2)?,
        court: row.get(3)?,
        client_phone: row.get(4)?,
        legal_area: parse_label(5, &row.get::<_, String>(5)?, LegalArea::parse)?,
        status: parse_label(6, &row.get::<_, String>(6)?, CaseStatus::parse)?,
        notes: row.get(7)?,
        created_at: parse_time(&row.get::<_, String>(8)?)?,
        updated_at: parse_time(&row.get::<_, String>(9)?)?,
        last_reviewed_at: parse_time(&row.get::<_, String>(10)?)?,
        owner_id: row.get(11)?,
        client_id: row.get(12)?,
    })
}

fn parse_document_row(row: &rusqlite::Row<'_>) -> Result<DocumentRecord, rusqlite::Error> {
    Ok(DocumentRecord {
        id: row.get(0)?,
        case_id: row.get(1)?,
        file_name: row.get(2)?,
        storage_path: row.get(3)?,
        doc_type: parse_label(4, &row.get::<_, String>(4)?, DocumentType::parse)?,
        uploaded_at: parse_time(&row.get::<_, String>(5)?)?,
    })
}

fn parse_event_row(row: &rusqlite::Row<'_>) -> Result<EventRecord, rusqlite::Error> {
    Ok(EventRecord {
        id: row.get(0)?,
        case_id: row.get(1)?,
        title: row.get(2)?,
        date: parse_time(&row.get::<_, String>(3)?)?,
        event_type: parse_label(4, &row.get::<_, String>(4)?, EventType::parse)?,
        description: row.get(5)?,
    })
}

fn parse_user_row(row: &rusqlite::Row<'_>) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: parse_label(3, &row.get::<_, String>(3)?, Role::parse)?,
    })
}

fn parse_label<T>(
    index: usize,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, rusqlite::Error> {
    parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            format!("unknown stored label '{}'", raw).into(),
        )
    })
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })
}
