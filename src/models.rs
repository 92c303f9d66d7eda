use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[serde(rename = "Abogado")]
    Attorney,
    #[serde(rename = "Cliente")]
    Client,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Attorney => "Abogado",
            Self::Client => "Cliente",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Admin" => Some(Self::Admin),
            "Abogado" => Some(Self::Attorney),
            "Cliente" => Some(Self::Client),
            _ => None,
        }
    }
}

/// Authenticated identity handed in by the transport layer. The users
/// subsystem owns credentials; the core only needs id, contact and role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Persisted labels are the store's canonical strings; unknown labels on
/// read are a data-integrity error, not a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegalArea {
    Civil,
    #[serde(rename = "Comercial")]
    Commercial,
    #[serde(rename = "Laboral")]
    Labor,
    #[serde(rename = "Penal")]
    Criminal,
    #[serde(rename = "Familia")]
    Family,
    #[serde(rename = "Administrativo")]
    Administrative,
}

impl LegalArea {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Civil => "Civil",
            Self::Commercial => "Comercial",
            Self::Labor => "Laboral",
            Self::Criminal => "Penal",
            Self::Family => "Familia",
            Self::Administrative => "Administrativo",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Civil" => Some(Self::Civil),
            "Comercial" => Some(Self::Commercial),
            "Laboral" => Some(Self::Labor),
            "Penal" => Some(Self::Criminal),
            "Familia" => Some(Self::Family),
            "Administrativo" => Some(Self::Administrative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStatus {
    #[serde(rename = "Inicio")]
    Intake,
    #[serde(rename = "Etapa Probatoria")]
    Evidence,
    #[serde(rename = "Alegatos")]
    ClosingArguments,
    #[serde(rename = "Sentencia")]
    Judgment,
    #[serde(rename = "Apelación")]
    Appeal,
    #[serde(rename = "Archivada")]
    Archived,
}

impl CaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intake => "Inicio",
            Self::Evidence => "Etapa Probatoria",
            Self::ClosingArguments => "Alegatos",
            Self::Judgment => "Sentencia",
            Self::Appeal => "Apelación",
            Self::Archived => "Archivada",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Inicio" => Some(Self::Intake),
            "Etapa Probatoria" => Some(Self::Evidence),
            "Alegatos" => Some(Self::ClosingArguments),
            "Sentencia" => Some(Self::Judgment),
            "Apelación" => Some(Self::Appeal),
            "Archivada" => Some(Self::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "pdf")]
    Pdf,
    #[serde(rename = "word")]
    Word,
    #[serde(rename = "excel")]
    Excel,
    #[serde(rename = "img")]
    Image,
    #[serde(rename = "otro")]
    Other,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "word",
            Self::Excel => "excel",
            Self::Image => "img",
            Self::Other => "otro",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "pdf" => Some(Self::Pdf),
            "word" => Some(Self::Word),
            "excel" => Some(Self::Excel),
            "img" => Some(Self::Image),
            "otro" => Some(Self::Other),
            _ => None,
        }
    }

    /// Classification used when a file is attached, by MIME substring.
    pub fn from_mime(mime: &str) -> Self {
        if mime.contains("pdf") {
            Self::Pdf
        } else if mime.contains("image") {
            Self::Image
        } else if mime.contains("word") || mime.contains("doc") {
            Self::Word
        } else if mime.contains("excel") || mime.contains("sheet") {
            Self::Excel
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "Audiencia")]
    Hearing,
    #[serde(rename = "Vencimiento")]
    Deadline,
    #[serde(rename = "Trámite")]
    Procedure,
    #[serde(rename = "Otro")]
    Other,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hearing => "Audiencia",
            Self::Deadline => "Vencimiento",
            Self::Procedure => "Trámite",
            Self::Other => "Otro",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Audiencia" => Some(Self::Hearing),
            "Vencimiento" => Some(Self::Deadline),
            "Trámite" => Some(Self::Procedure),
            "Otro" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub id: String,
    pub title: String,
    pub docket_no: Option<String>,
    pub court: Option<String>,
    pub client_phone: Option<String>,
    pub legal_area: LegalArea,
    pub status: CaseStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the owning attorney last actively looked at the case. Drives
    /// the dormancy sweep; advanced only by owner views.
    pub last_reviewed_at: DateTime<Utc>,
    pub owner_id: String,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub case_id: String,
    pub file_name: String,
    pub storage_path: String,
    pub doc_type: DocumentType,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub case_id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub event_type: EventType,
    pub description: Option<String>,
}

/// A case loaded with its relations populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetail {
    #[serde(flatten)]
    pub case: CaseRecord,
    pub owner: User,
    pub client: Option<User>,
    pub documents: Vec<DocumentRecord>,
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateCasePayload {
    pub title: String,
    pub docket_no: Option<String>,
    pub court: Option<String>,
    pub client_phone: Option<String>,
    pub legal_area: Option<LegalArea>,
    pub status: Option<CaseStatus>,
    pub notes: Option<String>,
    pub client_id: Option<String>,
}

/// Partial update; only provided fields are applied.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCasePayload {
    pub title: Option<String>,
    pub docket_no: Option<String>,
    pub court: Option<String>,
    pub client_phone: Option<String>,
    pub legal_area: Option<LegalArea>,
    pub status: Option<CaseStatus>,
    pub notes: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventPayload {
    pub title: String,
    /// Caller-supplied date string; parsed explicitly on insert.
    pub date: String,
    pub event_type: EventType,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadLink {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseStatistics {
    pub total: i64,
    #[serde(rename = "enSentencia")]
    pub en_sentencia: i64,
    #[serde(rename = "audienciasMes")]
    pub audiencias_mes: i64,
}

/// Sweep candidate: a case plus the owner contact the alert goes to.
#[derive(Debug, Clone)]
pub struct DormantCase {
    pub case_id: String,
    pub title: String,
    pub last_reviewed_at: DateTime<Utc>,
    pub owner_email: String,
    pub owner_name: String,
}
