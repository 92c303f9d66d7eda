use crate::models::{CaseRecord, Role, User};

/// Access rules for a case. Evaluated fresh on every operation; nothing
/// here is cached.
///
/// A user may see or touch a case iff they are the owning attorney, the
/// linked client, or an admin. Event deletion is stricter and handled by
/// [`can_delete_event`].
pub fn can_view(user: &User, case: &CaseRecord) -> bool {
    user.id == case.owner_id
        || case.client_id.as_deref() == Some(user.id.as_str())
        || user.role == Role::Admin
}

pub fn can_edit(user: &User, case: &CaseRecord) -> bool {
    can_view(user, case)
}

/// Only the owning attorney may delete an event; neither the client nor
/// an admin qualifies.
pub fn can_delete_event(user: &User, case: &CaseRecord) -> bool {
    user.id == case.owner_id
}

#[cfg(test)]
mod tests {
    use super::{can_delete_event, can_edit, can_view};
    use crate::models::{CaseRecord, CaseStatus, LegalArea, Role, User};
    use chrono::Utc;

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            email: format!("{id}@estudio.com"),
            name: id.to_string(),
            role,
        }
    }

    fn case(owner_id: &str, client_id: Option<&str>) -> CaseRecord {
        let now = Utc::now();
        CaseRecord {
            id: "case-1".to_string(),
            title: "GOMEZ c/ PEREZ".to_string(),
            docket_no: None,
            court: None,
            client_phone: None,
            legal_area: LegalArea::Civil,
            status: CaseStatus::Intake,
            notes: None,
            created_at: now,
            updated_at: now,
            last_reviewed_at: now,
            owner_id: owner_id.to_string(),
            client_id: client_id.map(ToString::to_string),
        }
    }

    #[test]
    fn owner_client_and_admin_may_view() {
        let case = case("abg-1", Some("cli-1"));
        assert!(can_view(&user("abg-1", Role::Attorney), &case));
        assert!(can_view(&user("cli-1", Role::Client), &case));
        assert!(can_view(&user("otra", Role::Admin), &case));
    }

    #[test]
    fn unrelated_users_may_not_view_or_edit() {
        let case = case("abg-1", Some("cli-1"));
        let stranger = user("abg-2", Role::Attorney);
        assert!(!can_view(&stranger, &case));
        assert!(!can_edit(&stranger, &case));

        let other_client = user("cli-2", Role::Client);
        assert!(!can_view(&other_client, &case));
    }

    #[test]
    fn no_linked_client_grants_nothing() {
        let case = case("abg-1", None);
        assert!(!can_view(&user("cli-1", Role::Client), &case));
    }

    #[test]
    fn event_deletion_is_owner_only() {
        let case = case("abg-1", Some("cli-1"));
        assert!(can_delete_event(&user("abg-1", Role::Attorney), &case));
        assert!(!can_delete_event(&user("cli-1", Role::Client), &case));
        assert!(!can_delete_event(&user("root", Role::Admin), &case));
    }
}
