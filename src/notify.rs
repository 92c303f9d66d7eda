use crate::errors::AppResult;

/// Mail/alert collaborator. Fire-and-forget from the sweep's point of
/// view: a failed send is logged by the caller and never retried within
/// the same run.
pub trait NotificationGateway: Send + Sync {
    fn send_inactivity_alert(
        &self,
        to_email: &str,
        recipient_name: &str,
        case_title: &str,
        days_since_review: i64,
    ) -> impl std::future::Future<Output = AppResult<()>> + Send;
}
