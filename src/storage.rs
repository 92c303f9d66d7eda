use crate::errors::AppResult;

/// Object-store collaborator. The real implementation lives with the
/// deployment (R2/S3 behind the transport stack); the core only depends
/// on this narrow contract.
pub trait ObjectStorage: Send + Sync {
    /// Persists the bytes under `folder/unique_name` and returns the
    /// stored path used for later retrieval.
    fn upload(
        &self,
        bytes: &[u8],
        folder: &str,
        unique_name: &str,
    ) -> impl std::future::Future<Output = AppResult<String>> + Send;

    /// Issues a time-limited signed URL for a previously stored path.
    fn create_signed_url(
        &self,
        stored_path: &str,
    ) -> impl std::future::Future<Output = AppResult<String>> + Send;
}
