// Export submodules
pub mod device;
pub mod topology;

/// Common trait for API endpoints.
///
/// This trait is implemented by all API endpoints and provides a method to get
/// the session associated with the endpoint.
pub(crate) trait ApiEndpoint {
    /// Get the client associated with this endpoint.
    fn client(&self) -> &crate::DnacClient;
}
