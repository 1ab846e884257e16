/// Router Module Index
///
/// Routes are split by access level and each group gets its guard as a layer in
/// `create_router`, so a handler can never be mounted without the check it expects.
///
/// Every group is nested under `/api`.

/// Routes accessible to anonymous clients.
pub mod public;

/// Routes guarded by the `AuthUser` extractor.
pub mod authenticated;

/// Routes guarded by the `AdminUser` role gate.
pub mod admin;
