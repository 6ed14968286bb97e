/// Router Module Index
///
/// Routes are split by access level so the authentication layer is applied
/// to a whole module at once, never handler by handler.

/// Routes accessible to anonymous clients.
pub mod public;

/// Routes protected by the `Principal` extractor middleware.
pub mod authenticated;
