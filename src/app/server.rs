/// OpenAPI documentation of the HTTP API.
pub mod api;

/// Http specific DTOs.
pub mod dto;

/// Routes and handlers.
pub mod router;
