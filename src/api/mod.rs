//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for Briefsmith, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Research (`/api/research`)
//! - `POST /api/research` - Run a session and return the brief as JSON
//! - `POST /api/research/stream` - Run a session, streaming progress as Server-Sent Events
//!
//! ## Health (`/api/health`)
//! - `GET /api/health` - Health check endpoint
//!
//! Sessions live only for the duration of the request. There is no
//! authentication; bind the server to a trusted interface.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
