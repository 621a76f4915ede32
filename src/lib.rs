//! # Parley
//!
//! A real-time chat and call-signaling server with:
//! - A WebSocket gateway for direct and group messaging
//! - Presence tracking with friend notifications
//! - Peer-to-peer call negotiation and opaque signaling relay
//! - PostgreSQL for persistent storage
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core business entities and repository traits
//! - **Application Layer**: Business logic services
//! - **Infrastructure Layer**: Database, Redis, and metrics implementations
//! - **Presentation Layer**: HTTP routes and the WebSocket gateway
//!
//! ## Module Structure
//!
//! ```text
//! parley/
//! +-- config/        Configuration management
//! +-- domain/        Domain entities, value objects, and traits
//! +-- application/   Application services
//! +-- infrastructure/ Database, Redis, and metrics implementations
//! +-- presentation/  HTTP routes and WebSocket gateway
//! +-- shared/        Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
