//! Attack Flow Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Attack Flow
//! analyzer and validator. It includes:
//!
//! - **Identifiers**: Interned object and template identifiers ([`identifier::Id`])
//! - **Properties**: Typed, self-describing property values ([`property`] module)
//! - **Schema**: Template definitions and their property forms ([`schema`] module)
//! - **Diagram**: The mutable diagram object model ([`diagram`] module)
//! - **Graph**: The read-only graph export consumed by validators ([`graph`] module)

pub mod diagram;
pub mod graph;
pub mod identifier;
pub mod property;
pub mod schema;
