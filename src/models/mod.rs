//! Domain model module declarations.

pub mod assignment;
pub mod sla;
pub mod ticket;
pub mod token;
