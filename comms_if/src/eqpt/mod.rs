//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with equipment
//! servers/clients.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod drive;
pub mod odom;
pub mod scan;
