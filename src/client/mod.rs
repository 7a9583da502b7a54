//! Tableau Server REST client and authentication.
//!
//! This module provides the [`TableauClient`] for signing in to a site,
//! the [`Session`] scope for authenticated server calls, and the
//! [`PatCredentials`] token pair used to sign in.

mod auth;
mod tableau;

pub use auth::PatCredentials;
pub use tableau::{Datasource, Session, TableauClient};
