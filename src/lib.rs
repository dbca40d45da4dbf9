//! CAS authentication gateway library
//!
//! Puts a web application behind CAS single sign-on and keeps the
//! resulting session in browser cookies.

#![deny(dead_code)]

pub mod auth;
pub mod cas;
pub mod config;
pub mod web;

use cas::TicketValidator;
use config::Config;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Shared `serviceValidate` client
    pub validator: Arc<TicketValidator>,
}
