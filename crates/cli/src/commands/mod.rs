//! Command implementations.
//!
//! Commands print results to stdout; logs and errors go to stderr through
//! `tracing`.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

pub use admin::AdminCommand;
pub use cart::CartCommand;
pub use catalog::{CategoryCommand, ProductCommand};
pub use orders::OrderCommand;

use std::io::BufRead;

use secrecy::SecretString;

use ecomm_storefront::Storefront;
use ecomm_storefront::auth::Access;

use crate::error::CliError;

/// Print alerts raised while the command ran.
#[allow(clippy::print_stdout)]
pub fn print_alerts(shop: &Storefront) {
    shop.alerts().prune_expired();
    for alert in shop.alerts().snapshot() {
        println!("[{}] {}", alert.kind, alert.message);
    }
}

/// Refuse to continue unless the session grants `access`.
pub fn require(shop: &Storefront, access: Access) -> Result<(), CliError> {
    shop.gate().guard(access).map_err(|rejection| {
        tracing::debug!(redirect = rejection.redirect_path(), "Guard rejected command");
        CliError::from(rejection)
    })
}

/// Use the given password or read one line from stdin.
pub fn password(given: Option<String>) -> Result<SecretString, CliError> {
    if let Some(password) = given {
        return Ok(SecretString::from(password));
    }
    tracing::info!("Reading password from stdin");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    if password.is_empty() {
        return Err(CliError::Input("password is required".to_owned()));
    }
    Ok(SecretString::from(password))
}
