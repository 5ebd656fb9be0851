//! Login, logout, whoami and signup.

use ecomm_storefront::Storefront;
use ecomm_storefront::api::RegisterUser;

use super::password;
use crate::error::CliError;

#[allow(clippy::print_stdout)]
pub async fn login(shop: &Storefront, username: &str, given: Option<String>) -> Result<(), CliError> {
    let user = shop.auth().login(username, password(given)?).await?;
    let role = if user.is_admin { " (admin)" } else { "" };
    println!("Signed in as {}{role}", user.display_name());
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn logout(shop: &Storefront) -> Result<(), CliError> {
    shop.auth().logout()?;
    println!("Signed out");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn whoami(shop: &Storefront) {
    let session = shop.session().current();
    let Some(user) = session.user().filter(|_| session.is_authenticated()) else {
        println!("Not signed in");
        return;
    };

    println!("{} <{}>", user.username, user.email);
    if !user.first_name.is_empty() || !user.last_name.is_empty() {
        println!("Name:    {}", user.display_name());
    }
    println!("Admin:   {}", if session.is_admin() { "yes" } else { "no" });
    if let Some(expiry) = session.expires_at() {
        println!("Expires: {expiry}");
    }
}

#[allow(clippy::print_stdout)]
pub async fn signup(
    shop: &Storefront,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    given: Option<String>,
) -> Result<(), CliError> {
    let user = RegisterUser {
        username,
        password: password(given)?,
        email,
        first_name,
        last_name,
        is_admin: None,
    };
    shop.auth().signup(&user).await?;
    println!("Account created. Sign in with `ecomm login {}`", user.username);
    Ok(())
}
