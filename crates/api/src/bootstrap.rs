//! Startup bootstrap: seeded management accounts and the optional demo menu.
//!
//! Management accounts go through the normal credential path, so after
//! seeding there is no special login route. Seeding is idempotent: an email
//! that already has a credential is skipped.

use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Serialize;

use tableside_core::Role;
use tableside_store::Query;

use crate::error::Result;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDraft<'a> {
    username: &'a str,
    email: &'a str,
    role: Role,
    created_at: chrono::DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MenuSeed {
    name: &'static str,
    description: &'static str,
    price: Decimal,
    category: &'static str,
    available: bool,
}

/// Run all startup seeding.
///
/// # Errors
///
/// Returns an error when a profile or menu write fails; a credential that
/// already exists is not an error.
pub async fn seed(state: &AppState) -> Result<()> {
    seed_accounts(state).await?;
    if state.config().seed_menu {
        seed_menu(state).await?;
    }
    Ok(())
}

async fn seed_accounts(state: &AppState) -> Result<()> {
    for account in &state.config().bootstrap_accounts {
        let uid = match state
            .identity()
            .create_user(
                &account.email,
                account.password.expose_secret(),
                Some(&account.username),
            )
            .await
        {
            Ok(uid) => uid,
            Err(tableside_identity::IdentityError::EmailTaken) => continue,
            Err(other) => return Err(other.into()),
        };

        state
            .users()
            .set(
                &uid,
                &ProfileDraft {
                    username: &account.username,
                    email: &account.email,
                    role: account.role,
                    created_at: Utc::now(),
                },
            )
            .await?;
        tracing::info!(username = %account.username, role = %account.role, "seeded account");
    }
    Ok(())
}

/// Insert a small demo catalog when the menu collection is empty.
async fn seed_menu(state: &AppState) -> Result<()> {
    let menu = state.menu();
    if !menu.query(&Query::all()).await?.is_empty() {
        return Ok(());
    }

    for item in demo_menu() {
        menu.add(&item).await?;
    }
    tracing::info!("seeded demo menu");
    Ok(())
}

fn demo_menu() -> Vec<MenuSeed> {
    vec![
        MenuSeed {
            name: "Classic Burger",
            description: "Beef patty, cheddar, house sauce",
            price: Decimal::new(899, 2),
            category: "mains",
            available: true,
        },
        MenuSeed {
            name: "Margherita Pizza",
            description: "Tomato, mozzarella, basil",
            price: Decimal::new(1150, 2),
            category: "mains",
            available: true,
        },
        MenuSeed {
            name: "Caesar Salad",
            description: "Romaine, parmesan, croutons",
            price: Decimal::new(750, 2),
            category: "starters",
            available: true,
        },
        MenuSeed {
            name: "Lemonade",
            description: "Fresh-squeezed",
            price: Decimal::new(350, 2),
            category: "drinks",
            available: true,
        },
    ]
}
