//! Print an argon2 hash for provisioning an admin account:
//!
//!   spill-hash-password 'correct horse battery staple'

use spill_server::services::auth_service::hash_password;

fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: spill-hash-password <password>"))?;

    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("{hash}");
    Ok(())
}
