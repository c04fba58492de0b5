// Prints an Argon2 PHC string for a `passwordHash` field when seeding users
// into the data file by hand.

use healthcare_portal::auth::hash_password;

fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("Usage: hashpass <password>"))?;
    let phc = hash_password(&password).map_err(anyhow::Error::msg)?;
    println!("{phc}");
    Ok(())
}
