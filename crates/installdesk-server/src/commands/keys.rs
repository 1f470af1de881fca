//! `installdesk keys generate` - create a session signing keypair.

use installdesk_biscuit::KeyPair;
use std::fs;
use std::path::PathBuf;

pub fn generate(out: Option<PathBuf>) -> anyhow::Result<()> {
    let keypair = KeyPair::generate()?;

    if let Some(dir) = out {
        fs::create_dir_all(&dir)?;

        let private_path = dir.join("private.key");
        let public_path = dir.join("public.key");
        keypair.save_private_key(&private_path)?;
        fs::write(&public_path, keypair.public_key_hex())?;

        println!("Generated session keypair:");
        println!("  Private key: {}", private_path.display());
        println!("  Public key:  {}", public_path.display());
        println!();
        println!("Keep the private key out of version control. To use it:");
        println!(
            "  export INSTALLDESK_PRIVATE_KEY=$(cat {})",
            private_path.display()
        );
    } else {
        println!("Private key (keep secure!):");
        println!("{}", keypair.private_key_hex());
        println!();
        println!("Public key:");
        println!("{}", keypair.public_key_hex());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_keys_to_files() {
        let dir = tempdir().unwrap();
        generate(Some(dir.path().join("keys"))).unwrap();

        let private_path = dir.path().join("keys/private.key");
        let loaded = KeyPair::load_from_file(&private_path).unwrap();
        let public_hex = fs::read_to_string(dir.path().join("keys/public.key")).unwrap();
        assert_eq!(loaded.public_key_hex(), public_hex);
    }
}
