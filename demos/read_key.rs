// SPDX-License-Identifier: Apache-2.0

//! Demo exercising a real tag on a PC/SC reader
//!
//! This demo shows how to:
//! 1. Connect to a contactless reader
//! 2. Read the chip public key and signature counters
//! 3. Request a signature over a demo digest
//! 4. Normalize it and resolve the recovery id

use std::error::Error;

use sha2::{Digest, Sha256};
use tapchip_auth_app::{normalize, recover, AuthChipApp};
use tapchip_transport_pcsc::TransportPcsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init();

    println!("🔌 Connecting to PC/SC reader...");

    let ctx = TransportPcsc::establish_context()?;
    let readers = TransportPcsc::list_readers(&ctx)?;

    if readers.is_empty() {
        eprintln!("❌ No PC/SC reader found");
        eprintln!("Please ensure:");
        eprintln!("  1. A contactless reader is attached");
        eprintln!("  2. The pcscd service is running");
        eprintln!("  3. The tag is on the reader");
        return Ok(());
    }

    println!("✅ Found {} reader(s)", readers.len());

    let transport = TransportPcsc::new(&ctx)?;
    let chip = AuthChipApp::new(transport);

    println!("🔗 Tag in field, selecting signing applet...");
    chip.select().await?;

    println!("\n🔑 Reading key info (slot 0)...");
    let key_info = chip.get_key_info(0).await?;
    println!("✅ Key info:");
    println!("  Public key: {}", key_info.public_key);
    println!("  Global signatures left: {}", key_info.global_counter);
    println!("  Key signatures left: {}", key_info.key_counter);

    println!("\n✍️  Signing a demo digest...");
    let digest: [u8; 32] = Sha256::digest(b"tapchip demo message").into();
    let signature = chip.generate_signature(0, &digest).await?;
    println!("  DER: {}", hex::encode(&signature.der));

    let (components, flipped) = normalize::normalize(signature.components);
    println!("  R: {}", hex::encode(components.r));
    println!("  S: {} (high-s flipped: {})", hex::encode(components.s), flipped);

    match recover::resolve_recovery_id(&digest, &components, &key_info.public_key) {
        Ok(id) => println!("✅ Recovery id: {id}"),
        Err(e) => eprintln!("❌ Recovery failed: {e}"),
    }

    println!("\n🎉 Done!");
    Ok(())
}
