// SPDX-License-Identifier: Apache-2.0

//! Demo reading and parsing the asset locator stored on a tag

use std::error::Error;

use tapchip_auth_app::AuthChipApp;
use tapchip_stellar::parse_scanned_url;
use tapchip_transport_pcsc::TransportPcsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("🔌 Connecting to PC/SC reader...");
    let ctx = TransportPcsc::establish_context()?;
    let transport = TransportPcsc::new(&ctx)?;
    let chip = AuthChipApp::new(transport);

    println!("📖 Reading tag URI record...");
    let uri = chip.read_tag_uri().await?;
    println!("✅ Tag URI: {uri}");

    match parse_scanned_url(&uri) {
        Ok(item) => {
            println!("  Contract: {}", item.contract_id);
            match item.token_id {
                Some(token_id) => println!("  Token: {token_id}"),
                None => println!("  Token: not yet minted"),
            }
        }
        Err(e) => eprintln!("❌ Not an asset locator: {e}"),
    }

    Ok(())
}
