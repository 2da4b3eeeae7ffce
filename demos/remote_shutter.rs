//! Remote shutter example: press Enter to fire the camera
//!
//! Run with: cargo run --example remote_shutter -- [CAMERA_NAME]

use camera_remote_ble::{RemoteConfig, RemoteControl, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("camera_remote_ble=info".parse().unwrap()),
        )
        .init();

    let mut config = RemoteConfig::default();
    if let Some(name) = std::env::args().nth(1) {
        config = config.with_target_name(name);
    }

    println!("Remote Shutter");
    println!("==============\n");
    println!("Looking for camera \"{}\"...", config.target_name);
    println!("Enable Bluetooth Remote Control on the camera.\n");

    let remote = RemoteControl::with_bluetooth(config).await?;

    let _handle = remote.on_connected_state_changed(|connected| {
        if connected {
            println!("Camera connected. Press Enter to fire the shutter.");
        } else {
            println!("Camera not connected.");
        }
    });

    remote.init().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = tokio::time::interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting...");
                break;
            }
            _ = poll.tick() => {
                remote.update().await;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(_)) => {
                        if remote.trigger().await {
                            println!("Shutter fired");
                        } else {
                            println!("Not fired (state: {})", remote.state());
                        }
                    }
                    _ => break,
                }
            }
        }
    }

    remote.shutdown().await?;
    println!("Done!");

    Ok(())
}
