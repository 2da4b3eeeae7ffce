//! Lightning trigger example: fire the camera on synthetic light flashes
//!
//! Run with: cargo run --example lightning_trigger -- [CAMERA_NAME]
//!
//! A real setup feeds readings from a light sensor; this example produces a
//! steady ambient level with a bright flash every few seconds.

use camera_remote_ble::{LightningTrigger, RemoteConfig, RemoteControl, Result};
use std::time::Duration;
use tokio::time::Instant;

const SAMPLE_PERIOD: Duration = Duration::from_millis(20);
const AMBIENT: f32 = 30.0;
const FLASH: f32 = 100.0;

/// Synthetic light level: a flash lasting 60 ms every 7 seconds.
fn light_reading(since_start: Duration) -> f32 {
    let phase = since_start.as_millis() % 7_000;
    if (6_940..7_000).contains(&phase) {
        FLASH
    } else {
        // Slow flicker around the ambient level
        AMBIENT + (since_start.as_secs_f32()).sin() * 2.0
    }
}

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

    println!("Lightning Trigger");
    println!("=================\n");

    let remote = RemoteControl::with_bluetooth(config).await?;
    remote.init().await?;

    let mut trigger = LightningTrigger::new();
    trigger.toggle_enabled();

    let start = Instant::now();
    let mut last_sample = start;
    let mut ticker = tokio::time::interval(SAMPLE_PERIOD);

    println!("Press Ctrl+C to exit.\n");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting...");
                break;
            }
            _ = ticker.tick() => {
                remote.update().await;

                let now = Instant::now();
                let reading = light_reading(now - start);

                if trigger.check(reading, now) {
                    let fired = remote.trigger().await;
                    println!(
                        "Flash {:.0} over {:.1}: {}",
                        reading,
                        trigger.sensitivity(),
                        if fired { "fired" } else { "camera not connected" }
                    );
                }

                trigger.update_auto_sensitivity(reading, now - last_sample);
                last_sample = now;
            }
        }
    }

    remote.shutdown().await?;
    println!("Done!");

    Ok(())
}
