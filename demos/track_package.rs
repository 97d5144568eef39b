use anyhow::Result;
use parcel_glance::{Config, StatusSource, UpsClient, parse_shipping_data, resolve_latest_activity};

#[tokio::main]
async fn main() -> Result<()> {
    let tracking_number = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "1Z999AA10123456784".to_string());

    let config = Config::load()?;
    let client = UpsClient::new(&config.client)?;

    let raw = client.fetch_status(&tracking_number).await?;
    let summary = parse_shipping_data("Demo", &tracking_number, &raw);

    println!("Tracking: {}", summary.tracking_number);
    println!("  Picked up: {}", summary.date.full_date);
    println!("  Location: {}", summary.latest_location.full_location);
    println!("  Map: {}", summary.latest_location.maps_url);

    if resolve_latest_activity(&raw).is_none() {
        println!("  (carrier reported no activity location)");
    }

    Ok(())
}
