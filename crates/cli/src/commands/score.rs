//! `breathwise score`: Score current conditions for one user.

use breathwise_core::location::Location;
use breathwise_core::risk::RiskScore;

pub async fn run(
    lat: f64,
    lon: f64,
    user: &str,
    offline: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let service = super::build_service(&config, offline)?;
    let location = Location::checked(lat, lon)?;

    let score = service.risk(&location, user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&score)?);
    } else {
        print_score(&location, &score);
    }
    Ok(())
}

pub(crate) fn print_score(location: &Location, score: &RiskScore) {
    println!("📍 {location}");
    println!(
        "   Risk:       {:.0}/100 ({})",
        score.value,
        score.band.label()
    );
    println!("   Confidence: {:.0}%", score.confidence * 100.0);
    println!();
    for factor in score.factors.iter().filter(|f| f.available && f.contribution > 0.0) {
        let marker = if factor.trigger { " ⚠️ trigger" } else { "" };
        println!("   {:<18} {:>6.1}{marker}", factor.label, factor.contribution);
    }
    let missing = score.unavailable_metrics();
    if !missing.is_empty() {
        let labels: Vec<&str> = missing.iter().map(|k| k.label()).collect();
        println!("\n   Unavailable: {}", labels.join(", "));
    }
}
