//! `breathwise briefing`: Print a full briefing for one user.

use breathwise_core::briefing::{BriefingRecord, Trend, TrendReference};
use breathwise_core::location::Location;

pub async fn run(
    lat: f64,
    lon: f64,
    user: &str,
    horizon_hours: Option<u32>,
    offline: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let service = super::build_service(&config, offline)?;
    let location = Location::checked(lat, lon)?;

    let record = service.briefing(&location, user, horizon_hours).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_briefing(&record);
    }
    Ok(())
}

fn print_briefing(record: &BriefingRecord) {
    super::score::print_score(&record.location, &record.risk);

    println!("\n📝 {}", record.summary);

    let c = &record.conditions;
    if let Some(t) = &c.temperature {
        println!("\n   Temperature: {} °C / {} °F", t.metric.value, t.imperial.value);
    }
    if let Some(w) = &c.wind_speed {
        println!("   Wind:        {} km/h / {} mph", w.metric.value, w.imperial.value);
    }

    if !record.trends.is_empty() {
        println!("\n   Trends:");
        for (kind, entry) in &record.trends {
            let arrow = match entry.trend {
                Trend::Improving => "↘ improving",
                Trend::Worsening => "↗ worsening",
                Trend::Stable => "→ stable",
                Trend::Unknown => "? unknown",
            };
            let basis = match entry.reference {
                TrendReference::Forecast => " (forecast)",
                TrendReference::Baseline => " (vs. usual)",
                TrendReference::None => "",
            };
            println!("   {:<18} {arrow}{basis}", kind.label());
        }
    }

    if !record.recommendations.is_empty() {
        println!("\n   Recommendations:");
        for item in &record.recommendations {
            println!("   • {}", item.text);
        }
    }
}
