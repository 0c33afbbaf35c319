use comfy_table::{Table, presets::UTF8_FULL};
use waymark_distance::{
    cache::CacheStats,
    distance_calculation_service::{BatchResult, PairResult},
    transportation_mode::TransportationMode,
};

fn pair_row(property_id: &str, pair: &PairResult) -> Vec<String> {
    let mut row = vec![
        property_id.to_string(),
        pair.interest_point_name.clone(),
        pair.mode.to_string(),
    ];

    match &pair.result {
        Ok(result) => row.extend([
            format!("{:.1}", result.distance_km),
            result.duration_minutes().to_string(),
            result
                .traffic
                .map(|traffic| format!("+{} min", traffic.delay.as_secs() / 60))
                .unwrap_or_default(),
            result.route_summary.clone(),
            if pair.from_cache { "yes" } else { "" }.to_string(),
        ]),
        Err(error) => row.extend([
            String::new(),
            String::new(),
            String::new(),
            error.to_string(),
            String::new(),
        ]),
    }

    row
}

pub fn batch_table(batch: &BatchResult) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Property", "Destination", "Mode", "Km", "Min", "Traffic", "Route", "Cached",
    ]);

    for property in &batch.properties {
        for pair in &property.results {
            table.add_row(pair_row(&property.property_id, pair));
        }
    }

    table
}

pub fn print_batch(batch: &BatchResult) {
    println!("{}", batch_table(batch));

    for property in &batch.properties {
        if let Some(closest) = property.closest() {
            println!(
                "{}: closest is {} ({} min)",
                property.property_id,
                closest.interest_point_name,
                closest
                    .distance()
                    .map(|result| result.duration_minutes())
                    .unwrap_or_default()
            );
        }
    }
}

pub fn print_cache_stats(stats: &CacheStats) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Entries", "Hits", "Misses", "Writes", "Evictions", "Hit rate"])
        .add_row(vec![
            stats.entries.to_string(),
            stats.hits.to_string(),
            stats.misses.to_string(),
            stats.writes.to_string(),
            stats.evictions.to_string(),
            format!("{:.0}%", stats.hit_rate() * 100.0),
        ]);

    println!("{}", table);
}

pub fn print_modes() {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Mode", "HERE"]);

    for mode in TransportationMode::ALL {
        table.add_row(vec![mode.to_string(), mode.to_upstream().to_string()]);
    }

    println!("{}", table);
}
