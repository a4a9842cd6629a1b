//! Plain-text rendering of geocaches for the terminal.

use opencache_core::models::{FullGeocache, Geocache};
use opencache_core::utils::{format_optional, format_rating, strip_html, truncate};

/// Column width for cache names in list output
const NAME_WIDTH: usize = 36;

pub fn print_table(caches: &[Geocache]) {
    if caches.is_empty() {
        println!("No geocaches found.");
        return;
    }

    println!(
        "{:<8}  {:<width$}  {:<12}  {:<10}  {}",
        "CODE",
        "NAME",
        "TYPE",
        "STATUS",
        "LOCATION",
        width = NAME_WIDTH
    );
    for cache in caches {
        println!(
            "{:<8}  {:<width$}  {:<12}  {:<10}  {:.5}, {:.5}",
            cache.code,
            truncate(&cache.name, NAME_WIDTH),
            cache.kind.label(),
            cache.status.label(),
            cache.location.latitude,
            cache.location.longitude,
            width = NAME_WIDTH
        );
    }
    println!("{} geocache(s)", caches.len());
}

pub fn print_detail(cache: &FullGeocache) {
    let summary = cache.summary();
    println!("{} - {}", summary.code, summary.name);
    println!("  Type:        {} ({})", summary.kind.label(), summary.status.label());
    println!(
        "  Location:    {:.5}, {:.5}",
        summary.location.latitude, summary.location.longitude
    );
    println!("  Owner:       {}", cache.owner.username);
    println!(
        "  Difficulty:  {}   Terrain: {}",
        format_rating(cache.difficulty),
        format_rating(cache.terrain)
    );
    match cache.size {
        Some(size) => println!("  Size:        {}", size),
        None => println!("  Size:        none"),
    }
    let hidden = cache
        .hidden_on()
        .map(|d| d.format("%b %d, %Y").to_string());
    println!(
        "  Hidden:      {}",
        format_optional(hidden.as_deref().or(Some(cache.date_hidden.as_str())), "unknown")
    );
    println!("  Recommended: {}", cache.recommendations);
    println!("  URL:         {}", cache.url);

    let description = strip_html(&cache.description);
    if !description.is_empty() {
        println!();
        for line in description.lines() {
            println!("  {}", line);
        }
    }
    if cache.has_hint() {
        println!();
        println!("  Hint: {}", cache.hint.trim());
    }
}
