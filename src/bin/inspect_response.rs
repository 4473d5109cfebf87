//! Offline inspection of saved analysis service responses

use std::env;
use std::fs;
use windscope::report::{self, ReportView};
use windscope::{response, FailureKind, RawResponse};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: inspect_response <response.json> [more.json ...]");
        eprintln!("Decodes each saved body as if the service had answered HTTP 200.");
        std::process::exit(1);
    }

    let mut failures = 0;
    for path in &args[1..] {
        println!("\n{}", "=".repeat(60));
        println!("FILE: {}", path);
        println!("{}", "=".repeat(60));
        if !inspect_file(path) {
            failures += 1;
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}

fn inspect_file(path: &str) -> bool {
    let body = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to read file: {}", e);
            return false;
        }
    };
    println!("Body: {} bytes", body.len());

    let result = match response::decode(&RawResponse::new(200, body)) {
        Ok(r) => r,
        Err(detail) => {
            let kind = match detail.kind {
                FailureKind::Application => "application error",
                FailureKind::Transport => "transport error",
            };
            println!("Outcome: FAILED ({})", kind);
            println!("  Reason shown to user: {}", detail.reason);
            if let Some(cause) = detail.cause {
                println!("  Diagnostic cause:     {}", cause);
            }
            return false;
        }
    };

    println!("Outcome: SUCCEEDED");
    println!(
        "Decoded: {} months, {} curve points, {} turbines",
        result.monthly_production.len(),
        result.power_curve.len(),
        result.turbine_performance.len()
    );

    let view = report::project(&result);
    print_view(&view, result.turbine_performance.len());
    true
}

fn print_view(view: &ReportView, turbines_in: usize) {
    println!("\n--- Metric cards ({}) ---", view.cards.len());
    for card in &view.cards {
        println!("  {:<18} {:>12}   raw value field: {:?}", card.title, card.display(), card.key);
    }

    println!("\n--- Monthly production ---");
    if view.monthly_production.is_empty() {
        println!("  (empty)");
    }
    for m in &view.monthly_production {
        println!("  {:<10} {:>12.3}", m.month, m.energy);
    }

    println!("\n--- Power curve (ascending wind speed) ---");
    if view.power_curve.is_empty() {
        println!("  (empty)");
    }
    for p in &view.power_curve {
        println!("  {:>6.2} m/s  {:>10.2}", p.wind_speed, p.power);
    }

    println!("\n--- Turbine ranking (top {} of {}) ---", view.ranking.len(), turbines_in);
    if view.ranking.is_empty() {
        println!("  (empty)");
    }
    for t in &view.ranking {
        println!("  #{:<3} {:<20} {:>12.3}", t.rank, t.turbine_id, t.energy);
    }
}
