//! Cost bucketing and price-range display.

use crate::domain::{CostBreakpoints, CostCategory};

/// Bucket a non-negative cost amount.
///
/// Intervals are right-closed: `[0, cheap_max]`, `(cheap_max, medium_max]`,
/// `(medium_max, ∞)`.
pub fn categorize_cost(cost: f64, breakpoints: &CostBreakpoints) -> CostCategory {
    if cost <= breakpoints.cheap_max {
        CostCategory::Cheap
    } else if cost <= breakpoints.medium_max {
        CostCategory::Medium
    } else {
        CostCategory::Expensive
    }
}

/// Human-readable price range for a cost category, e.g. `Rp. 250.001 - 500.000`.
pub fn price_range(category: CostCategory, breakpoints: &CostBreakpoints) -> String {
    match category {
        CostCategory::Cheap => format!("Rp. 0 - {}", format_rupiah(breakpoints.cheap_max)),
        CostCategory::Medium => format!(
            "Rp. {} - {}",
            format_rupiah(breakpoints.cheap_max + 1.0),
            format_rupiah(breakpoints.medium_max)
        ),
        CostCategory::Expensive => format!("> Rp. {}", format_rupiah(breakpoints.medium_max)),
    }
}

/// Format a whole-rupiah amount with `.` thousands separators.
pub fn format_rupiah(amount: f64) -> String {
    let whole = amount.max(0.0).round() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
