//! Pretty output formatting.

use propdesk_core::domain::{FloorPlan, HourlyOccupancy, Lease, OccupancyReading, Property, User};
use propdesk_core::storage::Paginated;

use crate::client::health::Readiness;
use crate::client::occupancy::RetentionReport;
use crate::stream::StreamUpdate;

fn format_list<T>(title: &str, items: &[T], format_item: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        return format!("No {} found.", title.to_lowercase());
    }
    let mut output = format!("{title} ({})\n", items.len());
    output.push_str(&"-".repeat(40));
    for item in items {
        output.push_str(&format!("\n{}", format_item(item)));
        output.push('\n');
    }
    output
}

fn format_page<T>(title: &str, page: &Paginated<T>, format_item: impl Fn(&T) -> String) -> String {
    let mut output = format_list(title, &page.items, format_item);
    if !page.items.is_empty() {
        output.push_str(&format!(
            "showing {}-{} of {}",
            page.offset + 1,
            page.offset as usize + page.items.len(),
            page.total
        ));
    }
    output
}

/// Format dollars and cents from an integer amount of cents.
pub fn format_cents(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02} {currency}", abs / 100, abs % 100)
}

pub fn format_property(property: &Property) -> String {
    format!(
        "{} [{}]\n  ID: {}\n  Address: {}\n  Version: {}",
        property.name, property.status, property.id, property.address, property.version
    )
}

pub fn format_properties(page: &Paginated<Property>) -> String {
    format_page("PROPERTIES", page, format_property)
}

pub fn format_floor_plan(plan: &FloorPlan) -> String {
    let mut output = format!(
        "{} (floor {}) [{}]\n  ID: {}\n  Property: {}\n  Size: {} x {} m ({:.2} m²)",
        plan.name,
        plan.floor_number,
        plan.status,
        plan.id,
        plan.property_id,
        plan.width_m,
        plan.length_m,
        plan.area_sqm
    );
    if let Some(capacity) = plan.capacity {
        output.push_str(&format!("\n  Capacity: {capacity}"));
    }
    output.push_str(&format!("\n  Version: {}", plan.version));
    output
}

pub fn format_floor_plans(page: &Paginated<FloorPlan>) -> String {
    format_page("FLOOR PLANS", page, format_floor_plan)
}

pub fn format_created_floor_plans(plans: &[FloorPlan]) -> String {
    format_list("FLOOR PLANS", plans, format_floor_plan)
}

pub fn format_lease(lease: &Lease) -> String {
    format!(
        "Unit {} [{}]\n  ID: {}\n  Property: {}\n  Tenant: {}\n  Term: {} to {}\n  Rent: {}/month\n  Deposit: {}\n  Version: {}",
        lease.unit,
        lease.status,
        lease.id,
        lease.property_id,
        lease.tenant_id,
        lease.start_date,
        lease.end_date,
        format_cents(lease.monthly_rent_cents, &lease.currency),
        format_cents(lease.deposit_cents, &lease.currency),
        lease.version
    )
}

pub fn format_leases(page: &Paginated<Lease>) -> String {
    format_page("LEASES", page, format_lease)
}

pub fn format_user(user: &User) -> String {
    format!(
        "{} <{}> [{} / {}]\n  ID: {}\n  Version: {}",
        user.name, user.email, user.role, user.status, user.id, user.version
    )
}

pub fn format_users(page: &Paginated<User>) -> String {
    format_page("USERS", page, format_user)
}

pub fn format_reading(reading: &OccupancyReading) -> String {
    let mut output = format!(
        "{} occupants at {} [{}]\n  ID: {}\n  Property: {}",
        reading.occupant_count,
        reading.recorded_at.to_rfc3339(),
        reading.status,
        reading.id,
        reading.property_id
    );
    if let Some(floor) = reading.floor_plan_id {
        output.push_str(&format!("\n  Floor plan: {floor}"));
    }
    if let Some(utilization) = reading.utilization() {
        output.push_str(&format!("\n  Utilization: {:.0}%", utilization * 100.0));
    }
    output
}

pub fn format_readings(readings: &[OccupancyReading]) -> String {
    format_list("READINGS", readings, format_reading)
}

pub fn format_latest(latest: &Option<OccupancyReading>) -> String {
    match latest {
        Some(reading) => format_reading(reading),
        None => "No readings recorded.".to_string(),
    }
}

pub fn format_rollup(rows: &[HourlyOccupancy]) -> String {
    if rows.is_empty() {
        return "No readings in range.".to_string();
    }
    let mut output = format!(
        "{:<25} {:>6} {:>8} {:>6} {:>6}\n",
        "HOUR", "COUNT", "AVG", "MIN", "MAX"
    );
    for row in rows {
        output.push_str(&format!(
            "{:<25} {:>6} {:>8.1} {:>6} {:>6}\n",
            row.hour.to_rfc3339(),
            row.reading_count,
            row.avg_occupants,
            row.min_occupants,
            row.max_occupants
        ));
    }
    output
}

pub fn format_retention(report: &RetentionReport) -> String {
    format!(
        "Purged {} readings older than {} ({} days) across {} properties",
        report.deleted,
        report.cutoff.to_rfc3339(),
        report.retention_days,
        report.property_ids.len()
    )
}

pub fn format_readiness(readiness: &Readiness) -> String {
    match (&readiness.healthy, &readiness.error) {
        (true, _) => "Ready".to_string(),
        (false, Some(error)) => format!("Not ready: {error}"),
        (false, None) => "Not ready".to_string(),
    }
}

pub fn format_stream_update(update: &StreamUpdate) -> String {
    match update {
        StreamUpdate::Connected {
            property_id,
            last_event_id,
        } => format!("connected to {property_id} (after event {last_event_id})"),
        StreamUpdate::Snapshot(snapshot) => {
            let latest = snapshot
                .latest
                .as_ref()
                .map_or_else(|| "unknown".to_string(), |r| r.occupant_count.to_string());
            let mut output = format!(
                "[{}] occupants: {latest} ({} events)",
                snapshot.last_event_id, snapshot.coalesced
            );
            if !snapshot.invalidated.is_empty() {
                output.push_str(&format!(", {} invalidated", snapshot.invalidated.len()));
            }
            output
        }
        StreamUpdate::Disconnected {
            reason,
            attempt,
            retry_in_ms,
        } => format!("disconnected: {reason} (attempt {attempt}, retrying in {retry_in_ms} ms)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propdesk_core::domain::CreatePropertyRequest;
    use propdesk_core::storage::Page;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(123_456, "USD"), "1234.56 USD");
        assert_eq!(format_cents(5, "EUR"), "0.05 EUR");
        assert_eq!(format_cents(-250, "USD"), "-2.50 USD");
    }

    #[test]
    fn test_page_footer() {
        let property =
            CreatePropertyRequest::new("Dockside", "1 Quay").into_property(None, chrono::Utc::now());
        let page = Paginated {
            items: vec![property],
            total: 7,
            limit: 1,
            offset: 3,
        };

        let output = format_properties(&page);
        assert!(output.starts_with("PROPERTIES (1)"));
        assert!(output.ends_with("showing 4-4 of 7"));
        assert_eq!(
            format_properties(&Paginated::empty(Page::default())),
            "No properties found."
        );
    }
}
