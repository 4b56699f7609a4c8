//! propdesk-client CLI entry point.

use std::path::Path;

use clap::Parser;
use propdesk_client::cli::floor_plans::FloorPlansAction;
use propdesk_client::cli::health::HealthAction;
use propdesk_client::cli::leases::LeasesAction;
use propdesk_client::cli::occupancy::OccupancyAction;
use propdesk_client::cli::properties::PropertiesAction;
use propdesk_client::cli::users::UsersAction;
use propdesk_client::cli::{Cli, Commands, OutputFormat};
use propdesk_client::client::floor_plans::ListFloorPlansQuery;
use propdesk_client::client::leases::ListLeasesQuery;
use propdesk_client::client::occupancy::ReadingsQuery;
use propdesk_client::client::properties::ListPropertiesQuery;
use propdesk_client::client::users::ListUsersQuery;
use propdesk_client::output::{pretty, render};
use propdesk_client::{watch_occupancy, ClientError, PropdeskClient, StreamOptions};
use propdesk_core::domain::{
    CreateFloorPlanRequest, CreateLeaseRequest, CreatePropertyRequest, CreateUserRequest,
    RecordOccupancyRequest, UpdateFloorPlanRequest, UpdateLeaseRequest, UpdatePropertyRequest,
    UpdateUserRequest,
};
use propdesk_core::storage::LeaseScope;
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propdesk_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client = PropdeskClient::new(&cli.base_url).with_actor(cli.user_id);
    let format = cli.format;

    match cli.command {
        Commands::Properties(cmd) => match cmd.action {
            PropertiesAction::List { status, page } => {
                let properties = client
                    .list_properties(&ListPropertiesQuery {
                        status,
                        include_archived: page.include_archived,
                        limit: page.limit,
                        offset: page.offset,
                    })
                    .await?;
                println!("{}", render(&properties, format, pretty::format_properties));
            }
            PropertiesAction::Create {
                name,
                address,
                metadata,
            } => {
                let mut req = CreatePropertyRequest::new(name, address);
                req.metadata = metadata;
                let property = client.create_property(&req).await?;
                println!("{}", created(format, &property, pretty::format_property));
            }
            PropertiesAction::Get { id } => {
                let property = client.get_property(id).await?;
                println!("{}", render(&property, format, pretty::format_property));
            }
            PropertiesAction::Update {
                id,
                version,
                name,
                address,
                status,
                metadata,
            } => {
                let req = UpdatePropertyRequest {
                    name,
                    address,
                    status,
                    metadata,
                    ..Default::default()
                };
                let property = client.update_property(id, version, &req).await?;
                println!("{}", updated(format, &property, pretty::format_property));
            }
            PropertiesAction::Archive { id, version } => {
                let property = client.archive_property(id, version).await?;
                if !cli.quiet {
                    println!("{}", render(&property, format, |p| format!("Archived property {}", p.id)));
                }
            }
        },
        Commands::FloorPlans(cmd) => match cmd.action {
            FloorPlansAction::List {
                property_id,
                status,
                page,
            } => {
                let plans = client
                    .list_floor_plans(&ListFloorPlansQuery {
                        status,
                        include_archived: page.include_archived,
                        limit: page.limit,
                        offset: page.offset,
                        ..ListFloorPlansQuery::new(property_id)
                    })
                    .await?;
                println!("{}", render(&plans, format, pretty::format_floor_plans));
            }
            FloorPlansAction::Create {
                property_id,
                name,
                floor_number,
                width_m,
                length_m,
                capacity,
            } => {
                let mut req =
                    CreateFloorPlanRequest::new(property_id, name, floor_number, width_m, length_m);
                req.capacity = capacity;
                let plan = client.create_floor_plan(&req).await?;
                println!("{}", created(format, &plan, pretty::format_floor_plan));
            }
            FloorPlansAction::Bulk { file } => {
                let items: Vec<CreateFloorPlanRequest> = read_json(&file).await?;
                let plans = client.bulk_create_floor_plans(items).await?;
                println!(
                    "{}",
                    render(&plans, format, |p| pretty::format_created_floor_plans(p))
                );
            }
            FloorPlansAction::Get { id } => {
                let plan = client.get_floor_plan(id).await?;
                println!("{}", render(&plan, format, pretty::format_floor_plan));
            }
            FloorPlansAction::Update {
                id,
                version,
                name,
                floor_number,
                width_m,
                length_m,
                capacity,
                clear_capacity,
                status,
            } => {
                let capacity = if clear_capacity {
                    Some(None)
                } else {
                    capacity.map(Some)
                };
                let req = UpdateFloorPlanRequest {
                    name,
                    floor_number,
                    width_m,
                    length_m,
                    capacity,
                    status,
                    ..Default::default()
                };
                let plan = client.update_floor_plan(id, version, &req).await?;
                println!("{}", updated(format, &plan, pretty::format_floor_plan));
            }
            FloorPlansAction::Archive { id, version } => {
                let plan = client.archive_floor_plan(id, version).await?;
                if !cli.quiet {
                    println!("{}", render(&plan, format, |p| format!("Archived floor plan {}", p.id)));
                }
            }
        },
        Commands::Leases(cmd) => match cmd.action {
            LeasesAction::List {
                property_id,
                tenant_id,
                status,
                page,
            } => {
                let scope = match (property_id, tenant_id) {
                    (Some(id), _) => LeaseScope::Property(id),
                    (None, Some(id)) => LeaseScope::Tenant(id),
                    (None, None) => {
                        return Err(ClientError::InvalidInput(
                            "one of --property-id or --tenant-id is required".to_string(),
                        )
                        .into())
                    }
                };
                let mut query = ListLeasesQuery::new(scope);
                query.status = status;
                query.include_archived = page.include_archived;
                query.limit = page.limit;
                query.offset = page.offset;
                let leases = client.list_leases(&query).await?;
                println!("{}", render(&leases, format, pretty::format_leases));
            }
            LeasesAction::Create {
                property_id,
                tenant_id,
                unit,
                start_date,
                end_date,
                monthly_rent_cents,
                deposit_cents,
                currency,
            } => {
                let req = CreateLeaseRequest {
                    property_id,
                    tenant_id,
                    unit,
                    start_date,
                    end_date,
                    monthly_rent_cents,
                    deposit_cents,
                    currency,
                    terms: None,
                };
                let lease = client.create_lease(&req).await?;
                println!("{}", created(format, &lease, pretty::format_lease));
            }
            LeasesAction::Get { id } => {
                let lease = client.get_lease(id).await?;
                println!("{}", render(&lease, format, pretty::format_lease));
            }
            LeasesAction::Update {
                id,
                version,
                unit,
                start_date,
                end_date,
                monthly_rent_cents,
                deposit_cents,
                status,
            } => {
                let req = UpdateLeaseRequest {
                    unit,
                    start_date,
                    end_date,
                    monthly_rent_cents,
                    deposit_cents,
                    status,
                    ..Default::default()
                };
                let lease = client.update_lease(id, version, &req).await?;
                println!("{}", updated(format, &lease, pretty::format_lease));
            }
            LeasesAction::Archive { id, version } => {
                let lease = client.archive_lease(id, version).await?;
                if !cli.quiet {
                    println!("{}", render(&lease, format, |l| format!("Archived lease {}", l.id)));
                }
            }
        },
        Commands::Users(cmd) => match cmd.action {
            UsersAction::List { role, status, page } => {
                let users = client
                    .list_users(&ListUsersQuery {
                        role,
                        status,
                        include_archived: page.include_archived,
                        limit: page.limit,
                        offset: page.offset,
                    })
                    .await?;
                println!("{}", render(&users, format, pretty::format_users));
            }
            UsersAction::Create { name, email, role } => {
                let mut req = CreateUserRequest::new(name, email);
                if let Some(role) = role {
                    req = req.with_role(role);
                }
                let user = client.create_user(&req).await?;
                println!("{}", created(format, &user, pretty::format_user));
            }
            UsersAction::Get { id } => {
                let user = client.get_user(id).await?;
                println!("{}", render(&user, format, pretty::format_user));
            }
            UsersAction::Update {
                id,
                version,
                name,
                email,
                role,
                status,
            } => {
                let req = UpdateUserRequest {
                    name,
                    email,
                    role,
                    status,
                    ..Default::default()
                };
                let user = client.update_user(id, version, &req).await?;
                println!("{}", updated(format, &user, pretty::format_user));
            }
            UsersAction::Archive { id, version } => {
                let user = client.archive_user(id, version).await?;
                if !cli.quiet {
                    println!("{}", render(&user, format, |u| format!("Archived user {}", u.id)));
                }
            }
        },
        Commands::Occupancy(cmd) => match cmd.action {
            OccupancyAction::Record {
                property_id,
                count,
                floor_plan_id,
                capacity,
                recorded_at,
            } => {
                let mut reading = RecordOccupancyRequest::new(property_id, count);
                reading.floor_plan_id = floor_plan_id;
                reading.capacity = capacity;
                reading.recorded_at = recorded_at;
                let readings = client.ingest_readings(vec![reading]).await?;
                println!("{}", render(&readings, format, |r| pretty::format_readings(r)));
            }
            OccupancyAction::Ingest { file } => {
                let readings: Vec<RecordOccupancyRequest> = read_json(&file).await?;
                let readings = client.ingest_readings(readings).await?;
                println!("{}", render(&readings, format, |r| pretty::format_readings(r)));
            }
            OccupancyAction::List {
                property_id,
                from,
                to,
                include_invalidated,
            } => {
                let query = ReadingsQuery {
                    from,
                    to,
                    include_invalidated,
                    ..ReadingsQuery::new(property_id)
                };
                let readings = client.list_readings(&query).await?;
                println!("{}", render(&readings, format, |r| pretty::format_readings(r)));
            }
            OccupancyAction::Latest { property_id } => {
                let latest = client.latest_reading(property_id).await?;
                println!("{}", render(&latest, format, pretty::format_latest));
            }
            OccupancyAction::Rollup {
                property_id,
                from,
                to,
            } => {
                let query = ReadingsQuery {
                    from,
                    to,
                    ..ReadingsQuery::new(property_id)
                };
                let rows = client.hourly_rollup(&query).await?;
                println!("{}", render(&rows, format, |r| pretty::format_rollup(r)));
            }
            OccupancyAction::Get { id } => {
                let reading = client.get_reading(id).await?;
                println!("{}", render(&reading, format, pretty::format_reading));
            }
            OccupancyAction::Invalidate { id } => {
                let reading = client.invalidate_reading(id).await?;
                println!("{}", render(&reading, format, pretty::format_reading));
            }
            OccupancyAction::Purge { retention_days } => {
                let report = client.purge_readings(retention_days).await?;
                println!("{}", render(&report, format, pretty::format_retention));
            }
            OccupancyAction::Watch {
                property_id,
                last_event_id,
            } => {
                if !cli.quiet {
                    eprintln!("Watching occupancy for property {property_id}...");
                }
                let options = StreamOptions {
                    last_event_id,
                    ..StreamOptions::default()
                };
                let stream = watch_occupancy(client, property_id, options);
                tokio::pin!(stream);
                loop {
                    tokio::select! {
                        update = stream.next() => match update {
                            Some(update) => {
                                println!("{}", render(&update, format, pretty::format_stream_update));
                            }
                            None => break,
                        },
                        _ = tokio::signal::ctrl_c() => break,
                    }
                }
            }
        },
        Commands::Health(cmd) => match cmd.action {
            HealthAction::Live => {
                client.livez().await?;
                if !cli.quiet {
                    println!("Live");
                }
            }
            HealthAction::Ready => {
                let readiness = client.readyz().await?;
                println!("{}", render(&readiness, format, pretty::format_readiness));
                if !readiness.healthy {
                    std::process::exit(1);
                }
            }
        },
    }

    Ok(())
}

fn created<T: serde::Serialize>(
    format: OutputFormat,
    value: &T,
    pretty: impl FnOnce(&T) -> String,
) -> String {
    render(value, format, |v| format!("Created:\n{}", pretty(v)))
}

fn updated<T: serde::Serialize>(
    format: OutputFormat,
    value: &T,
    pretty: impl FnOnce(&T) -> String,
) -> String {
    render(value, format, |v| format!("Updated:\n{}", pretty(v)))
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ClientError> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}
