use std::time::Duration;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{
        floor_plans::{
            archive_floor_plan, bulk_create_floor_plans, create_floor_plan, get_floor_plan,
            list_floor_plans, update_floor_plan,
        },
        health::{livez, readyz},
        leases::{archive_lease, create_lease, get_lease, list_leases, update_lease},
        occupancy::{
            get_reading, hourly_rollup, ingest_readings, invalidate_reading, latest_reading,
            list_readings, occupancy_stream, purge_readings,
        },
        properties::{
            archive_property, create_property, get_property, list_properties, update_property,
        },
        users::{archive_user, create_user, get_user, list_users, update_user},
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::IF_MATCH,
            header::IF_NONE_MATCH,
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("last-event-id"),
        ])
        .expose_headers([header::ETAG, header::LOCATION]);

    let api_routes = Router::new()
        // Property routes
        .route("/properties", get(list_properties).post(create_property))
        .route(
            "/properties/{id}",
            get(get_property)
                .patch(update_property)
                .delete(archive_property),
        )
        // Floor plan routes
        .route(
            "/floor-plans",
            get(list_floor_plans).post(create_floor_plan),
        )
        .route("/floor-plans/bulk", post(bulk_create_floor_plans))
        .route(
            "/floor-plans/{id}",
            get(get_floor_plan)
                .patch(update_floor_plan)
                .delete(archive_floor_plan),
        )
        // Lease routes
        .route("/leases", get(list_leases).post(create_lease))
        .route(
            "/leases/{id}",
            get(get_lease).patch(update_lease).delete(archive_lease),
        )
        // User routes
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(archive_user),
        )
        // Occupancy routes
        .route("/occupancy", get(list_readings).post(ingest_readings))
        .route("/occupancy/latest", get(latest_reading))
        .route("/occupancy/rollup", get(hourly_rollup))
        .route("/occupancy/stream", get(occupancy_stream))
        .route("/occupancy/retention", post(purge_readings))
        .route(
            "/occupancy/{id}",
            get(get_reading).delete(invalidate_reading),
        )
        .layer(cors);

    Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}

#[cfg(all(test, feature = "inmemory", feature = "memory"))]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, Response},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn patch_json(uri: &str, if_match: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::PATCH)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(tag) = if_match {
            builder = builder.header(header::IF_MATCH, tag);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn create_property(app: &Router) -> Value {
        let response = send(
            app,
            post_json(
                "/api/v1/properties",
                json!({"name": "Dockside", "address": "1 Quay"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"].clone()
    }

    #[tokio::test]
    async fn test_probes() {
        let app = create_app(AppState::default());

        assert_eq!(send(&app, get("/livez")).await.status(), StatusCode::OK);
        let ready = send(&app, get("/readyz")).await;
        assert_eq!(ready.status(), StatusCode::OK);
        assert_eq!(body_json(ready).await["healthy"], true);
    }

    #[tokio::test]
    async fn test_create_property_headers_and_envelope() {
        let app = create_app(AppState::default());

        let response = send(
            &app,
            post_json(
                "/api/v1/properties",
                json!({"name": "Dockside", "address": "1 Quay"}),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        let etag = response.headers()[header::ETAG].to_str().unwrap().to_string();
        let json = body_json(response).await;
        let id = json["data"]["id"].as_str().unwrap();

        assert_eq!(json["success"], true);
        assert!(json["timestamp"].is_string());
        assert_eq!(json["data"]["status"], "ACTIVE");
        assert_eq!(json["data"]["version"], 1);
        assert_eq!(location, format!("/api/v1/properties/{id}"));
        assert_eq!(etag, format!("\"{id}-1\""));
    }

    #[tokio::test]
    async fn test_get_honours_if_none_match() {
        let app = create_app(AppState::default());
        let property = create_property(&app).await;
        let uri = format!("/api/v1/properties/{}", property["id"].as_str().unwrap());

        let first = send(&app, get(&uri)).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()[header::CACHE_CONTROL], "private, max-age=300");
        let etag = first.headers()[header::ETAG].clone();

        let second = send(
            &app,
            Request::builder()
                .uri(&uri)
                .header(header::IF_NONE_MATCH, etag)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        let body = second.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_patch_version_rules() {
        let app = create_app(AppState::default());
        let property = create_property(&app).await;
        let id = property["id"].as_str().unwrap();
        let uri = format!("/api/v1/properties/{id}");

        let missing = send(&app, patch_json(&uri, None, json!({"name": "Quayside"}))).await;
        assert_eq!(missing.status(), StatusCode::PRECONDITION_REQUIRED);
        assert_eq!(
            body_json(missing).await["error"]["code"],
            "PRECONDITION_REQUIRED"
        );

        let tag = format!("\"{id}-1\"");
        let updated = send(
            &app,
            patch_json(&uri, Some(&tag), json!({"name": "Quayside"})),
        )
        .await;
        assert_eq!(updated.status(), StatusCode::OK);
        assert_eq!(updated.headers()[header::ETAG], format!("\"{id}-2\"").as_str());
        assert_eq!(body_json(updated).await["data"]["name"], "Quayside");

        let stale = send(
            &app,
            patch_json(&uri, Some(&tag), json!({"name": "Again"})),
        )
        .await;
        assert_eq!(stale.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(stale).await["error"]["code"], "VERSION_CONFLICT");

        let fresh = send(&app, get(&uri)).await;
        assert_eq!(body_json(fresh).await["data"]["name"], "Quayside");
    }

    #[tokio::test]
    async fn test_validation_errors_list_fields() {
        let app = create_app(AppState::default());
        let property = create_property(&app).await;

        let response = send(
            &app,
            post_json(
                "/api/v1/floor-plans",
                json!({
                    "property_id": property["id"],
                    "name": "Ground",
                    "floor_number": 0,
                    "width_m": -1.0,
                    "length_m": 10.0
                }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["details"][0]["field"], "width_m");
    }

    #[tokio::test]
    async fn test_bad_query_uses_error_envelope() {
        let app = create_app(AppState::default());

        let response = send(&app, get("/api/v1/floor-plans")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_archive_then_list_hides_property() {
        let app = create_app(AppState::default());
        let property = create_property(&app).await;
        let uri = format!("/api/v1/properties/{}", property["id"].as_str().unwrap());

        let archived = send(
            &app,
            Request::builder()
                .method(Method::DELETE)
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(archived.status(), StatusCode::OK);
        assert_eq!(body_json(archived).await["data"]["status"], "ARCHIVED");

        let listed = body_json(send(&app, get("/api/v1/properties")).await).await;
        assert_eq!(listed["data"]["total"], 0);
        assert_eq!(listed["data"]["limit"], 50);

        let with_archived =
            body_json(send(&app, get("/api/v1/properties?include_archived=true")).await).await;
        assert_eq!(with_archived["data"]["total"], 1);
    }

    #[tokio::test]
    async fn test_bulk_floor_plans_are_all_or_nothing() {
        let app = create_app(AppState::default());
        let property = create_property(&app).await;
        let item = |width: f64| {
            json!({
                "property_id": property["id"],
                "name": "Level",
                "floor_number": 1,
                "width_m": width,
                "length_m": 10.0
            })
        };

        let rejected = send(
            &app,
            post_json(
                "/api/v1/floor-plans/bulk",
                json!({"items": [item(10.0), item(0.0)]}),
            ),
        )
        .await;
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(rejected).await["error"]["details"][0]["field"],
            "items[1].width_m"
        );

        let uri = format!(
            "/api/v1/floor-plans?property_id={}",
            property["id"].as_str().unwrap()
        );
        assert_eq!(body_json(send(&app, get(&uri)).await).await["data"]["total"], 0);

        let accepted = send(
            &app,
            post_json(
                "/api/v1/floor-plans/bulk",
                json!({"items": [item(10.0), item(12.0)]}),
            ),
        )
        .await;
        assert_eq!(accepted.status(), StatusCode::CREATED);
        assert_eq!(body_json(send(&app, get(&uri)).await).await["data"]["total"], 2);
    }

    #[tokio::test]
    async fn test_occupancy_ingest_and_latest() {
        let app = create_app(AppState::default());
        let property = create_property(&app).await;
        let property_id = property["id"].as_str().unwrap();
        let latest_uri = format!("/api/v1/occupancy/latest?property_id={property_id}");

        let empty = body_json(send(&app, get(&latest_uri)).await).await;
        assert!(empty["data"].is_null());

        let ingested = send(
            &app,
            post_json(
                "/api/v1/occupancy",
                json!({"readings": [
                    {"property_id": property_id, "occupant_count": 12},
                ]}),
            ),
        )
        .await;
        assert_eq!(ingested.status(), StatusCode::CREATED);
        let reading_id = body_json(ingested).await["data"][0]["id"].clone();

        let latest = body_json(send(&app, get(&latest_uri)).await).await;
        assert_eq!(latest["data"]["id"], reading_id);
        assert_eq!(latest["data"]["occupant_count"], 12);

        let invalidated = send(
            &app,
            Request::builder()
                .method(Method::DELETE)
                .uri(format!(
                    "/api/v1/occupancy/{}",
                    reading_id.as_str().unwrap()
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(invalidated.status(), StatusCode::OK);
        assert_eq!(body_json(invalidated).await["data"]["status"], "INVALIDATED");

        let after = body_json(send(&app, get(&latest_uri)).await).await;
        assert!(after["data"].is_null());
    }

    #[tokio::test]
    async fn test_rollup_and_retention() {
        let app = create_app(AppState::default());
        let property = create_property(&app).await;
        let property_id = property["id"].as_str().unwrap();

        send(
            &app,
            post_json(
                "/api/v1/occupancy",
                json!({"readings": [
                    {"property_id": property_id, "occupant_count": 4},
                    {"property_id": property_id, "occupant_count": 8},
                ]}),
            ),
        )
        .await;

        let rollup = body_json(
            send(
                &app,
                get(&format!("/api/v1/occupancy/rollup?property_id={property_id}")),
            )
            .await,
        )
        .await;
        let buckets = rollup["data"].as_array().unwrap();
        let total: i64 = buckets
            .iter()
            .map(|b| b["reading_count"].as_i64().unwrap())
            .sum();
        assert_eq!(total, 2);

        let purge = send(&app, post_json("/api/v1/occupancy/retention", json!({}))).await;
        assert_eq!(purge.status(), StatusCode::OK);
        let report = body_json(purge).await;
        assert_eq!(report["data"]["deleted"], 0);
        assert_eq!(report["data"]["retention_days"], 90);
    }

    #[tokio::test]
    async fn test_out_of_range_inputs_are_rejected() {
        let app = create_app(AppState::default());
        let property_id = uuid::Uuid::new_v4();

        let purge = send(
            &app,
            post_json(
                "/api/v1/occupancy/retention",
                json!({"retention_days": 4_000_000_000u32}),
            ),
        )
        .await;
        assert_eq!(purge.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(purge).await["error"]["details"][0]["field"],
            "retention_days"
        );

        let rollup = send(
            &app,
            get(&format!(
                "/api/v1/occupancy/rollup?property_id={property_id}&to=-262143-01-01T00:00:00Z"
            )),
        )
        .await;
        assert_eq!(rollup.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(rollup).await["error"]["details"][0]["field"], "to");

        let stream = send(
            &app,
            get(&format!(
                "/api/v1/occupancy/stream?property_id={property_id}&last_event_id={}",
                u64::MAX
            )),
        )
        .await;
        assert_eq!(stream.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_lease_listing_requires_scope() {
        let app = create_app(AppState::default());

        let response = send(&app, get("/api/v1/leases")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["details"][0]["field"], "property_id");
    }

    #[tokio::test]
    async fn test_actor_header_lands_in_audit_fields() {
        let app = create_app(AppState::default());
        let actor = uuid::Uuid::new_v4();

        let response = send(
            &app,
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/users")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-user-id", actor.to_string())
                .body(Body::from(
                    json!({"name": "Ada", "email": "Ada@Example.com"}).to_string(),
                ))
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["email"], "ada@example.com");
        assert_eq!(json["data"]["created_by"], actor.to_string());
    }
}
