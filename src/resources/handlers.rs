use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::{ActiveUser, ResourcesRead, ResourcesWrite},
    errors::ApiError,
    resources::dto::{CreateResource, QueryParams, ReplaceResource, ResourceUpdate},
    resources::repo::Resource,
    state::AppState,
};

pub fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/resources", get(get_resources).post(create_resource))
        .route(
            "/resources/:id",
            get(get_resource)
                .patch(update_resource)
                .put(replace_resource)
                .delete(delete_resource),
        )
}

/// Get a page of resources, optionally filtered by name.
#[instrument(skip_all, fields(q = ?query.q, skip = query.skip, size = query.size))]
pub async fn get_resources(
    State(state): State<AppState>,
    _user: ActiveUser<ResourcesRead>,
    Query(query): Query<QueryParams>,
) -> Result<Json<Vec<Resource>>, ApiError> {
    if let Err(reason) = query.validate() {
        return Err(ApiError::invalid_request("invalid query")
            .with_ctx(serde_json::json!({ "reason": reason })));
    }
    Resource::list(&state.db, query.q.as_deref(), query.skip, query.size)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "list resources failed");
            ApiError::database("unable to get resources")
                .with_ctx(serde_json::json!({ "error": e.to_string() }))
        })
}

/// Get a single resource.
#[instrument(skip_all, fields(%id))]
pub async fn get_resource(
    State(state): State<AppState>,
    _user: ActiveUser<ResourcesRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<Resource>, ApiError> {
    let resource = Resource::get(&state.db, id).await.map_err(|e| {
        error!(error = %e, %id, "get resource failed");
        ApiError::database("unable to get resource")
            .with_input(serde_json::json!(id))
            .with_ctx(serde_json::json!({ "error": e.to_string() }))
    })?;
    resource.map(Json).ok_or_else(|| {
        ApiError::not_found("resource not found").with_input(serde_json::json!(id))
    })
}

/// Create a resource.
#[instrument(skip_all)]
pub async fn create_resource(
    State(state): State<AppState>,
    _user: ActiveUser<ResourcesWrite>,
    Json(body): Json<CreateResource>,
) -> Result<(StatusCode, Json<Resource>), ApiError> {
    if body.name.is_empty() {
        return Err(ApiError::invalid_request("invalid resource")
            .with_ctx(serde_json::json!({ "reason": "name must not be empty" })));
    }
    let resource = Resource {
        id: body.id,
        name: body.name,
        data: body.data,
    };
    let created = Resource::insert(&state.db, &resource).await.map_err(|e| {
        error!(error = %e, id = %resource.id, "create resource failed");
        ApiError::database("unable to create resource")
            .with_input(serde_json::json!(resource))
            .with_ctx(serde_json::json!({ "error": e.to_string() }))
    })?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a resource in place.
#[instrument(skip_all, fields(%id))]
pub async fn update_resource(
    State(state): State<AppState>,
    _user: ActiveUser<ResourcesWrite>,
    Path(id): Path<Uuid>,
    Json(update): Json<ResourceUpdate>,
) -> Result<Json<Resource>, ApiError> {
    if let Some(name) = &update.name {
        if name.is_empty() {
            return Err(ApiError::invalid_request("invalid resource")
                .with_input(serde_json::json!({ "id": id }))
                .with_ctx(serde_json::json!({ "reason": "name must not be empty" })));
        }
    }
    let updated = Resource::update(&state.db, id, &update).await.map_err(|e| {
        error!(error = %e, %id, "update resource failed");
        ApiError::database("unable to update resource")
            .with_input(serde_json::json!({ "id": id }))
            .with_ctx(serde_json::json!({ "error": e.to_string() }))
    })?;
    updated.map(Json).ok_or_else(|| {
        ApiError::not_found("resource not found").with_input(serde_json::json!({ "id": id }))
    })
}

/// Replace a resource, creating it when the id is new.
#[instrument(skip_all, fields(%id))]
pub async fn replace_resource(
    State(state): State<AppState>,
    _user: ActiveUser<ResourcesWrite>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReplaceResource>,
) -> Result<Json<Resource>, ApiError> {
    if body.name.is_empty() {
        return Err(ApiError::invalid_request("invalid resource")
            .with_input(serde_json::json!({ "id": id }))
            .with_ctx(serde_json::json!({ "reason": "name must not be empty" })));
    }
    let resource = Resource {
        id,
        name: body.name,
        data: body.data,
    };
    Resource::upsert(&state.db, &resource)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, %id, "replace resource failed");
            ApiError::database("unable to replace resource")
                .with_input(serde_json::json!(resource))
                .with_ctx(serde_json::json!({ "error": e.to_string() }))
        })
}

/// Delete a resource.
#[instrument(skip_all, fields(%id))]
pub async fn delete_resource(
    State(state): State<AppState>,
    _user: ActiveUser<ResourcesWrite>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = Resource::get(&state.db, id).await.map_err(|e| {
        error!(error = %e, %id, "get resource for delete failed");
        ApiError::database("unable to get resource for delete")
            .with_input(serde_json::json!(id))
            .with_ctx(serde_json::json!({ "error": e.to_string() }))
    })?;
    if existing.is_none() {
        return Err(ApiError::not_found("resource not found").with_input(serde_json::json!(id)));
    }
    Resource::delete(&state.db, id).await.map_err(|e| {
        error!(error = %e, %id, "delete resource failed");
        ApiError::database("unable to delete resource")
            .with_input(serde_json::json!(id))
            .with_ctx(serde_json::json!({ "error": e.to_string() }))
    })?;
    Ok(StatusCode::NO_CONTENT)
}
