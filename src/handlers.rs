use crate::{
    AppState,
    access::Principal,
    auth::issue_token,
    enrichment::EnrichmentFailed,
    errors::ManagerError,
    extract::{JsonBody, RecordId},
    models::{
        Department, DepartmentRequest, HometownView, Job, JobRequest, LoginRequest,
        LoginResponse, RegisterUserRequest, User, UserEnvelope, UserList,
    },
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

// --- Session & Registration ---

/// register_user
///
/// [Public Route] Creates an account. A duplicate email is rejected with 409
/// and no second account is created.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Passwords do not match")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterUserRequest>,
) -> Result<(StatusCode, Json<User>), ManagerError> {
    let user = state.manager().register_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// login
///
/// [Public Route] Verifies credentials and issues a session token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 401, description = "Incorrect login or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ManagerError> {
    let user = state
        .manager()
        .authenticate(&payload.email, &payload.password)
        .await?;
    let (token, expires_at) = issue_token(&state.config, user.id, payload.remember_me)?;
    tracing::info!(user_id = user.id, "session issued");
    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        expires_at,
    }))
}

/// get_me
///
/// [Authenticated Route] The acting principal's own user record.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<User>, ManagerError> {
    state
        .repo
        .get_user(principal.id)
        .await?
        .map(Json)
        .ok_or(ManagerError::NotFoundOrForbidden)
}

// --- Jobs ---

/// list_jobs
///
/// [Public Route] Every job, in storage order.
#[utoipa::path(
    get,
    path = "/jobs",
    responses((status = 200, description = "All jobs", body = [Job]))
)]
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<Vec<Job>>, ManagerError> {
    Ok(Json(state.manager().list_jobs().await?))
}

/// create_job
///
/// [Authenticated Route] The acting principal becomes the owner. A team leader
/// that does not exist is rejected with 422.
#[utoipa::path(
    post,
    path = "/jobs",
    request_body = JobRequest,
    responses(
        (status = 201, description = "Created", body = Job),
        (status = 422, description = "Team leader does not exist")
    )
)]
pub async fn create_job(
    principal: Principal,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<JobRequest>,
) -> Result<(StatusCode, Json<Job>), ManagerError> {
    let job = state.manager().create_job(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// get_job
///
/// [Authenticated Route] Gated fetch of one job, used to prefill an edit.
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    params(("id" = i64, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Found", body = Job),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn get_job(
    principal: Principal,
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<Job>, ManagerError> {
    Ok(Json(state.manager().get_job(&principal, id).await?))
}

/// update_job
///
/// [Authenticated Route] Owner or superuser only. Anyone else gets the same
/// 404 as for a job that does not exist.
#[utoipa::path(
    put,
    path = "/jobs/{id}",
    params(("id" = i64, Path, description = "Job ID")),
    request_body = JobRequest,
    responses(
        (status = 200, description = "Updated", body = Job),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn update_job(
    principal: Principal,
    State(state): State<AppState>,
    RecordId(id): RecordId,
    JsonBody(payload): JsonBody<JobRequest>,
) -> Result<Json<Job>, ManagerError> {
    Ok(Json(state.manager().edit_job(&principal, id, payload).await?))
}

/// delete_job
///
/// [Authenticated Route] Owner or superuser only.
#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    params(("id" = i64, Path, description = "Job ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn delete_job(
    principal: Principal,
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<StatusCode, ManagerError> {
    state.manager().delete_job(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Departments ---

/// list_departments
///
/// [Public Route] Every department, in storage order.
#[utoipa::path(
    get,
    path = "/departments",
    responses((status = 200, description = "All departments", body = [Department]))
)]
pub async fn list_departments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Department>>, ManagerError> {
    Ok(Json(state.manager().list_departments().await?))
}

/// create_department
///
/// [Authenticated Route] The chief must be an existing user.
#[utoipa::path(
    post,
    path = "/departments",
    request_body = DepartmentRequest,
    responses(
        (status = 201, description = "Created", body = Department),
        (status = 422, description = "Chief does not exist")
    )
)]
pub async fn create_department(
    principal: Principal,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<DepartmentRequest>,
) -> Result<(StatusCode, Json<Department>), ManagerError> {
    let department = state.manager().create_department(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

#[utoipa::path(
    get,
    path = "/departments/{id}",
    params(("id" = i64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Found", body = Department),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn get_department(
    principal: Principal,
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<Department>, ManagerError> {
    Ok(Json(state.manager().get_department(&principal, id).await?))
}

#[utoipa::path(
    put,
    path = "/departments/{id}",
    params(("id" = i64, Path, description = "Department ID")),
    request_body = DepartmentRequest,
    responses(
        (status = 200, description = "Updated", body = Department),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn update_department(
    principal: Principal,
    State(state): State<AppState>,
    RecordId(id): RecordId,
    JsonBody(payload): JsonBody<DepartmentRequest>,
) -> Result<Json<Department>, ManagerError> {
    Ok(Json(
        state
            .manager()
            .edit_department(&principal, id, payload)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/departments/{id}",
    params(("id" = i64, Path, description = "Department ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn delete_department(
    principal: Principal,
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<StatusCode, ManagerError> {
    state.manager().delete_department(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Internal User API ---

/// list_api_users
///
/// [Public Route] All users.
#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "All users", body = UserList))
)]
pub async fn list_api_users(State(state): State<AppState>) -> Result<Json<UserList>, ManagerError> {
    let users = state.repo.list_users().await?;
    Ok(Json(UserList { users }))
}

/// get_api_user
///
/// [Public Route] `{ "user": { ... } }` for one user. This is the document the
/// hometown view reads back.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserEnvelope),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_api_user(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<UserEnvelope>, ManagerError> {
    state
        .repo
        .get_user(id)
        .await?
        .map(|user| Json(UserEnvelope { user }))
        .ok_or(ManagerError::NotFoundOrForbidden)
}

// --- Hometown Enrichment ---

/// get_hometown
///
/// [Public Route] Geocodes the user's home town, fetches a satellite image of
/// it and stores the image. Upstream failures come back as 502 naming the
/// failed stage.
#[utoipa::path(
    get,
    path = "/users/{id}/hometown",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Image written", body = HometownView),
        (status = 502, description = "Enrichment failed")
    )
)]
pub async fn get_hometown(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<HometownView>, EnrichmentFailed> {
    Ok(Json(state.hometown.render(id).await?))
}
