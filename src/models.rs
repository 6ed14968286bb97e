use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::access::Owned;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A colonist record from the `users` table. Identity `1` is the superuser.
/// The password hash is loaded for credential checks but never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub surname: String,
    pub name: String,
    pub age: i32,
    pub position: String,
    pub speciality: String,
    pub address: String,
    // Home town, the toponym fed to the geocoder.
    pub city_from: String,
    // Unique across all users (enforced by `users_email_key`).
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    #[schema(ignore)]
    pub hashed_password: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Job
///
/// A work item from the `jobs` table. `user_id` is the owning principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Job {
    pub id: i64,
    // User id of the team leader; checked to exist only when the job is created.
    pub team_leader: i64,
    pub job: String,
    pub work_size: i32,
    pub collaborators: String,
    pub is_finished: bool,
    pub user_id: i64,
}

/// Department
///
/// A department record from the `departments` table. `user_id` is the owning principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Department {
    pub id: i64,
    pub title: String,
    // User id of the chief; checked to exist only when the department is created.
    pub chief: i64,
    pub members: String,
    pub email: String,
    pub user_id: i64,
}

impl Owned for Job {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for Department {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

// --- Insert Shapes (Store input, id not yet assigned) ---

/// NewUser
///
/// A validated registration with an already-hashed password.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub surname: String,
    pub name: String,
    pub age: i32,
    pub position: String,
    pub speciality: String,
    pub address: String,
    pub city_from: String,
    pub email: String,
    pub hashed_password: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub team_leader: i64,
    pub job: String,
    pub work_size: i32,
    pub collaborators: String,
    pub is_finished: bool,
    pub user_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewDepartment {
    pub title: String,
    pub chief: i64,
    pub members: String,
    pub email: String,
    pub user_id: i64,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterUserRequest
///
/// Input payload for `POST /register`. `hometown` is stored as `city_from`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterUserRequest {
    #[schema(example = "a@x.com")]
    pub email: String,
    pub password: String,
    pub password_again: String,
    pub surname: String,
    pub name: String,
    pub age: i32,
    pub position: String,
    pub speciality: String,
    pub address: String,
    #[schema(example = "Moscow")]
    pub hometown: String,
}

/// LoginRequest
///
/// Input payload for `POST /login`. `remember_me` extends the session lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// LoginResponse
///
/// The bearer token to present on authenticated routes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

/// JobRequest
///
/// Full job payload used by both create (`POST /jobs`) and edit (`PUT /jobs/{id}`).
/// Edits overwrite every mutable field.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct JobRequest {
    pub team_leader: i64,
    #[schema(example = "deployment of residential modules 1 and 2")]
    pub job: String,
    pub work_size: i32,
    #[schema(example = "2, 3")]
    pub collaborators: String,
    #[serde(default)]
    pub is_finished: bool,
}

/// DepartmentRequest
///
/// Full department payload used by both create and edit.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DepartmentRequest {
    pub title: String,
    pub chief: i64,
    pub members: String,
    pub email: String,
}

// --- Internal User API & Profile Schemas (Output) ---

/// UserEnvelope
///
/// Body of `GET /api/users/{id}`: `{ "user": { ... } }`. The enrichment pipeline
/// reads `surname` and `city_from` out of this document.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserEnvelope {
    pub user: User,
}

/// UserList
///
/// Body of `GET /api/users`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserList {
    pub users: Vec<User>,
}

/// HometownView
///
/// Result of a completed enrichment run: the user document plus where the
/// satellite image of their home town was written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct HometownView {
    pub user_id: i64,
    pub surname: String,
    pub city_from: String,
    // "<lon> <lat>" as returned by the geocoder.
    pub coordinates: String,
    pub image: String,
}
