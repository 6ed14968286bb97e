use crate::errors::StoreError;
use crate::models::{Department, Job, NewDepartment, NewJob, NewUser, User};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::{Arc, RwLock};

/// Repository Trait
///
/// The Resource Store contract. Handlers and the Resource Manager only ever
/// see `Arc<dyn Repository>`, so the Postgres store and the in-memory store
/// are interchangeable.
///
/// Lookups return `Ok(None)` on absence. Mutations commit immediately.
/// `update_*`/`delete_*` operate on a record the caller has already fetched
/// and authorized.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    // Fails with `StoreError::ConstraintViolation` on a duplicate email.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    // --- Jobs ---
    async fn create_job(&self, job: NewJob) -> Result<Job, StoreError>;
    async fn get_job(&self, id: i64) -> Result<Option<Job>, StoreError>;
    async fn update_job(&self, job: &Job) -> Result<Job, StoreError>;
    async fn delete_job(&self, id: i64) -> Result<(), StoreError>;
    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError>;

    // --- Departments ---
    async fn create_department(&self, department: NewDepartment) -> Result<Department, StoreError>;
    async fn get_department(&self, id: i64) -> Result<Option<Department>, StoreError>;
    async fn update_department(&self, department: &Department) -> Result<Department, StoreError>;
    async fn delete_department(&self, id: i64) -> Result<(), StoreError>;
    async fn list_departments(&self) -> Result<Vec<Department>, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, surname, name, age, position, speciality, address, city_from, email, hashed_password, created_at";
const JOB_COLUMNS: &str = "id, team_leader, job, work_size, collaborators, is_finished, user_id";
const DEPARTMENT_COLUMNS: &str = "id, title, chief, members, email, user_id";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps the unique-index violation on `users.email` to a constraint error.
fn map_user_insert_error(err: sqlx::Error, email: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::ConstraintViolation(format!("user with email {email} already exists"))
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// create_user
    ///
    /// Inserts a user. The unique index on `email` is the final arbiter of the
    /// uniqueness invariant, even when two registrations race.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let query = format!(
            "INSERT INTO users (surname, name, age, position, speciality, address, city_from, email, hashed_password, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&user.surname)
            .bind(&user.name)
            .bind(user.age)
            .bind(&user.position)
            .bind(&user.speciality)
            .bind(&user.address)
            .bind(&user.city_from)
            .bind(&user.email)
            .bind(&user.hashed_password)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_user_insert_error(e, &user.email))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        Ok(sqlx::query_as::<_, User>(&query).fetch_all(&self.pool).await?)
    }

    // --- JOBS ---

    async fn create_job(&self, job: NewJob) -> Result<Job, StoreError> {
        let query = format!(
            "INSERT INTO jobs (team_leader, job, work_size, collaborators, is_finished, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {JOB_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Job>(&query)
            .bind(job.team_leader)
            .bind(&job.job)
            .bind(job.work_size)
            .bind(&job.collaborators)
            .bind(job.is_finished)
            .bind(job.user_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_job(&self, id: i64) -> Result<Option<Job>, StoreError> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        Ok(sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// update_job
    ///
    /// Overwrites every mutable column. Ownership (`user_id`) is never rewritten.
    async fn update_job(&self, job: &Job) -> Result<Job, StoreError> {
        let query = format!(
            "UPDATE jobs SET team_leader = $2, job = $3, work_size = $4, collaborators = $5, is_finished = $6 \
             WHERE id = $1 RETURNING {JOB_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Job>(&query)
            .bind(job.id)
            .bind(job.team_leader)
            .bind(&job.job)
            .bind(job.work_size)
            .bind(&job.collaborators)
            .bind(job.is_finished)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_job(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY id");
        Ok(sqlx::query_as::<_, Job>(&query).fetch_all(&self.pool).await?)
    }

    // --- DEPARTMENTS ---

    async fn create_department(&self, department: NewDepartment) -> Result<Department, StoreError> {
        let query = format!(
            "INSERT INTO departments (title, chief, members, email, user_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {DEPARTMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Department>(&query)
            .bind(&department.title)
            .bind(department.chief)
            .bind(&department.members)
            .bind(&department.email)
            .bind(department.user_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_department(&self, id: i64) -> Result<Option<Department>, StoreError> {
        let query = format!("SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = $1");
        Ok(sqlx::query_as::<_, Department>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_department(&self, department: &Department) -> Result<Department, StoreError> {
        let query = format!(
            "UPDATE departments SET title = $2, chief = $3, members = $4, email = $5 \
             WHERE id = $1 RETURNING {DEPARTMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Department>(&query)
            .bind(department.id)
            .bind(&department.title)
            .bind(department.chief)
            .bind(&department.members)
            .bind(&department.email)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_department(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        let query = format!("SELECT {DEPARTMENT_COLUMNS} FROM departments ORDER BY id");
        Ok(sqlx::query_as::<_, Department>(&query).fetch_all(&self.pool).await?)
    }
}

// --- In-Memory Implementation ---

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    jobs: Vec<Job>,
    departments: Vec<Department>,
    next_user_id: i64,
    next_job_id: i64,
    next_department_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// InMemoryRepository
///
/// A process-local `Repository` holding rows in insertion order. Enforces the
/// same email uniqueness rule as the Postgres schema and hands out ids from 1
/// upward, so the first registered user is the superuser. Used by the test
/// suite to exercise handlers and the Resource Manager without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.write();
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::ConstraintViolation(format!(
                "user with email {} already exists",
                user.email
            )));
        }
        let created = User {
            id: next_id(&mut tables.next_user_id),
            surname: user.surname,
            name: user.name,
            age: user.age,
            position: user.position,
            speciality: user.speciality,
            address: user.address,
            city_from: user.city_from,
            email: user.email,
            hashed_password: user.hashed_password,
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read().users.clone())
    }

    async fn create_job(&self, job: NewJob) -> Result<Job, StoreError> {
        let mut tables = self.write();
        let created = Job {
            id: next_id(&mut tables.next_job_id),
            team_leader: job.team_leader,
            job: job.job,
            work_size: job.work_size,
            collaborators: job.collaborators,
            is_finished: job.is_finished,
            user_id: job.user_id,
        };
        tables.jobs.push(created.clone());
        Ok(created)
    }

    async fn get_job(&self, id: i64) -> Result<Option<Job>, StoreError> {
        Ok(self.read().jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn update_job(&self, job: &Job) -> Result<Job, StoreError> {
        let mut tables = self.write();
        let slot = tables
            .jobs
            .iter_mut()
            .find(|j| j.id == job.id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        *slot = Job {
            user_id: slot.user_id,
            ..job.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_job(&self, id: i64) -> Result<(), StoreError> {
        self.write().jobs.retain(|j| j.id != id);
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.read().jobs.clone())
    }

    async fn create_department(&self, department: NewDepartment) -> Result<Department, StoreError> {
        let mut tables = self.write();
        let created = Department {
            id: next_id(&mut tables.next_department_id),
            title: department.title,
            chief: department.chief,
            members: department.members,
            email: department.email,
            user_id: department.user_id,
        };
        tables.departments.push(created.clone());
        Ok(created)
    }

    async fn get_department(&self, id: i64) -> Result<Option<Department>, StoreError> {
        Ok(self.read().departments.iter().find(|d| d.id == id).cloned())
    }

    async fn update_department(&self, department: &Department) -> Result<Department, StoreError> {
        let mut tables = self.write();
        let slot = tables
            .departments
            .iter_mut()
            .find(|d| d.id == department.id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        *slot = Department {
            user_id: slot.user_id,
            ..department.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_department(&self, id: i64) -> Result<(), StoreError> {
        self.write().departments.retain(|d| d.id != id);
        Ok(())
    }

    async fn list_departments(&self) -> Result<Vec<Department>, StoreError> {
        Ok(self.read().departments.clone())
    }
}
