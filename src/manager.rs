use crate::{
    access::{Principal, gate},
    auth::{hash_password, verify_password},
    errors::ManagerError,
    models::{
        Department, DepartmentRequest, Job, JobRequest, NewDepartment, NewJob, NewUser,
        RegisterUserRequest, User,
    },
    repository::RepositoryState,
};

/// ResourceManager
///
/// Orchestrates every mutation of Users, Jobs and Departments. Referential
/// checks run before anything is written; gated operations fetch the
/// candidate by id and pass it through [`gate`] before touching the store.
#[derive(Clone)]
pub struct ResourceManager {
    repo: RepositoryState,
}

impl ResourceManager {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    // --- Users ---

    /// register_user
    ///
    /// Creates an account. The email must not be registered yet; the store's
    /// unique index backs up the pre-check when two registrations race.
    pub async fn register_user(&self, req: RegisterUserRequest) -> Result<User, ManagerError> {
        if req.password != req.password_again {
            return Err(ManagerError::PasswordMismatch);
        }
        if self.repo.get_user_by_email(&req.email).await?.is_some() {
            return Err(ManagerError::ConstraintViolation(format!(
                "user with email {} already exists",
                req.email
            )));
        }

        let hashed_password = hash_password(req.password).await?;
        let user = self
            .repo
            .create_user(NewUser {
                surname: req.surname,
                name: req.name,
                age: req.age,
                position: req.position,
                speciality: req.speciality,
                address: req.address,
                city_from: req.hometown,
                email: req.email,
                hashed_password,
            })
            .await?;

        tracing::info!(user_id = user.id, "registered user");
        Ok(user)
    }

    /// authenticate
    ///
    /// Unknown email and wrong password produce the same outcome.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ManagerError> {
        let user = self
            .repo
            .get_user_by_email(email)
            .await?
            .ok_or(ManagerError::InvalidCredentials)?;

        if verify_password(password.to_string(), user.hashed_password.clone()).await {
            Ok(user)
        } else {
            Err(ManagerError::InvalidCredentials)
        }
    }

    /// Fails with `ReferenceNotFound` unless `id` names an existing user.
    async fn require_user(&self, field: &'static str, id: i64) -> Result<(), ManagerError> {
        match self.repo.get_user(id).await? {
            Some(_) => Ok(()),
            None => Err(ManagerError::ReferenceNotFound { field, id }),
        }
    }

    // --- Jobs ---

    pub async fn list_jobs(&self) -> Result<Vec<Job>, ManagerError> {
        Ok(self.repo.list_jobs().await?)
    }

    /// create_job
    ///
    /// The team leader must exist. The acting principal becomes the owner.
    pub async fn create_job(
        &self,
        principal: &Principal,
        req: JobRequest,
    ) -> Result<Job, ManagerError> {
        self.require_user("team_leader", req.team_leader).await?;

        let job = self
            .repo
            .create_job(NewJob {
                team_leader: req.team_leader,
                job: req.job,
                work_size: req.work_size,
                collaborators: req.collaborators,
                is_finished: req.is_finished,
                user_id: principal.id,
            })
            .await?;

        tracing::info!(job_id = job.id, owner = principal.id, "created job");
        Ok(job)
    }

    /// get_job
    ///
    /// Gate-wrapped fetch, used to prefill an edit.
    pub async fn get_job(&self, principal: &Principal, id: i64) -> Result<Job, ManagerError> {
        gate(principal, self.repo.get_job(id).await?)
    }

    /// edit_job
    ///
    /// Overwrites every mutable field. The team leader is not re-validated.
    pub async fn edit_job(
        &self,
        principal: &Principal,
        id: i64,
        req: JobRequest,
    ) -> Result<Job, ManagerError> {
        let mut job = self.get_job(principal, id).await?;
        job.team_leader = req.team_leader;
        job.job = req.job;
        job.work_size = req.work_size;
        job.collaborators = req.collaborators;
        job.is_finished = req.is_finished;

        let updated = self.repo.update_job(&job).await?;
        tracing::info!(job_id = id, principal = principal.id, "edited job");
        Ok(updated)
    }

    pub async fn delete_job(&self, principal: &Principal, id: i64) -> Result<(), ManagerError> {
        let job = self.get_job(principal, id).await?;
        self.repo.delete_job(job.id).await?;
        tracing::info!(job_id = id, principal = principal.id, "deleted job");
        Ok(())
    }

    // --- Departments ---

    pub async fn list_departments(&self) -> Result<Vec<Department>, ManagerError> {
        Ok(self.repo.list_departments().await?)
    }

    /// create_department
    ///
    /// The chief must exist. The acting principal becomes the owner.
    pub async fn create_department(
        &self,
        principal: &Principal,
        req: DepartmentRequest,
    ) -> Result<Department, ManagerError> {
        self.require_user("chief", req.chief).await?;

        let department = self
            .repo
            .create_department(NewDepartment {
                title: req.title,
                chief: req.chief,
                members: req.members,
                email: req.email,
                user_id: principal.id,
            })
            .await?;

        tracing::info!(department_id = department.id, owner = principal.id, "created department");
        Ok(department)
    }

    pub async fn get_department(
        &self,
        principal: &Principal,
        id: i64,
    ) -> Result<Department, ManagerError> {
        gate(principal, self.repo.get_department(id).await?)
    }

    /// edit_department
    ///
    /// Overwrites every mutable field. The chief is not re-validated.
    pub async fn edit_department(
        &self,
        principal: &Principal,
        id: i64,
        req: DepartmentRequest,
    ) -> Result<Department, ManagerError> {
        let mut department = self.get_department(principal, id).await?;
        department.title = req.title;
        department.chief = req.chief;
        department.members = req.members;
        department.email = req.email;

        let updated = self.repo.update_department(&department).await?;
        tracing::info!(department_id = id, principal = principal.id, "edited department");
        Ok(updated)
    }

    pub async fn delete_department(
        &self,
        principal: &Principal,
        id: i64,
    ) -> Result<(), ManagerError> {
        let department = self.get_department(principal, id).await?;
        self.repo.delete_department(department.id).await?;
        tracing::info!(department_id = id, principal = principal.id, "deleted department");
        Ok(())
    }
}
