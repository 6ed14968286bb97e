use mars_colony::{
    errors::StoreError,
    models::{NewDepartment, NewJob, NewUser},
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;

// --- Test Context and Setup ---

/// Holds the database pool for one test.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

fn unique_email(tag: &str) -> String {
    format!(
        "{tag}-{}@mars.org",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        surname: "Scott".to_string(),
        name: "Ridley".to_string(),
        age: 21,
        position: "captain".to_string(),
        speciality: "research engineer".to_string(),
        address: "module_1".to_string(),
        city_from: "Moscow".to_string(),
        email: email.to_string(),
        hashed_password: "unusable".to_string(),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn test_duplicate_email_violates_unique_index() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = unique_email("dup");

    let first = repo.create_user(new_user(&email)).await.unwrap();
    let second = repo.create_user(new_user(&email)).await;

    assert!(first.id > 0);
    assert!(matches!(second, Err(StoreError::ConstraintViolation(_))));
    assert_eq!(repo.get_user_by_email(&email).await.unwrap().unwrap().id, first.id);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn test_job_lifecycle() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = repo
        .create_user(new_user(&unique_email("job")))
        .await
        .unwrap();

    let job = repo
        .create_job(NewJob {
            team_leader: owner.id,
            job: "deployment of residential modules 1 and 2".to_string(),
            work_size: 15,
            collaborators: "2, 3".to_string(),
            is_finished: false,
            user_id: owner.id,
        })
        .await
        .unwrap();

    let mut edited = job.clone();
    edited.is_finished = true;
    edited.work_size = 20;
    let updated = repo.update_job(&edited).await.unwrap();
    assert_eq!(updated, edited);

    let listed = repo.list_jobs().await.unwrap();
    assert!(listed.iter().any(|j| j.id == job.id));
    assert!(listed.windows(2).all(|w| w[0].id < w[1].id));

    repo.delete_job(job.id).await.unwrap();
    assert!(repo.get_job(job.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn test_department_lifecycle() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = repo
        .create_user(new_user(&unique_email("dept")))
        .await
        .unwrap();

    let department = repo
        .create_department(NewDepartment {
            title: "geological exploration".to_string(),
            chief: owner.id,
            members: "2, 3".to_string(),
            email: "geo@mars.org".to_string(),
            user_id: owner.id,
        })
        .await
        .unwrap();

    let fetched = repo.get_department(department.id).await.unwrap().unwrap();
    assert_eq!(fetched, department);

    repo.delete_department(department.id).await.unwrap();
    assert!(repo.get_department(department.id).await.unwrap().is_none());
}
