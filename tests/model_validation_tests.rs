use chrono::Utc;
use mars_colony::models::{
    DepartmentRequest, HometownView, Job, JobRequest, LoginRequest, User, UserEnvelope,
};
use serde_json::json;

fn user() -> User {
    User {
        id: 2,
        surname: "Scott".to_string(),
        name: "Ridley".to_string(),
        age: 21,
        position: "captain".to_string(),
        speciality: "research engineer".to_string(),
        address: "module_1".to_string(),
        city_from: "Moscow".to_string(),
        email: "scott_chief@mars.org".to_string(),
        hashed_password: "$argon2id$v=19$secret".to_string(),
        created_at: Utc::now(),
    }
}

#[test]
fn test_password_hash_is_never_serialized() {
    let value = serde_json::to_value(user()).unwrap();

    assert!(value.get("hashed_password").is_none());
    assert_eq!(value["email"], "scott_chief@mars.org");
}

#[test]
fn test_user_envelope_shape() {
    let value = serde_json::to_value(UserEnvelope { user: user() }).unwrap();

    assert_eq!(value["user"]["surname"], "Scott");
    assert_eq!(value["user"]["city_from"], "Moscow");
}

#[test]
fn test_user_envelope_parses_without_password_hash() {
    // The pipeline reads back documents produced by the user API.
    let body = serde_json::to_vec(&UserEnvelope { user: user() }).unwrap();
    let parsed: UserEnvelope = serde_json::from_slice(&body).unwrap();

    assert_eq!(parsed.user.surname, "Scott");
    assert!(parsed.user.hashed_password.is_empty());
}

#[test]
fn test_job_request_defaults_to_unfinished() {
    let req: JobRequest = serde_json::from_value(json!({
        "team_leader": 1,
        "job": "deployment of residential modules 1 and 2",
        "work_size": 15,
        "collaborators": "2, 3"
    }))
    .unwrap();

    assert!(!req.is_finished);
}

#[test]
fn test_login_request_defaults_to_short_session() {
    let req: LoginRequest =
        serde_json::from_value(json!({ "email": "a@x.com", "password": "secret" })).unwrap();

    assert!(!req.remember_me);
}

#[test]
fn test_department_request_requires_chief() {
    let result: Result<DepartmentRequest, _> = serde_json::from_value(json!({
        "title": "geological exploration",
        "members": "2, 3",
        "email": "geo@mars.org"
    }));

    assert!(result.is_err());
}

#[test]
fn test_job_serializes_owner() {
    let job = Job {
        id: 1,
        team_leader: 1,
        job: "survey".to_string(),
        work_size: 4,
        collaborators: "2".to_string(),
        is_finished: true,
        user_id: 3,
    };
    let value = serde_json::to_value(&job).unwrap();

    assert_eq!(value["user_id"], 3);
    assert_eq!(value["is_finished"], true);
}

#[test]
fn test_hometown_view_fields() {
    let value = serde_json::to_value(HometownView {
        user_id: 2,
        surname: "Scott".to_string(),
        city_from: "Moscow".to_string(),
        coordinates: "37.617698 55.755864".to_string(),
        image: "static/img/hometown_Scott.jpg".to_string(),
    })
    .unwrap();

    assert_eq!(value["image"], "static/img/hometown_Scott.jpg");
    assert_eq!(value["coordinates"], "37.617698 55.755864");
}
