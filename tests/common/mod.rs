#![allow(dead_code)]

use std::sync::Arc;

use course_payments_api::database::in_memory::InMemoryStore;
use course_payments_api::models::payment_request::{CreatePaymentRequest, DecidePaymentRequest};
use course_payments_api::models::user::{Claims, Role, Session, User};
use course_payments_api::state::AppState;
use jsonwebtoken::{encode, EncodingKey, Header};

pub const JWT_SECRET: &str = "test-secret";

pub fn setup() -> (InMemoryStore, AppState) {
    let store = InMemoryStore::new();
    let state = AppState::new(Arc::new(store.clone()), JWT_SECRET);
    (store, state)
}

pub fn student(id: &str, phone: &str) -> User {
    User {
        id: id.to_string(),
        name: "Ahmed".to_string(),
        phone: phone.to_string(),
        email: None,
        role: Role::Student,
    }
}

pub fn admin_session() -> Session {
    Session {
        user_id: "admin-1".to_string(),
        role: Role::Admin,
        phone: None,
    }
}

pub fn student_session(id: &str, phone: &str) -> Session {
    Session {
        user_id: id.to_string(),
        role: Role::Student,
        phone: Some(phone.to_string()),
    }
}

pub fn submission(phone: &str, course_id: &str) -> CreatePaymentRequest {
    CreatePaymentRequest {
        student_name: "Ahmed".to_string(),
        student_phone: phone.to_string(),
        course_id: course_id.to_string(),
        course_name: "Math".to_string(),
        course_price: Some(300.0),
        ..Default::default()
    }
}

pub fn decision(request_id: &str, status: &str) -> DecidePaymentRequest {
    DecidePaymentRequest {
        request_id: Some(request_id.to_string()),
        status: Some(status.to_string()),
        ..Default::default()
    }
}

pub fn token(sub: &str, role: Role, phone: Option<&str>) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        role,
        phone: phone.map(str::to_string),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to encode test token")
}
