use serde::Deserialize;

pub mod auth;
pub mod dashboard;
pub mod doses;
pub mod onboarding;
pub mod reports;
pub mod symptoms;
pub mod timeline;

const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn limit_or(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, MAX_LIST_LIMIT)
    }
}

fn local_now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}
