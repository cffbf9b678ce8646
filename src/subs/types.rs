use serde::Serialize;

use crate::store::Subscription;

#[derive(Serialize)]
pub struct SubAddPlan {
    pub action: &'static str,
    pub user_id: String,
    pub subreddit: String,
    pub active: bool,
}

#[derive(Serialize)]
pub struct SubAddResult {
    pub id: i64,
    pub inserted: bool,
    pub user_id: String,
    pub subreddit: String,
}

#[derive(Serialize)]
pub struct SubChangePlan {
    pub action: &'static str,
    pub subscription: Subscription,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Serialize)]
pub struct SubChangeResult {
    pub action: &'static str,
    pub id: i64,
    pub changed: bool,
}

#[derive(Serialize)]
pub struct SubList {
    pub subscriptions: Vec<Subscription>,
}
