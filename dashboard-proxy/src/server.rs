use std::{collections::HashMap, convert::Infallible, sync::Arc};

use serde_json::json;
use warp::{Filter, Rejection, Reply};

use crate::service::ProxyService;

/// `GET /api?action=...` plus a `GET /health` liveness check.
///
/// Every `/api` outcome is a JSON body with status 200; callers read
/// `success` instead of the HTTP status.
pub fn routes(
    service: Arc<ProxyService>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let api = warp::get()
        .and(warp::path("api"))
        .and(warp::path::end())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_service(service))
        .then(|params: HashMap<String, String>, service: Arc<ProxyService>| async move {
            warp::reply::json(&service.handle(&params).await)
        });

    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    let cors = warp::cors().allow_any_origin().allow_methods(vec!["GET"]);

    api.or(health).with(cors).with(warp::trace::request())
}

fn with_service(
    service: Arc<ProxyService>,
) -> impl Filter<Extract = (Arc<ProxyService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}
