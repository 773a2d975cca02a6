use std::net::IpAddr;

use warp::Filter;

use crate::api::{self, handlers};
use crate::error;

fn with_context(
    context: api::Context,
) -> impl Filter<Extract = (api::Context,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || context.clone())
}

/// The `/text/{uid}` resource, wiring GET/PUT/POST/DELETE to their
/// handlers.
fn routes(
    context: api::Context,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let text = || warp::path("text").and(warp::path::param::<String>()).and(warp::path::end());

    let get = text()
        .and(warp::get())
        .and(warp::query::<api::ModeQuery>())
        .and(with_context(context.clone()))
        .and_then(handlers::get);

    let put = text()
        .and(warp::put())
        .and(warp::query::<api::ModeQuery>())
        .and(warp::body::form())
        .and(with_context(context.clone()))
        .and_then(handlers::put);

    let post = text()
        .and(warp::post())
        .and(warp::query::<api::ModeQuery>())
        .and(warp::body::form())
        .and(with_context(context.clone()))
        .and_then(handlers::post);

    let delete = text()
        .and(warp::delete())
        .and(warp::query::<api::ModeQuery>())
        .and(with_context(context))
        .and_then(handlers::delete);

    get.or(put).or(post).or(delete)
}

/// The node's HTTP API surface.
#[derive(Clone)]
pub struct Server {
    context: api::Context,
}

impl Server {
    #[must_use]
    pub fn with_context(context: api::Context) -> Server {
        Server { context }
    }

    pub async fn run(self, listen: IpAddr, port: u16) {
        let api = routes(self.context).recover(error::recover);

        warp::serve(api).run((listen, port)).await;
    }
}
