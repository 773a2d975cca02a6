//! Handler functions for the four `/text/{uid}` verbs. Each inspects the
//! mode flags on the request, then either delegates to the model (and, for
//! origin writes, fans out via the strategy) or bounces through the
//! strategy directly in cache mode.
use serde_json::json;
use warp::http::StatusCode;
use warp::reply::{self, Reply};

use crate::error::Error;
use crate::record::Record;

use super::{Context, ModeQuery, ValueForm};

fn record_reply(record: &Record, status: StatusCode) -> Box<dyn Reply> {
    Box::new(reply::with_status(
        reply::with_header(
            reply::json(record),
            "ETag",
            format!("\"{}:{}\"", record.uid, record.check_sum),
        ),
        status,
    ))
}

/// `GET /text/{uid}[?cache=1]`. On `cache=1`, a local cache hit
/// short-circuits before anything else is tried. Otherwise: local model,
/// then (on a miss) a `bounce_get` repair read through the peers the
/// strategy already knows about, then 404.
pub async fn get(
    uid: String,
    query: ModeQuery,
    ctx: Context,
) -> Result<Box<dyn Reply>, warp::Rejection> {
    if query.is_cache() {
        if let Some(cache) = ctx.strategy.cache() {
            if let Some(record) = cache.get(&uid).await {
                return Ok(record_reply(&record, StatusCode::OK));
            }
        }
    }

    match ctx.model.get(&uid) {
        Ok(record) => Ok(record_reply(&record, StatusCode::OK)),
        Err(Error::RecordMissing) => match ctx.strategy.bounce_get(&uid) {
            Ok(record) => Ok(record_reply(&record, StatusCode::OK)),
            Err(_) => Err(warp::reject::custom(Error::RecordMissing)),
        },
        Err(err) => Err(warp::reject::custom(err)),
    }
}

/// `PUT /text/{uid}`.
pub async fn put(
    uid: String,
    query: ModeQuery,
    form: ValueForm,
    ctx: Context,
) -> Result<Box<dyn Reply>, warp::Rejection> {
    if query.is_cache() {
        return match ctx.strategy.bounce_put(&uid, &form.value).await {
            Some(record) => Ok(record_reply(&record, StatusCode::OK)),
            None => Err(warp::reject::custom(Error::RecordMissing)),
        };
    }

    if query.is_mirror() {
        let record: Record =
            serde_json::from_str(&form.value).map_err(|err| warp::reject::custom(Error::from(err)))?;

        let copied = ctx
            .model
            .copy(record)
            .map_err(warp::reject::custom)?;

        if query.is_bridge() {
            ctx.strategy.spread_put(copied.clone());
        }

        return Ok(record_reply(&copied, StatusCode::OK));
    }

    let record = ctx
        .model
        .update(&uid, form.value)
        .map_err(warp::reject::custom)?;

    ctx.strategy.spread_put(record.clone());

    Ok(record_reply(&record, StatusCode::OK))
}

/// `POST /text/{uid}`.
pub async fn post(
    uid: String,
    query: ModeQuery,
    form: ValueForm,
    ctx: Context,
) -> Result<Box<dyn Reply>, warp::Rejection> {
    if query.is_cache() {
        return match ctx.strategy.bounce_post(&uid, &form.value).await {
            Some(record) => Ok(record_reply(&record, StatusCode::OK)),
            None => Err(warp::reject::custom(Error::RecordMissing)),
        };
    }

    let record = ctx
        .model
        .insert(&uid, form.value)
        .map_err(warp::reject::custom)?;

    ctx.strategy.spread_put(record.clone());

    Ok(record_reply(&record, StatusCode::OK))
}

/// `DELETE /text/{uid}`.
pub async fn delete(
    uid: String,
    query: ModeQuery,
    ctx: Context,
) -> Result<Box<dyn Reply>, warp::Rejection> {
    if query.is_cache() {
        return match ctx.strategy.bounce_delete(&uid).await {
            Ok(()) => Ok(Box::new(StatusCode::OK)),
            Err(err) => Err(warp::reject::custom(err)),
        };
    }

    ctx.model.delete(&uid).map_err(warp::reject::custom)?;

    if query.is_mirror() {
        if query.is_bridge() {
            ctx.strategy.spread_delete(uid);
        }
    } else {
        ctx.strategy.spread_delete(uid);
    }

    Ok(Box::new(reply::with_status(reply::json(&json!({})), StatusCode::OK)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cache::MemoryCache;
    use crate::model::TextModel;
    use crate::processors::{DetectLangProcess, MarkProcess, Processor};
    use crate::record;
    use crate::registry::Registry;
    use crate::storage::FileStorage;
    use crate::strategy::Spread;

    fn context(base: &std::path::Path, registry: Registry) -> Context {
        let storage = FileStorage::new(base);
        let processors: Vec<Box<dyn Processor>> =
            vec![Box::new(DetectLangProcess), Box::new(MarkProcess)];
        Context {
            model: Arc::new(TextModel::new(storage, processors)),
            strategy: Arc::new(Spread::new(registry, "text")),
        }
    }

    fn form(value: &str) -> ValueForm {
        ValueForm {
            value: value.to_string(),
        }
    }

    #[tokio::test]
    async fn post_assigns_an_etag_and_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Registry::default());

        let reply = post("uid-1".into(), ModeQuery::default(), form("hello"), ctx.clone())
            .await
            .unwrap();
        let response = reply.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let expected_etag = format!("\"uid-1:{}\"", record::sign("hello"));
        assert_eq!(response.headers().get("ETag").unwrap(), expected_etag.as_str());

        let fetched = ctx.model.get("uid-1").unwrap();
        assert_eq!(fetched.value, "hello (Marked).");

        let reply = get("uid-1".into(), ModeQuery::default(), ctx).await.unwrap();
        assert_eq!(reply.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_of_existing_uid_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Registry::default());

        post("uid-1".into(), ModeQuery::default(), form("hello"), ctx.clone())
            .await
            .unwrap();

        let err = post("uid-1".into(), ModeQuery::default(), form("again"), ctx)
            .await
            .unwrap_err();

        assert!(matches!(err.find::<Error>(), Some(Error::RecordExists)));
    }

    #[tokio::test]
    async fn get_of_missing_uid_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Registry::default());

        let err = get("nope".into(), ModeQuery::default(), ctx).await.unwrap_err();
        assert!(matches!(err.find::<Error>(), Some(Error::RecordMissing)));
    }

    #[tokio::test]
    async fn put_of_missing_uid_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Registry::default());

        let err = put("nope".into(), ModeQuery::default(), form("hello"), ctx)
            .await
            .unwrap_err();

        assert!(matches!(err.find::<Error>(), Some(Error::RecordMissing)));
    }

    #[tokio::test]
    async fn put_with_unchanged_value_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Registry::default());

        post("uid-1".into(), ModeQuery::default(), form("hello"), ctx.clone())
            .await
            .unwrap();

        let err = put("uid-1".into(), ModeQuery::default(), form("hello"), ctx)
            .await
            .unwrap_err();

        assert!(matches!(err.find::<Error>(), Some(Error::RecordExists)));
    }

    #[tokio::test]
    async fn delete_then_get_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Registry::default());

        post("uid-1".into(), ModeQuery::default(), form("hello"), ctx.clone())
            .await
            .unwrap();

        let reply = delete("uid-1".into(), ModeQuery::default(), ctx.clone())
            .await
            .unwrap();
        assert_eq!(reply.into_response().status(), StatusCode::OK);

        let err = get("uid-1".into(), ModeQuery::default(), ctx).await.unwrap_err();
        assert!(matches!(err.find::<Error>(), Some(Error::RecordMissing)));
    }

    #[tokio::test]
    async fn mirror_put_without_bridge_copies_locally_and_does_not_fan_out() {
        let dir = tempfile::tempdir().unwrap();
        // An unreachable peer: if mirror-only wrongly fanned out, spread_put
        // would spawn a task against it, but nothing here awaits or
        // observes that task, so the assertion is really just that `copy`
        // (not `update`/`insert`) is what landed on disk.
        let ctx = context(
            dir.path(),
            Registry::from_peers(vec!["http://127.0.0.1:1".into()], false),
        );

        let incoming = crate::record::Record {
            uid: "uid-1".into(),
            value: "raw".into(),
            timestamp: 0.0,
            check_sum: 1,
            size: 1,
            lang: "en".into(),
        };

        let query = ModeQuery {
            mirror: Some(1),
            bridge: None,
            cache: None,
        };

        let reply = put(
            "uid-1".into(),
            query,
            form(&serde_json::to_string(&incoming).unwrap()),
            ctx.clone(),
        )
        .await
        .unwrap();

        assert_eq!(reply.into_response().status(), StatusCode::OK);
        assert_eq!(ctx.model.get("uid-1").unwrap(), incoming);
    }

    #[tokio::test]
    async fn mirror_delete_without_bridge_does_not_require_reachable_peers() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(
            dir.path(),
            Registry::from_peers(vec!["http://127.0.0.1:1".into()], false),
        );

        ctx.model.insert("uid-1", "hello".into()).unwrap();

        let query = ModeQuery {
            mirror: Some(1),
            bridge: None,
            cache: None,
        };

        let reply = delete("uid-1".into(), query, ctx.clone()).await.unwrap();
        assert_eq!(reply.into_response().status(), StatusCode::OK);
        assert!(matches!(ctx.model.get("uid-1"), Err(Error::RecordMissing)));
    }

    #[tokio::test]
    async fn cache_mode_put_with_no_peers_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Registry::default());

        let query = ModeQuery {
            mirror: None,
            bridge: None,
            cache: Some(1),
        };

        let err = put("uid-1".into(), query, form("hello"), ctx).await.unwrap_err();
        assert!(matches!(err.find::<Error>(), Some(Error::RecordMissing)));
    }

    #[tokio::test]
    async fn cache_mode_get_prefers_a_cache_hit_over_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::from_peers(vec!["http://127.0.0.1:1".into()], false);
        let cache = MemoryCache::new(crate::cache::UNLIMITED);

        let cached = crate::record::Record {
            uid: "uid-1".into(),
            value: "from-cache".into(),
            timestamp: 0.0,
            check_sum: 1,
            size: 1,
            lang: "en".into(),
        };
        cache.put(cached.clone()).await;

        let ctx = Context {
            model: Arc::new(TextModel::new(
                FileStorage::new(dir.path()),
                vec![Box::new(DetectLangProcess), Box::new(MarkProcess)],
            )),
            strategy: Arc::new(Spread::new(registry, "text").with_cache(cache).unwrap()),
        };

        // Also insert a different local record, so a correct cache hit
        // proves the model was never consulted.
        ctx.model.insert("uid-1", "from-model".into()).unwrap();

        let query = ModeQuery {
            mirror: None,
            bridge: None,
            cache: Some(1),
        };

        let reply = get("uid-1".into(), query, ctx).await.unwrap();
        let response = reply.into_response();
        let expected_etag = format!("\"uid-1:{}\"", cached.check_sum);
        assert_eq!(response.headers().get("ETag").unwrap(), expected_etag.as_str());
    }
}
