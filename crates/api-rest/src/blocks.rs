//! `/blocks` handlers.
//!
//! Every path and content type is validated here before the storage layer is touched.
//! Storage calls are synchronous, so they run on tokio's blocking pool.

use crate::error::{ApiError, ErrorRes};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path as AxumPath, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use blocks_core::{
    Block, BlockPath, BlockReference, BlockResult, ContentType, ContentTypeError, ErrorKind,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query options of `GET /blocks/{path}`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GetBlockParams {
    /// Present, with any value or none, to receive the raw bytes
    pub raw: Option<String>,
    /// `raw` to receive the raw bytes; anything else means JSON
    pub format: Option<String>,
}

impl GetBlockParams {
    pub fn wants_raw(&self) -> bool {
        self.raw.is_some() || self.format.as_deref() == Some("raw")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BlockRefRes {
    pub path: String,
}

impl From<BlockReference> for BlockRefRes {
    fn from(reference: BlockReference) -> Self {
        Self {
            path: reference.path.to_string(),
        }
    }
}

/// JSON view of a block. Content is never included; use `?raw` to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BlockRes {
    pub path: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BlockRefRes>>,
}

impl From<Block> for BlockRes {
    fn from(block: Block) -> Self {
        Self {
            path: block.path.to_string(),
            content_type: block.content_type,
            size: block.size,
            children: block
                .children
                .map(|c| c.into_iter().map(BlockRefRes::from).collect()),
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> BlockResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "storage task did not complete");
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}

/// Parses a wildcard path for a mutating request.
///
/// Paths that clean to the root (`.`, `a/..`) are refused; the root is read-only here.
fn writable_path(raw: &str) -> Result<BlockPath, ApiError> {
    let path = BlockPath::parse(raw)?;
    if path.is_root() {
        return Err(ApiError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "the root cannot be written or deleted",
        ));
    }
    Ok(path)
}

/// Reads the block at `path` and its immediate children.
///
/// A path with no stored content but with descendants is reported as a directory.
fn read_with_children(state: &AppState, path: BlockPath) -> BlockResult<Block> {
    let manager = &state.manager;
    let block = match manager.get(&path, false) {
        Ok(block) => block,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let children = manager.list(&path).map_err(|_| err)?;
            return Ok(Block::directory(path).with_children(children));
        }
        Err(err) => return Err(err),
    };

    let children = match manager.list(&path) {
        Ok(children) => children,
        Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
        Err(err) => return Err(err),
    };
    Ok(block.with_children(children))
}

async fn read_block(
    state: AppState,
    path: BlockPath,
    params: GetBlockParams,
) -> Result<Response, ApiError> {
    if params.wants_raw() {
        let manager = state.manager.clone();
        let block = run_blocking(move || manager.get(&path, true)).await?;
        if block.is_directory() {
            return Err(ApiError::not_found());
        }
        let Some(content) = block.content else {
            return Err(ApiError::not_found());
        };
        return Ok(([(header::CONTENT_TYPE, block.content_type)], content).into_response());
    }

    let block = run_blocking(move || read_with_children(&state, path)).await?;
    Ok(Json(BlockRes::from(block)).into_response())
}

#[utoipa::path(
    get,
    path = "/blocks/{path}",
    params(
        ("path" = String, Path, description = "Slash-delimited block path"),
        GetBlockParams
    ),
    responses(
        (status = 200, description = "Block metadata and children, or raw content", body = BlockRes),
        (status = 403, description = "Invalid path or access denied", body = ErrorRes),
        (status = 404, description = "No block at this path", body = ErrorRes),
        (status = 422, description = "Storage failure", body = ErrorRes)
    )
)]
/// Read a block
///
/// Returns JSON metadata plus the immediate children by default, or the stored bytes
/// with their content type when `raw` is requested.
#[axum::debug_handler]
pub async fn get_block(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
    Query(params): Query<GetBlockParams>,
) -> Result<Response, ApiError> {
    let path = BlockPath::parse(&path)?;
    read_block(state, path, params).await
}

/// `GET /blocks`: the root, which only ever has children.
#[axum::debug_handler]
pub async fn get_root_block(
    State(state): State<AppState>,
    Query(params): Query<GetBlockParams>,
) -> Result<Response, ApiError> {
    read_block(state, BlockPath::root(), params).await
}

#[utoipa::path(
    put,
    path = "/blocks/{path}",
    params(("path" = String, Path, description = "Slash-delimited block path")),
    request_body(content = String, description = "Raw block content", content_type = "application/octet-stream"),
    responses(
        (status = 202, description = "Block stored", body = BlockRes),
        (status = 403, description = "Invalid path, invalid content type or access denied", body = ErrorRes),
        (status = 405, description = "Path resolves to the root", body = ErrorRes),
        (status = 413, description = "Body larger than the configured limit"),
        (status = 422, description = "Storage failure", body = ErrorRes)
    )
)]
/// Create or replace a block
///
/// The `Content-Type` header becomes the block's type; without one the block is stored
/// as `application/octet-stream`.
#[axum::debug_handler]
pub async fn put_block(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<BlockRes>), ApiError> {
    let path = writable_path(&path)?;
    let content_type = match headers.get(header::CONTENT_TYPE) {
        None => ContentType::default(),
        Some(value) => {
            let value = value.to_str().map_err(|_| {
                let lossy = String::from_utf8_lossy(value.as_bytes()).into_owned();
                ContentTypeError::Malformed(lossy)
            })?;
            if value.trim().is_empty() {
                ContentType::default()
            } else {
                ContentType::parse(value)?
            }
        }
    };

    let manager = state.manager.clone();
    let block = run_blocking(move || {
        manager.set(&path, &body, &content_type)?;
        manager.get(&path, false)
    })
    .await?;

    tracing::debug!(path = %block.path, size = block.size, "block stored");
    Ok((StatusCode::ACCEPTED, Json(BlockRes::from(block))))
}

#[utoipa::path(
    delete,
    path = "/blocks/{path}",
    params(("path" = String, Path, description = "Slash-delimited block path")),
    responses(
        (status = 204, description = "Block and its descendants removed, or nothing was there"),
        (status = 403, description = "Invalid path or access denied", body = ErrorRes),
        (status = 405, description = "Path resolves to the root", body = ErrorRes),
        (status = 422, description = "Storage failure", body = ErrorRes)
    )
)]
/// Delete a block and everything beneath it
#[axum::debug_handler]
pub async fn delete_block(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<StatusCode, ApiError> {
    let path = writable_path(&path)?;
    let manager = state.manager.clone();
    run_blocking(move || manager.delete(&path)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{router, AppInfo};
    use axum::{body::Body, http::Request, Router};
    use blocks_core::{BlockManager, FsBlockManager, InMemoryBlockManager};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const TEST_UPLOAD_LIMIT: usize = 1024;

    fn app_with(manager: Arc<dyn BlockManager>, max_upload_size: usize) -> Router {
        router(AppState::new(manager, AppInfo::new("test")), max_upload_size)
    }

    fn memory_app() -> (Router, Arc<InMemoryBlockManager>) {
        let manager = Arc::new(InMemoryBlockManager::new());
        (app_with(manager.clone(), TEST_UPLOAD_LIMIT), manager)
    }

    fn seed(manager: &dyn BlockManager, path: &str, content: &[u8], content_type: &str) {
        manager
            .set(
                &BlockPath::parse(path).unwrap(),
                content,
                &ContentType::parse(content_type).unwrap(),
            )
            .unwrap();
    }

    async fn send(app: Router, method: &str, uri: &str, body: Body) -> Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn body_bytes(res: Response) -> Bytes {
        res.into_body().collect().await.unwrap().to_bytes()
    }

    async fn body_json(res: Response) -> Value {
        serde_json::from_slice(&body_bytes(res).await).unwrap()
    }

    #[tokio::test]
    async fn test_get_returns_metadata_and_children() {
        let (app, manager) = memory_app();
        seed(&*manager, "docs", b"index", "text/plain");
        seed(&*manager, "docs/readme", b"hello", "text/markdown");

        let res = send(app, "GET", "/blocks/docs", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::OK);

        let json = body_json(res).await;
        assert_eq!(json["path"], "docs");
        assert_eq!(json["type"], "text/plain");
        assert_eq!(json["size"], 5);
        assert!(json.get("content").is_none());
        assert_eq!(json["children"], serde_json::json!([{ "path": "docs/readme" }]));
    }

    #[tokio::test]
    async fn test_get_leaf_has_empty_children() {
        let (app, manager) = memory_app();
        seed(&*manager, "leaf", b"x", "text/plain");

        let json = body_json(send(app, "GET", "/blocks/leaf", Body::empty()).await).await;
        assert_eq!(json["children"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_get_raw_content() {
        let (app, manager) = memory_app();
        seed(&*manager, "img/logo", b"\x89PNG", "image/png");

        for uri in ["/blocks/img/logo?raw", "/blocks/img/logo?format=raw"] {
            let res = send(app.clone(), "GET", uri, Body::empty()).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
            assert_eq!(body_bytes(res).await.as_ref(), b"\x89PNG");
        }

        // the parameter's presence is what counts, not its value
        let res = send(app.clone(), "GET", "/blocks/img/logo?raw=false", Body::empty()).await;
        assert_eq!(body_bytes(res).await.as_ref(), b"\x89PNG");

        let res = send(app, "GET", "/blocks/img/logo?format=json", Body::empty()).await;
        assert_eq!(body_json(res).await["type"], "image/png");
    }

    #[tokio::test]
    async fn test_get_raw_directory_is_not_found() {
        let (app, manager) = memory_app();
        seed(&*manager, "a/b", b"x", "text/plain");

        let res = send(app, "GET", "/blocks/a?raw", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (app, _) = memory_app();

        let res = send(app, "GET", "/blocks/nothing/here", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(body_json(res).await["error"].as_str().unwrap().contains("nothing/here"));
    }

    #[tokio::test]
    async fn test_invalid_paths_are_forbidden() {
        let (app, _) = memory_app();

        for uri in [
            "/blocks/../etc/passwd",
            "/blocks/a/../../secret",
            "/blocks/a%00b",
            "/blocks/1/2/3/4/5/6/7/8/9/10/11",
        ] {
            let res = send(app.clone(), "GET", uri, Body::empty()).await;
            assert_eq!(res.status(), StatusCode::FORBIDDEN, "{uri}");
            assert!(body_json(res).await["error"].is_string());
        }

        let res = send(app.clone(), "PUT", "/blocks/../escape", Body::from("x")).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = send(app, "DELETE", "/blocks/../escape", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_put_stores_block() {
        let (app, manager) = memory_app();

        let res = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/blocks/notes/today")
                    .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                    .body(Body::from("Hello, World!"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);

        let json = body_json(res).await;
        assert_eq!(json["path"], "notes/today");
        assert_eq!(json["type"], "text/plain; charset=utf-8");
        assert_eq!(json["size"], 13);

        let stored = manager
            .get(&BlockPath::parse("notes/today").unwrap(), true)
            .unwrap();
        assert_eq!(stored.content.as_deref(), Some(b"Hello, World!".as_slice()));
    }

    #[tokio::test]
    async fn test_put_without_content_type_uses_default() {
        let (app, _) = memory_app();

        let res = send(app, "PUT", "/blocks/blob", Body::from("abc")).await;
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(res).await["type"], "application/octet-stream");
    }

    #[tokio::test]
    async fn test_put_invalid_content_type_is_forbidden() {
        let (app, manager) = memory_app();

        let res = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/blocks/blob")
                    .header(header::CONTENT_TYPE, "not-a-type")
                    .body(Body::from("abc"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_put_over_limit_is_rejected() {
        let manager = Arc::new(InMemoryBlockManager::new());
        let app = app_with(manager.clone(), 10);

        let res = send(app, "PUT", "/blocks/big", Body::from(vec![b'x'; 20])).await;
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_subtree() {
        let (app, manager) = memory_app();
        seed(&*manager, "a/b/c", b"x", "text/plain");
        seed(&*manager, "keep", b"y", "text/plain");

        let res = send(app.clone(), "DELETE", "/blocks/a", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(body_bytes(res).await.is_empty());

        let res = send(app.clone(), "GET", "/blocks/a/b/c", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(app, "GET", "/blocks/keep", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_paths_cleaning_to_root_are_not_writable() {
        let (app, manager) = memory_app();
        seed(&*manager, "keep/me", b"x", "text/plain");

        for uri in ["/blocks/.", "/blocks/a/..", "/blocks/%2E", "/blocks/./"] {
            let res = send(app.clone(), "DELETE", uri, Body::empty()).await;
            assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED, "{uri}");
            assert!(body_json(res).await["error"].is_string());

            let res = send(app.clone(), "PUT", uri, Body::from("root!")).await;
            assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED, "{uri}");
        }

        assert!(manager.get(&BlockPath::parse("keep/me").unwrap(), false).is_ok());
        assert_eq!(
            manager.get(&BlockPath::root(), false).unwrap_err().kind(),
            ErrorKind::NotFound
        );

        // reads of the same spellings still resolve to the root listing
        let res = send(app, "GET", "/blocks/a/..", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["children"], serde_json::json!([{ "path": "keep" }]));
    }

    #[tokio::test]
    async fn test_delete_missing_is_no_content() {
        let (app, _) = memory_app();

        let res = send(app, "DELETE", "/blocks/never/existed", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_root_listing() {
        let (app, manager) = memory_app();
        seed(&*manager, "b", b"1", "text/plain");
        seed(&*manager, "a/x", b"2", "text/plain");

        for uri in ["/blocks", "/blocks/"] {
            let res = send(app.clone(), "GET", uri, Body::empty()).await;
            assert_eq!(res.status(), StatusCode::OK);

            let json = body_json(res).await;
            assert_eq!(json["path"], "");
            assert_eq!(json["type"], "directory");
            assert_eq!(
                json["children"],
                serde_json::json!([{ "path": "a" }, { "path": "b" }])
            );
        }

        let res = send(app, "DELETE", "/blocks", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_filesystem_intermediate_directory() {
        let tmp = TempDir::new().unwrap();
        let manager = Arc::new(FsBlockManager::new(tmp.path()).unwrap());
        seed(&*manager, "projects/alpha", b"data", "text/plain");
        let app = app_with(manager, TEST_UPLOAD_LIMIT);

        let res = send(app.clone(), "GET", "/blocks/projects", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::OK);

        let json = body_json(res).await;
        assert_eq!(json["type"], "directory");
        assert_eq!(json["size"], 0);
        assert_eq!(
            json["children"],
            serde_json::json!([{ "path": "projects/alpha" }])
        );

        let res = send(app, "GET", "/blocks/projects/alpha?raw", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_bytes(res).await.as_ref(), b"data");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_not_found() {
        let (app, _) = memory_app();

        let res = send(app, "GET", "/nope", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await, serde_json::json!({ "error": "Not found" }));
    }

    #[tokio::test]
    async fn test_home() {
        let (app, _) = memory_app();

        let res = send(app, "GET", "/", Body::empty()).await;
        assert_eq!(res.status(), StatusCode::OK);

        let json = body_json(res).await;
        assert_eq!(json["version"], "test");
        assert_eq!(json["description"], "Blocks API");
    }
}
