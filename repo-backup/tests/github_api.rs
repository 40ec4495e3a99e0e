//! Drives `GitHubClient` against an in-process fake of the contents API.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use repo_backup::executor::TransferAction;
use repo_backup::fs::{select_files, select_folders, WalkOptions};
use repo_backup::plan::plan_backup;
use repo_backup::remote::github::{Credential, GitHubClient};
use repo_backup::remote::{ObjectKind, RemoteStore};
use repo_backup::{BatchExecutor, BatchStatus, Direction, ErrorKind};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const TOKEN: &str = "test-token";

#[derive(Clone, Default)]
struct FakeGitHub {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    commit_messages: Arc<Mutex<Vec<String>>>,
}

#[derive(Deserialize)]
struct PutBody {
    message: String,
    content: String,
    sha: Option<String>,
}

fn sha(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("127.0.0.1");
    format!("http://{}", host)
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// File object as the API returns it; large files come without inline content.
fn file_item(path: &str, content: &[u8], base: &str, with_content: bool) -> Value {
    let mut item = json!({
        "type": "file",
        "name": name_of(path),
        "path": path,
        "sha": sha(content),
        "size": content.len(),
        "download_url": format!("{}/raw/{}", base, path),
    });
    if with_content {
        if path.contains("large") {
            item["encoding"] = json!("none");
            item["content"] = json!("");
        } else {
            // The API wraps base64 at 60 columns
            let encoded = STANDARD.encode(content);
            let wrapped: Vec<String> = encoded
                .as_bytes()
                .chunks(60)
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect();
            item["encoding"] = json!("base64");
            item["content"] = json!(wrapped.join("\n"));
        }
    }
    item
}

async fn user(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Bad credentials");
    }
    Json(json!({ "login": "octo" })).into_response()
}

fn contents(state: &FakeGitHub, headers: &HeaderMap, path: &str) -> Response {
    if !authorized(headers) {
        return error(StatusCode::UNAUTHORIZED, "Bad credentials");
    }
    let base = base_url(headers);
    let files = state.files.lock().unwrap();

    if let Some(content) = files.get(path) {
        return Json(file_item(path, content, &base, true)).into_response();
    }

    let prefix = if path.is_empty() {
        String::new()
    } else {
        format!("{}/", path)
    };
    let mut children: BTreeMap<String, Value> = BTreeMap::new();
    for (key, content) in files.iter() {
        let Some(rest) = key.strip_prefix(&prefix) else {
            continue;
        };
        match rest.split_once('/') {
            Some((dir, _)) => {
                let dir_path = format!("{}{}", prefix, dir);
                children.entry(dir.to_string()).or_insert_with(|| {
                    json!({
                        "type": "dir",
                        "name": dir,
                        "path": dir_path,
                        "sha": sha(dir_path.as_bytes()),
                        "size": 0,
                    })
                });
            }
            None => {
                children.insert(rest.to_string(), file_item(key, content, &base, false));
            }
        }
    }

    if children.is_empty() && !path.is_empty() {
        return error(StatusCode::NOT_FOUND, "Not Found");
    }
    Json(Value::Array(children.into_values().collect())).into_response()
}

async fn get_root(
    State(state): State<FakeGitHub>,
    headers: HeaderMap,
    Path((_owner, _repo)): Path<(String, String)>,
) -> Response {
    contents(&state, &headers, "")
}

async fn get_contents(
    State(state): State<FakeGitHub>,
    headers: HeaderMap,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
) -> Response {
    contents(&state, &headers, &path)
}

async fn put_contents(
    State(state): State<FakeGitHub>,
    headers: HeaderMap,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(body): Json<PutBody>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Bad credentials");
    }
    let Ok(content) = STANDARD.decode(&body.content) else {
        return error(StatusCode::BAD_REQUEST, "content is not valid Base64");
    };

    let mut files = state.files.lock().unwrap();
    let status = match (files.get(&path), body.sha.as_deref()) {
        (Some(_), None) => {
            return error(StatusCode::UNPROCESSABLE_ENTITY, "\"sha\" wasn't supplied.");
        }
        (Some(current), Some(given)) if sha(current) != given => {
            return error(StatusCode::CONFLICT, &format!("{} does not match {}", path, given));
        }
        (None, Some(_)) => {
            return error(StatusCode::CONFLICT, &format!("{} does not exist", path));
        }
        (Some(_), Some(_)) => StatusCode::OK,
        (None, None) => StatusCode::CREATED,
    };

    state.commit_messages.lock().unwrap().push(body.message);
    let item = file_item(&path, &content, &base_url(&headers), false);
    files.insert(path, content);
    (status, Json(json!({ "content": item, "commit": { "sha": "c0ffee" } }))).into_response()
}

async fn raw(
    State(state): State<FakeGitHub>,
    headers: HeaderMap,
    Path(path): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Bad credentials");
    }
    match state.files.lock().unwrap().get(&path) {
        Some(content) => content.clone().into_response(),
        None => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn spawn_fake(state: FakeGitHub) -> String {
    let app = Router::new()
        .route("/user", get(user))
        .route("/repos/{owner}/{repo}/contents", get(get_root))
        .route(
            "/repos/{owner}/{repo}/contents/{*path}",
            get(get_contents).put(put_contents),
        )
        .route("/raw/{*path}", get(raw))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(api_url: &str, token: Option<&str>) -> GitHubClient {
    GitHubClient::new(api_url, "repo-backup-tests", token.map(Credential::new))
        .unwrap()
        .for_repository("octo/archive".parse().unwrap())
}

#[tokio::test]
async fn test_whoami() {
    let api = spawn_fake(FakeGitHub::default()).await;
    let user = client(&api, Some(TOKEN)).authenticated_user().await.unwrap();
    assert_eq!(user.login, "octo");

    let err = client(&api, Some("wrong")).authenticated_user().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn test_backup_twice_then_update_with_sha() {
    let state = FakeGitHub::default();
    let api = spawn_fake(state.clone()).await;
    let github = client(&api, Some(TOKEN));

    let source = TempDir::new().unwrap();
    let report = source.path().join("report.pdf");
    std::fs::write(&report, vec![42u8; 500_000]).unwrap();
    let notes = source.path().join("notes");
    std::fs::create_dir_all(notes.join("sub dir")).unwrap();
    std::fs::write(notes.join("a.txt"), b"alpha").unwrap();
    std::fs::write(notes.join("sub dir/b.txt"), b"beta").unwrap();

    let files = select_files(&[&report]).unwrap();
    let folders = select_folders(&[&notes], &WalkOptions::default()).unwrap();
    let plan = plan_backup(&files, &folders, "backups/").unwrap();

    let executor = BatchExecutor::new(&github);
    let first = executor.execute(&plan, Direction::Backup, |_| {}).await;
    assert_eq!(first.status(), BatchStatus::Complete);
    assert!(first.outcomes.iter().all(|o| o.action == Some(TransferAction::Created)));

    let second = executor.execute(&plan, Direction::Backup, |_| {}).await;
    assert_eq!(second.succeeded, second.attempted);
    assert!(second.outcomes.iter().all(|o| o.action == Some(TransferAction::Updated)));

    let stored = state.files.lock().unwrap();
    let mut keys: Vec<_> = stored.keys().cloned().collect();
    keys.sort();
    assert_eq!(
        keys,
        vec!["backups/notes/a.txt", "backups/notes/sub dir/b.txt", "backups/report.pdf"]
    );
    assert_eq!(stored["backups/report.pdf"].len(), 500_000);
    drop(stored);

    let messages = state.commit_messages.lock().unwrap();
    assert_eq!(messages.len(), 6);
    assert!(messages.contains(&"Backup: report.pdf".to_string()));
}

#[tokio::test]
async fn test_put_requires_current_sha() {
    let api = spawn_fake(FakeGitHub::default()).await;
    let github = client(&api, Some(TOKEN));

    let v1 = github.put_content("a.txt", b"v1", None).await.unwrap();
    assert_eq!(v1.path, "a.txt");
    assert_eq!(v1.size, 2);

    let err = github.put_content("a.txt", b"blind", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    github
        .put_content("a.txt", b"v2", Some(&v1.content_id))
        .await
        .unwrap();

    let err = github
        .put_content("a.txt", b"v3", Some(&v1.content_id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(github.get_content("a.txt").await.unwrap(), b"v2");
}

#[tokio::test]
async fn test_get_content_decodes_wrapped_and_large_files() {
    let api = spawn_fake(FakeGitHub::default()).await;
    let github = client(&api, Some(TOKEN));

    let text = "line of text that is long enough to wrap the base64 payload\n".repeat(20);
    github.put_content("docs/long.txt", text.as_bytes(), None).await.unwrap();
    assert_eq!(github.get_content("docs/long.txt").await.unwrap(), text.as_bytes());

    let blob = vec![3u8; 4096];
    github.put_content("docs/large.bin", &blob, None).await.unwrap();
    assert_eq!(github.get_content("docs/large.bin").await.unwrap(), blob);
}

#[tokio::test]
async fn test_list_normalizes_both_shapes() {
    let api = spawn_fake(FakeGitHub::default()).await;
    let github = client(&api, Some(TOKEN));
    github.put_content("backups/a.txt", b"a", None).await.unwrap();
    github.put_content("backups/notes/b.txt", b"b", None).await.unwrap();

    let dir = github.list("backups").await.unwrap();
    let kinds: Vec<_> = dir.iter().map(|e| (e.path.as_str(), e.kind)).collect();
    assert_eq!(
        kinds,
        vec![("backups/a.txt", ObjectKind::File), ("backups/notes", ObjectKind::Directory)]
    );

    let single = github.list("backups/a.txt").await.unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].name, "a.txt");

    let root = github.list("").await.unwrap();
    assert_eq!(root.len(), 1);
    assert_eq!(root[0].kind, ObjectKind::Directory);
}

#[tokio::test]
async fn test_missing_objects() {
    let api = spawn_fake(FakeGitHub::default()).await;
    let github = client(&api, Some(TOKEN));

    assert!(github.get_metadata("nope.txt").await.unwrap().is_none());
    assert_eq!(
        github.get_content("nope.txt").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(github.list("nope").await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_restore_from_remote() {
    let api = spawn_fake(FakeGitHub::default()).await;
    let github = client(&api, Some(TOKEN));
    github.put_content("a/x.txt", b"first", None).await.unwrap();
    github.put_content("b/x.txt", b"second", None).await.unwrap();

    let target = TempDir::new().unwrap();
    let plan = repo_backup::plan::plan_restore(&["a/x.txt", "b/x.txt"], target.path()).unwrap();
    let result = BatchExecutor::new(&github)
        .execute(&plan, Direction::Restore, |_| {})
        .await;

    assert_eq!(result.status(), BatchStatus::Complete);
    assert_eq!(std::fs::read(target.path().join("x.txt")).unwrap(), b"second");
}

#[tokio::test]
async fn test_bad_token_fails_every_unit_without_aborting() {
    let api = spawn_fake(FakeGitHub::default()).await;
    let github = client(&api, Some("revoked"));

    let target = TempDir::new().unwrap();
    let plan = repo_backup::plan::plan_restore(&["a.txt", "b.txt"], target.path()).unwrap();
    let result = BatchExecutor::new(&github)
        .execute(&plan, Direction::Restore, |_| {})
        .await;

    assert_eq!(result.attempted, 2);
    assert_eq!(result.status(), BatchStatus::Failed);
    assert!(result
        .outcomes
        .iter()
        .all(|o| o.error_kind == Some(ErrorKind::Unauthenticated)));
}
