//! Integration tests for artifact download and listing.

mod common;

use std::sync::Arc;

use axum::http::{header, StatusCode};
use common::{
    body_bytes, body_json, build_test_app, get, submit, wait_for_terminal, ScriptedBackend,
};
use serde_json::json;
use tokio::sync::Semaphore;

// ---------------------------------------------------------------------------
// Test: download carries type, length and attachment headers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn download_sets_headers() {
    let app = build_test_app(ScriptedBackend::default());
    let job_id = submit(&app, json!({"prompt": "a mountain lake"})).await;
    wait_for_terminal(&app, &job_id).await;

    let response = get(app.router.clone(), &format!("/output/{job_id}.ply")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(
        headers[header::CONTENT_LENGTH],
        "scene:a mountain lake".len().to_string().as_str()
    );
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{job_id}.ply\"").as_str()
    );
}

// ---------------------------------------------------------------------------
// Test: mesh option produces a .glb artifact
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mesh_option_produces_glb() {
    let app = build_test_app(ScriptedBackend::default());
    let job_id = submit(
        &app,
        json!({"prompt": "a mountain lake", "return_mesh": true}),
    )
    .await;

    let job = wait_for_terminal(&app, &job_id).await;
    assert_eq!(job["output_file"], format!("{job_id}.glb"));

    let response = get(app.router.clone(), &format!("/output/{job_id}.glb")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "model/gltf-binary");
    assert_eq!(body_bytes(response).await, b"scene:a mountain lake");

    let response = get(app.router.clone(), &format!("/output/{job_id}.ply")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: unknown artifact is 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_artifact_is_404() {
    let app = build_test_app(ScriptedBackend::default());

    let response = get(app.router.clone(), "/output/deadbeef.ply").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Test: names outside the artifact convention are never resolved
// ---------------------------------------------------------------------------

#[tokio::test]
async fn traversal_and_foreign_names_are_404() {
    let app = build_test_app(ScriptedBackend::default());
    std::fs::create_dir_all(&app.output_dir).unwrap();
    std::fs::write(app.output_dir.join("notes.ply"), b"not an artifact").unwrap();

    for uri in [
        "/output/..%2Fstatic%2Findex.html",
        "/output/..%2F..%2Fetc%2Fpasswd",
        "/output/notes.ply",
        "/output/deadbeef.txt",
    ] {
        let response = get(app.router.clone(), uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

// ---------------------------------------------------------------------------
// Test: a running job has no fetchable artifact
// ---------------------------------------------------------------------------

#[tokio::test]
async fn running_job_has_no_artifact() {
    let gate = Arc::new(Semaphore::new(0));
    let app = build_test_app(ScriptedBackend {
        gate: Some(Arc::clone(&gate)),
        ..Default::default()
    });

    let job_id = submit(&app, json!({"prompt": "a mountain lake"})).await;
    let response = get(app.router.clone(), &format!("/output/{job_id}.ply")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    gate.add_permits(1);
    wait_for_terminal(&app, &job_id).await;
    let response = get(app.router.clone(), &format!("/output/{job_id}.ply")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: GET /outputs lists finished artifacts only
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_outputs_shows_finished_artifacts() {
    let app = build_test_app(ScriptedBackend::default());

    let listed = body_json(get(app.router.clone(), "/outputs").await).await;
    assert_eq!(listed, json!([]));

    let ply = submit(&app, json!({"prompt": "a mountain lake"})).await;
    let glb = submit(&app, json!({"prompt": "a red barn", "return_mesh": true})).await;
    wait_for_terminal(&app, &ply).await;
    wait_for_terminal(&app, &glb).await;
    std::fs::write(app.output_dir.join("readme.txt"), b"ignored").unwrap();

    let response = get(app.router.clone(), "/outputs").await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    let listed = listed.as_array().unwrap();

    let mut expected = vec![format!("{ply}.ply"), format!("{glb}.glb")];
    expected.sort();
    let names: Vec<&str> = listed.iter().map(|a| a["name"].as_str().unwrap()).collect();
    assert_eq!(names, expected);

    for entry in listed {
        assert!(entry["size"].as_u64().unwrap() > 0);
        assert!(entry["modified"].is_string());
    }
}
