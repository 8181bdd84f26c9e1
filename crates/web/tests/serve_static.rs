use std::fs;

use tokio::sync::oneshot;

use bookreader_web::StaticServer;

/// Serve `dir` on a free port; dropping the sender stops the server
async fn serve(dir: &std::path::Path) -> (String, oneshot::Sender<()>) {
    let server = StaticServer::bind(0, dir).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(server.run(async {
        let _ = rx.await;
    }));

    (format!("http://{}", addr), tx)
}

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<html><body>bookreader</body></html>").unwrap();
    fs::create_dir(dir.path().join("js")).unwrap();
    fs::write(dir.path().join("js/bookreader.js"), "var bookreader = {};").unwrap();
    fs::create_dir(dir.path().join("chapters")).unwrap();
    fs::write(dir.path().join("chapters/index.html"), "chapter list").unwrap();
    dir
}

#[tokio::test]
async fn binds_localhost() {
    let dir = site();
    let server = StaticServer::bind(0, dir.path()).await.unwrap();
    assert!(server.local_addr().unwrap().ip().is_loopback());
}

#[tokio::test]
async fn root_serves_index_html() {
    let dir = site();
    let (base, _stop) = serve(dir.path()).await;

    let resp = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("bookreader"));
}

#[tokio::test]
async fn files_served_with_guessed_type() {
    let dir = site();
    let (base, _stop) = serve(dir.path()).await;

    let resp = reqwest::get(format!("{base}/js/bookreader.js")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.contains("javascript"), "{content_type}");
    assert_eq!(resp.text().await.unwrap(), "var bookreader = {};");
}

#[tokio::test]
async fn subdirectory_serves_its_index() {
    let dir = site();
    let (base, _stop) = serve(dir.path()).await;

    let resp = reqwest::get(format!("{base}/chapters/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "chapter list");
}

#[tokio::test]
async fn missing_file_is_404() {
    let dir = site();
    let (base, _stop) = serve(dir.path()).await;

    let resp = reqwest::get(format!("{base}/nope.html")).await.unwrap();
    assert_eq!(resp.status(), 404);
}
