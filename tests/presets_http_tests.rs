//! HTTP integration tests: the preset routes served on a real listener and
//! exercised with reqwest.

use anyhow::Result;
use serde_json::{json, Value};
use tempfile::TempDir;

use presetd::defaults::DefaultPresetIndex;
use presetd::server::{router, AppState, USER_HANDLE_HEADER};

struct Server {
    _tmp: TempDir,
    base: String,
    data_root: std::path::PathBuf,
    client: reqwest::Client,
}

impl Server {
    fn url(&self, route: &str) -> String {
        format!("{}/api/presets{}", self.base, route)
    }

    async fn post(&self, route: &str, body: Value) -> Result<reqwest::Response> {
        Ok(self.client.post(self.url(route)).json(&body).send().await?)
    }
}

async fn start() -> Result<Server> {
    let tmp = tempfile::tempdir()?;
    let content = tmp.path().join("content");
    std::fs::create_dir_all(content.join("presets/kobold"))?;
    std::fs::write(content.join("presets/kobold/Godlike.json"), r#"{"temp": 0.7}"#)?;
    // Indexed default that cannot be read as a file.
    std::fs::create_dir_all(content.join("presets/kobold/Folder.json"))?;
    std::fs::write(
        content.join("index.json"),
        json!([
            {"filename": "presets/kobold/Godlike.json", "type": "kobold_preset"},
            {"filename": "presets/kobold/Folder.json", "type": "kobold_preset"},
        ])
        .to_string(),
    )?;
    let defaults = DefaultPresetIndex::load(&content)?;
    let data_root = tmp.path().join("data");
    let app = router(AppState::new(defaults, data_root.clone(), "default-user".to_string()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(Server { _tmp: tmp, base: format!("http://{}", addr), data_root, client: reqwest::Client::new() })
}

#[tokio::test]
async fn save_rename_delete_flow() -> Result<()> {
    let s = start().await?;

    let res = s.post("/save", json!({"apiId": "kobold", "name": "myPreset", "preset": {"temp": 0.7}})).await?;
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await?, json!({"name": "myPreset"}));

    let res = s.post("/rename", json!({"apiId": "kobold", "oldName": "myPreset", "newName": "myPreset2"})).await?;
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await?, json!({"ok": true}));

    let renamed = s.data_root.join("default-user/KoboldAI Settings/myPreset2.json");
    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&renamed)?)?;
    assert_eq!(doc, json!({"temp": 0.7, "name": "myPreset2"}));

    let res = s.post("/delete", json!({"apiId": "kobold", "name": "myPreset"})).await?;
    assert_eq!(res.status(), 404);
    let res = s.post("/delete", json!({"apiId": "kobold", "name": "myPreset2"})).await?;
    assert_eq!(res.status(), 200);
    assert!(!renamed.exists());
    Ok(())
}

#[tokio::test]
async fn validation_failures_are_bad_requests() -> Result<()> {
    let s = start().await?;
    let unknown = s.post("/save", json!({"apiId": "nope", "name": "x", "preset": {}})).await?;
    assert_eq!(unknown.status(), 400);
    assert_eq!(unknown.json::<Value>().await?["code"], "unknown_backend");

    let missing = s.post("/save", json!({"apiId": "kobold", "name": "x"})).await?;
    assert_eq!(missing.status(), 400);

    let no_name = s.post("/delete", json!({"apiId": "kobold"})).await?;
    assert_eq!(no_name.status(), 400);

    let garbage = s
        .client
        .post(s.url("/save"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(garbage.status(), 400);
    assert_eq!(garbage.json::<Value>().await?["code"], "invalid_body");
    Ok(())
}

#[tokio::test]
async fn rename_conflict_is_reported() -> Result<()> {
    let s = start().await?;
    for name in ["a", "b"] {
        let res = s.post("/save", json!({"apiId": "novel", "name": name, "preset": {"name": name}})).await?;
        assert_eq!(res.status(), 200);
    }
    let res = s.post("/rename", json!({"apiId": "novel", "oldName": "a", "newName": "b"})).await?;
    assert_eq!(res.status(), 400);
    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "preset_name_taken");
    Ok(())
}

#[tokio::test]
async fn restore_reports_bundled_defaults() -> Result<()> {
    let s = start().await?;
    let hit = s.post("/restore", json!({"apiId": "kobold", "name": "Godlike"})).await?;
    assert_eq!(hit.status(), 200);
    assert_eq!(hit.json::<Value>().await?, json!({"isDefault": true, "preset": {"temp": 0.7}}));

    let miss = s.post("/restore", json!({"apiId": "novel", "name": "Godlike"})).await?;
    assert_eq!(miss.json::<Value>().await?, json!({"isDefault": false, "preset": {}}));
    Ok(())
}

#[tokio::test]
async fn restore_of_unreadable_default_is_internal_error() -> Result<()> {
    let s = start().await?;
    let res = s.post("/restore", json!({"apiId": "kobold", "name": "Folder"})).await?;
    assert_eq!(res.status(), 500);
    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "internal server error");
    Ok(())
}

#[tokio::test]
async fn long_names_save_and_rename() -> Result<()> {
    let s = start().await?;
    let longest = "a".repeat(250);
    let res = s.post("/save", json!({"apiId": "kobold", "name": "a".repeat(300), "preset": {"v": 1}})).await?;
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await?, json!({"name": &longest}));

    let res = s.post("/rename", json!({"apiId": "kobold", "oldName": &longest, "newName": "b".repeat(250)})).await?;
    assert_eq!(res.status(), 200);
    assert!(s.data_root.join(format!("default-user/KoboldAI Settings/{}.json", "b".repeat(250))).is_file());
    Ok(())
}

#[tokio::test]
async fn delete_openai_accepts_numeric_name() -> Result<()> {
    let s = start().await?;
    let res = s.client.post(format!("{}?name=5", s.url("/save-openai"))).json(&json!({})).send().await?;
    assert_eq!(res.status(), 200);
    let res = s.post("/delete-openai", json!({"name": 5})).await?;
    assert_eq!(res.json::<Value>().await?, json!({"ok": true}));
    let zero = s.post("/delete-openai", json!({"name": 0})).await?;
    assert_eq!(zero.status(), 400);
    Ok(())
}

#[tokio::test]
async fn openai_pair_round_trip() -> Result<()> {
    let s = start().await?;
    let res = s
        .client
        .post(format!("{}?name=Default", s.url("/save-openai")))
        .json(&json!({"temperature": 1.0}))
        .send()
        .await?;
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await?, json!({"name": "Default"}));
    assert!(s.data_root.join("default-user/OpenAI Settings/Default.json").is_file());

    let no_name = s.client.post(s.url("/save-openai")).json(&json!({})).send().await?;
    assert_eq!(no_name.status(), 400);

    let first = s.post("/delete-openai", json!({"name": "Default"})).await?;
    assert_eq!(first.json::<Value>().await?, json!({"ok": true}));
    let second = s.post("/delete-openai", json!({"name": "Default"})).await?;
    assert_eq!(second.json::<Value>().await?, json!({"error": true}));
    Ok(())
}

#[tokio::test]
async fn users_are_isolated_by_header() -> Result<()> {
    let s = start().await?;
    let res = s
        .client
        .post(s.url("/save"))
        .header(USER_HANDLE_HEADER, "alice")
        .json(&json!({"apiId": "instruct", "name": "Alpaca", "preset": {"v": 1}}))
        .send()
        .await?;
    assert_eq!(res.status(), 200);
    assert!(s.data_root.join("alice/instruct/Alpaca.json").is_file());

    // The default user has no such preset.
    let res = s.post("/delete", json!({"apiId": "instruct", "name": "Alpaca"})).await?;
    assert_eq!(res.status(), 404);
    Ok(())
}

#[tokio::test]
async fn liveness_route_answers() -> Result<()> {
    let s = start().await?;
    let res = s.client.get(format!("{}/", s.base)).send().await?;
    assert_eq!(res.status(), 200);
    Ok(())
}
