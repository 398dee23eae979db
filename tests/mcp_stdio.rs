use std::path::{Path, PathBuf};

use cvsearch::{ConfigDb, Embedder, HashEmbedder, VectorStore, ingestion};
use rmcp::{
    ServiceExt,
    model::CallToolRequestParams,
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::json;

const RESUMES: &str = concat!(
    r#"{"id":"ann","name":"Ann Lee","summary":"Backend engineer building Rust services","skills":"Rust, Tokio, PostgreSQL","work_history":"Acme Corp, platform team"}"#,
    "\n",
    r#"{"id":"bo","name":"Bo Park","summary":"Pastry chef","skills":"Baking, French cuisine","education":"Culinary institute"}"#,
    "\n",
);

fn setup_fixture(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config_db = ConfigDb::open(&data_dir.join("config.redb"))?;
    let store = VectorStore::open(&data_dir.join("vectors.redb"))?;
    let embedder = HashEmbedder::default();

    config_db.record_embedder(embedder.name())?;
    let stats = ingestion::ingest_str(RESUMES, &store, &embedder);
    assert_eq!(stats.successful, 2);

    Ok(())
}

#[tokio::test]
async fn mcp_stdio_search_roundtrip() -> Result<(), Box<dyn std::error::Error>>
{
    let tempdir = tempfile::tempdir()?;
    setup_fixture(tempdir.path())?;

    let bin = cvsearch_bin()?;
    let transport = TokioChildProcess::new(
        tokio::process::Command::new(bin).configure(|cmd| {
            cmd.arg("mcp").env("CVSEARCH_DATA_DIR", tempdir.path());
        }),
    )?;

    let client = ().serve(transport).await?;

    let args = json!({
        "query": "Rust backend engineer",
        "limit": 1,
        "includeFullRecord": true
    });

    let result = client
        .peer()
        .call_tool(CallToolRequestParams {
            meta: None,
            name: "resume_search".into(),
            arguments: Some(args.as_object().unwrap().clone()),
            task: None,
        })
        .await?;

    let structured = result.structured_content.expect("structured content");
    let results = structured
        .get("results")
        .and_then(|v| v.as_array())
        .expect("results array");

    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].get("candidate_id").and_then(|v| v.as_str()),
        Some("ann")
    );
    assert_eq!(
        results[0]["record"]["work_history"].as_str(),
        Some("Acme Corp, platform team")
    );

    let get_args = json!({ "resumeId": "bo" });
    let get_result = client
        .peer()
        .call_tool(CallToolRequestParams {
            meta: None,
            name: "resume_get".into(),
            arguments: Some(get_args.as_object().unwrap().clone()),
            task: None,
        })
        .await?;
    let record = get_result.structured_content.expect("resume record");
    assert_eq!(record["name"].as_str(), Some("Bo Park"));
    assert_eq!(record["education"].as_str(), Some("Culinary institute"));

    client.cancel().await?;
    Ok(())
}

fn cvsearch_bin() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Ok(bin) = std::env::var("CARGO_BIN_EXE_cvsearch") {
        return Ok(PathBuf::from(bin));
    }

    let mut path = std::env::current_exe()?;
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("cvsearch");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    Ok(path)
}
