use std::path::{Path, PathBuf};

use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pagescribe::cli::{run, Args};
use pagescribe::config::{CleanupConfig, Config, OcrConfig};
use pagescribe::error::{ErrorClass, ScribeError};
use pagescribe::pipeline::CleanupOutcome;

fn config_for(server: &MockServer) -> Config {
    Config {
        ocr: OcrConfig {
            endpoint: Some(server.uri()),
            api_key: Some("vision-key".to_string()),
            timeout_secs: 5,
            poll_interval_ms: 1,
            max_polls: 2,
        },
        cleanup: CleanupConfig {
            api_key: Some("openai-key".to_string()),
            model: "gpt-4.1-mini".to_string(),
            base_url: format!("{}/v1", server.uri()),
            timeout_secs: 5,
        },
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4.1-mini",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

async fn mount_ocr(server: &MockServer, content: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/computervision/imageanalysis:analyze"))
        .and(header("Ocp-Apim-Subscription-Key", "vision-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "readResult": { "content": content }
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn args(image: &Path, outdir: &Path, extra: &[&str]) -> Args {
    let mut argv: Vec<String> = vec![
        "pagescribe".to_string(),
        image.display().to_string(),
        "--outdir".to_string(),
        outdir.display().to_string(),
    ];
    argv.extend(extra.iter().map(|flag| flag.to_string()));
    Args::try_parse_from(argv).expect("arguments should parse")
}

fn image_in(dir: &Path) -> PathBuf {
    let image = dir.join("notebook.png");
    std::fs::write(&image, b"\x89PNG\r\n\x1a\nfake").unwrap();
    image
}

#[tokio::test]
async fn test_full_run_with_cleanup() {
    let server = MockServer::start().await;
    mount_ocr(&server, "jan 5\nstretchs then jumps", 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer openai-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("# Jan 5\n\n- stretches, then jumps\n")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let output = run(&args(&image_in(tmp.path()), &out, &[]), &config_for(&server))
        .await
        .unwrap();

    assert_eq!(output.cleanup, CleanupOutcome::Cleaned);
    assert_eq!(output.final_path, out.join("notebook.clean.md"));
    assert_eq!(
        std::fs::read_to_string(&output.final_path).unwrap(),
        "# Jan 5\n\n- stretches, then jumps"
    );
}

#[tokio::test]
async fn test_no_clean_never_calls_completion_service() {
    let server = MockServer::start().await;
    mount_ocr(&server, "raw words", 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.cleanup.api_key = None;

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let output = run(&args(&image_in(tmp.path()), &out, &["--no-clean"]), &config)
        .await
        .unwrap();

    assert_eq!(output.cleanup, CleanupOutcome::Skipped);
    assert_eq!(std::fs::read(&output.final_path).unwrap(), b"raw words");
}

#[tokio::test]
async fn test_cleanup_service_error_falls_back() {
    let server = MockServer::start().await;
    mount_ocr(&server, "fallback text", 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream failure"))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let output = run(&args(&image_in(tmp.path()), &out, &[]), &config_for(&server))
        .await
        .expect("cleanup failure must not fail the run");

    assert!(matches!(output.cleanup, CleanupOutcome::FellBack { .. }));
    assert_eq!(output.final_path, out.join("notebook.raw.txt"));
    assert_eq!(
        std::fs::read_to_string(&output.final_path).unwrap(),
        "fallback text"
    );
}

#[tokio::test]
async fn test_missing_configuration_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.ocr.api_key = None;
    config.cleanup.api_key = Some("   ".to_string());

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let error = run(&args(&image_in(tmp.path()), &out, &[]), &config)
        .await
        .unwrap_err();

    match &error {
        ScribeError::Configuration { missing } => {
            assert_eq!(missing, &vec!["AZURE_VISION_KEY", "OPENAI_API_KEY"]);
        }
        other => panic!("Expected configuration error, got: {other:?}"),
    }
    assert_ne!(error.exit_code(), 0);
    assert!(!out.exists());
}

#[tokio::test]
async fn test_missing_image_reports_file_error() {
    let server = MockServer::start().await;
    mount_ocr(&server, "never read", 0).await;

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let error = run(
        &args(&tmp.path().join("absent.jpg"), &out, &[]),
        &config_for(&server),
    )
    .await
    .unwrap_err();

    assert_eq!(error.class(), ErrorClass::File);
    assert_eq!(error.exit_code(), 3);
    assert!(!out.exists());
}

#[tokio::test]
async fn test_ocr_auth_failure_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/computervision/imageanalysis:analyze"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vision/v3.2/read/analyze"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let error = run(&args(&image_in(tmp.path()), &out, &[]), &config_for(&server))
        .await
        .unwrap_err();

    assert!(matches!(error, ScribeError::Ocr(_)));
    assert!(error.to_string().contains("Authentication failed"));
    assert_eq!(error.exit_code(), 4);
    assert!(!out.exists());
}
