use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use dtmpl_build::reconcile::{Outcome, ReconcileEngine, ReconcileError, ReconcileOptions};
use dtmpl_build::renderer::{RenderError, RenderRequest, Renderer};
use dtmpl_core::{MappingTable, Variant};
use mockall::mock;
use tempfile::TempDir;

mock! {
    Engine {}

    impl Renderer for Engine {
        async fn render(&self, request: &RenderRequest, output: &Path) -> Result<(), RenderError>;
    }
}

/// Renders `FROM <image>:<version>-<variant>` and records every request.
#[derive(Clone, Default)]
struct RecordingRenderer {
    seen: Arc<Mutex<Vec<(String, Variant)>>>,
}

impl RecordingRenderer {
    fn seen(&self) -> Vec<(String, Variant)> {
        self.seen.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    async fn render(&self, request: &RenderRequest, output: &Path) -> Result<(), RenderError> {
        self.seen
            .lock()
            .unwrap()
            .push((request.version.clone(), request.variant.clone()));
        std::fs::write(output, expected_content(request))
            .map_err(|e| RenderError::ConfigWrite { source: e })
    }
}

fn expected_content(request: &RenderRequest) -> String {
    format!(
        "FROM {}:{}-{}\n",
        request.image,
        request.version,
        request.variant.label()
    )
}

fn options(workdir: &Path) -> ReconcileOptions {
    ReconcileOptions {
        workdir: workdir.to_path_buf(),
        image: "ruby".to_owned(),
        quiet: false,
        dry_run: false,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn no_mapping() -> MappingTable {
    MappingTable::default()
}

// ── Single target ──

#[tokio::test]
async fn missing_target_is_created() {
    let tmp = TempDir::new().unwrap();
    let engine = ReconcileEngine::new(RecordingRenderer::default(), options(tmp.path()));

    let outcome = engine.reconcile("2.1", &Variant::default()).await.unwrap();

    assert_eq!(outcome, Outcome::Updated);
    let content = std::fs::read_to_string(tmp.path().join("2.1/Dockerfile")).unwrap();
    assert_eq!(content, "FROM ruby:2.1-_default\n");
}

#[tokio::test]
async fn variant_target_creates_nested_directory() {
    let tmp = TempDir::new().unwrap();
    let engine = ReconcileEngine::new(RecordingRenderer::default(), options(tmp.path()));

    let outcome = engine
        .reconcile("2.1", &Variant::new("alpine"))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Updated);
    assert!(tmp.path().join("2.1/alpine/Dockerfile").is_file());
}

#[tokio::test]
async fn identical_target_is_left_untouched() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("2.1/Dockerfile");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(&target, "FROM ruby:2.1-_default\n").unwrap();
    let before = std::fs::metadata(&target).unwrap().modified().unwrap();

    let engine = ReconcileEngine::new(RecordingRenderer::default(), options(tmp.path()));
    let outcome = engine.reconcile("2.1", &Variant::default()).await.unwrap();

    assert_eq!(outcome, Outcome::Unchanged);
    let after = std::fs::metadata(&target).unwrap().modified().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn stale_target_is_replaced() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("2.1/Dockerfile");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(&target, "FROM ruby:old\n").unwrap();

    let engine = ReconcileEngine::new(RecordingRenderer::default(), options(tmp.path()));
    let outcome = engine.reconcile("2.1", &Variant::default()).await.unwrap();

    assert_eq!(outcome, Outcome::Updated);
    assert_eq!(
        std::fs::read_to_string(&target).unwrap(),
        "FROM ruby:2.1-_default\n"
    );
}

#[tokio::test]
async fn dry_run_reports_but_does_not_write() {
    let tmp = TempDir::new().unwrap();
    let engine = ReconcileEngine::new(
        RecordingRenderer::default(),
        ReconcileOptions {
            dry_run: true,
            ..options(tmp.path())
        },
    );

    let outcome = engine.reconcile("2.1", &Variant::default()).await.unwrap();

    assert_eq!(outcome, Outcome::Updated);
    assert!(!tmp.path().join("2.1").exists());
}

#[tokio::test]
async fn dry_run_leaves_stale_target_as_is() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("2.1/Dockerfile");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(&target, "FROM ruby:old\n").unwrap();

    let engine = ReconcileEngine::new(
        RecordingRenderer::default(),
        ReconcileOptions {
            dry_run: true,
            quiet: true,
            ..options(tmp.path())
        },
    );
    let outcome = engine.reconcile("2.1", &Variant::default()).await.unwrap();

    assert_eq!(outcome, Outcome::Updated);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "FROM ruby:old\n");
}

#[tokio::test]
async fn empty_render_for_missing_target_is_unchanged() {
    let tmp = TempDir::new().unwrap();
    let mut mock = MockEngine::new();
    mock.expect_render().returning(|_, _| Ok(()));

    let engine = ReconcileEngine::new(mock, options(tmp.path()));
    let outcome = engine.reconcile("2.1", &Variant::default()).await.unwrap();

    assert_eq!(outcome, Outcome::Unchanged);
    assert!(!tmp.path().join("2.1/Dockerfile").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn existing_permissions_survive_replace() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("2.1/Dockerfile");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(&target, "FROM ruby:old\n").unwrap();
    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o664)).unwrap();

    let engine = ReconcileEngine::new(RecordingRenderer::default(), options(tmp.path()));
    engine.reconcile("2.1", &Variant::default()).await.unwrap();

    let mode = std::fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o664);
}

// ── Full runs ──

#[tokio::test]
async fn second_run_is_a_no_op() {
    let tmp = TempDir::new().unwrap();
    let versions = strings(&["2.1", "2.2"]);
    let variants = vec![Variant::default(), Variant::new("alpine")];
    let engine = ReconcileEngine::new(RecordingRenderer::default(), options(tmp.path()));

    let first = engine.run(&versions, &variants, &no_mapping()).await.unwrap();
    let second = engine.run(&versions, &variants, &no_mapping()).await.unwrap();

    assert_eq!(first.count(Outcome::Updated), 4);
    assert_eq!(second.count(Outcome::Updated), 0);
    assert_eq!(second.count(Outcome::Unchanged), 4);
}

#[tokio::test]
async fn unmapped_variant_processes_all_versions() {
    let tmp = TempDir::new().unwrap();
    let renderer = RecordingRenderer::default();
    let engine = ReconcileEngine::new(renderer.clone(), options(tmp.path()));

    let report = engine
        .run(
            &strings(&["2.1", "2.2"]),
            &[Variant::new("foo")],
            &no_mapping(),
        )
        .await
        .unwrap();

    assert_eq!(
        renderer.seen(),
        vec![
            ("2.1".to_owned(), Variant::new("foo")),
            ("2.2".to_owned(), Variant::new("foo")),
        ]
    );
    let updated: Vec<String> = report
        .updated_targets()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(updated, strings(&["2.1/foo/Dockerfile", "2.2/foo/Dockerfile"]));
}

#[tokio::test]
async fn null_mapping_never_renders() {
    let tmp = TempDir::new().unwrap();
    let mut mock = MockEngine::new();
    mock.expect_render().never();

    let raw: BTreeMap<String, Option<Vec<String>>> =
        [("alpine".to_owned(), None)].into_iter().collect();
    let mapping = MappingTable::build(tmp.path(), &raw).unwrap();

    let engine = ReconcileEngine::new(mock, options(tmp.path()));
    let report = engine
        .run(&strings(&["2.1"]), &[Variant::new("alpine")], &mapping)
        .await
        .unwrap();

    assert_eq!(report.count(Outcome::SkippedNoMapping), 1);
    assert!(report.entries[0].target().is_none());
}

#[tokio::test]
async fn mapped_variant_uses_its_own_versions() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("3.0")).unwrap();
    let raw: BTreeMap<String, Option<Vec<String>>> =
        [("slim".to_owned(), Some(strings(&["3.*"])))]
            .into_iter()
            .collect();
    let mapping = MappingTable::build(tmp.path(), &raw).unwrap();
    let renderer = RecordingRenderer::default();
    let engine = ReconcileEngine::new(renderer.clone(), options(tmp.path()));

    engine
        .run(
            &strings(&["2.1"]),
            &[Variant::default(), Variant::new("slim")],
            &mapping,
        )
        .await
        .unwrap();

    assert_eq!(
        renderer.seen(),
        vec![
            ("2.1".to_owned(), Variant::default()),
            ("3.0".to_owned(), Variant::new("slim")),
        ]
    );
}

#[tokio::test]
async fn render_failure_aborts_and_keeps_earlier_updates() {
    let tmp = TempDir::new().unwrap();
    let mut mock = MockEngine::new();
    mock.expect_render()
        .withf(|request, _| request.version == "2.1")
        .returning(|_, output| {
            std::fs::write(output, "FROM ruby:2.1\n").unwrap();
            Ok(())
        });
    mock.expect_render()
        .withf(|request, _| request.version == "2.2")
        .returning(|_, _| {
            Err(RenderError::Failed {
                command: "dj".to_owned(),
                output: "syntax error".to_owned(),
            })
        });
    mock.expect_render()
        .withf(|request, _| request.version == "2.3")
        .never();

    let engine = ReconcileEngine::new(mock, options(tmp.path()));
    let result = engine
        .run(
            &strings(&["2.1", "2.2", "2.3"]),
            &[Variant::default()],
            &no_mapping(),
        )
        .await;

    assert!(matches!(
        result,
        Err(ReconcileError::Render { ref target, .. }) if target == "2.2/Dockerfile"
    ));
    assert!(tmp.path().join("2.1/Dockerfile").is_file());
    assert!(!tmp.path().join("2.2").exists());
}

#[tokio::test]
async fn renderer_receives_configured_image() {
    let tmp = TempDir::new().unwrap();
    let mut mock = MockEngine::new();
    mock.expect_render()
        .withf(|request, _| request.image == "custom-image")
        .times(1)
        .returning(|request, output| {
            std::fs::write(output, expected_content(request)).unwrap();
            Ok(())
        });

    let engine = ReconcileEngine::new(
        mock,
        ReconcileOptions {
            image: "custom-image".to_owned(),
            ..options(tmp.path())
        },
    );
    engine.reconcile("1.0", &Variant::default()).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(tmp.path().join("1.0/Dockerfile")).unwrap(),
        "FROM custom-image:1.0-_default\n"
    );
}
