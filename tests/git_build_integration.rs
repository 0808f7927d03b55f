//! Integration tests for git-build entries, with git and make faked in-process.

use std::path::PathBuf;
use std::sync::Arc;

use specfetch_core::{
    BuildRecipe, CommandRunner, EntryStatus, FetchOptions, Fetcher, HttpClient, Manifest,
    ManifestEntry, ManifestError, ReleaseClient, Toolchain,
};
use tempfile::TempDir;

mod support;
use support::fake_tools::FakeTools;
use support::{ephemeral_context, fetcher_with, persistent_context};

const REPO: &str = "https://gitlab.example.invalid/x86-psABIs/x86-64-ABI.git";

fn psabi_entry() -> ManifestEntry {
    ManifestEntry::git_build(
        "x86-64",
        REPO,
        BuildRecipe {
            subdir: Some(PathBuf::from("x86-64-ABI")),
            target: Some("all".to_string()),
            artifact: PathBuf::from("x86-64-ABI/abi.pdf"),
        },
        "x86-64-psABI.pdf",
    )
}

fn runner(tools: &Arc<FakeTools>) -> Arc<dyn CommandRunner> {
    Arc::clone(tools) as Arc<dyn CommandRunner>
}

#[tokio::test]
async fn test_first_run_clones_then_later_runs_pull() {
    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let manifest = Manifest::new(vec![psabi_entry()]).unwrap();

    let first = Arc::new(FakeTools::new().with_make_output("abi.pdf", b"%PDF-first"));
    let ctx = persistent_context(out.path(), work.path());
    let report = fetcher_with(runner(&first), "http://127.0.0.1:9", FetchOptions::default())
        .run(&manifest, &ctx)
        .await;

    assert!(report.get("x86-64").unwrap().is_success());
    assert_eq!(first.subcommands("git"), vec!["clone"]);
    assert_eq!(first.subcommands("make"), vec!["all"]);
    assert_eq!(
        std::fs::read(out.path().join("x86-64-psABI.pdf")).unwrap(),
        b"%PDF-first"
    );

    let second = Arc::new(FakeTools::new().with_make_output("abi.pdf", b"%PDF-second"));
    let ctx = persistent_context(out.path(), work.path());
    let report = fetcher_with(runner(&second), "http://127.0.0.1:9", FetchOptions::default())
        .run(&manifest, &ctx)
        .await;

    assert!(report.get("x86-64").unwrap().is_success());
    assert_eq!(second.subcommands("git"), vec!["pull"]);
    assert_eq!(
        std::fs::read(out.path().join("x86-64-psABI.pdf")).unwrap(),
        b"%PDF-second"
    );
}

#[tokio::test]
async fn test_make_runs_inside_recipe_subdir() {
    let out = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new().with_make_output("abi.pdf", b"%PDF"));
    let ctx = persistent_context(out.path(), work.path());

    fetcher_with(runner(&tools), "http://127.0.0.1:9", FetchOptions::default())
        .run(&Manifest::new(vec![psabi_entry()]).unwrap(), &ctx)
        .await;

    let make = tools
        .commands()
        .into_iter()
        .find(|c| c.program() == "make")
        .unwrap();
    assert_eq!(
        make.get_cwd().unwrap(),
        work.path().join("x86-64").join("repo").join("x86-64-ABI")
    );
}

#[tokio::test]
async fn test_missing_artifact_fails_entry() {
    let out = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new().with_make_output("other.pdf", b"%PDF"));
    let ctx = ephemeral_context(out.path());

    let report = fetcher_with(runner(&tools), "http://127.0.0.1:9", FetchOptions::default())
        .run(&Manifest::new(vec![psabi_entry()]).unwrap(), &ctx)
        .await;

    match &report.get("x86-64").unwrap().status {
        EntryStatus::Failed { error } => assert!(error.contains("was not produced"), "{error}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!out.path().join("x86-64-psABI.pdf").exists());
}

#[tokio::test]
async fn test_build_tool_failure_fails_entry() {
    let out = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new());
    let toolchain = Toolchain {
        make: "gmake".to_string(),
        ..Toolchain::default()
    };
    let http = HttpClient::new();
    let releases = ReleaseClient::new(http.clone());
    let fetcher = Fetcher::new(
        http,
        releases,
        runner(&tools),
        toolchain,
        FetchOptions::default(),
    );
    let ctx = ephemeral_context(out.path());

    let report = fetcher
        .run(&Manifest::new(vec![psabi_entry()]).unwrap(), &ctx)
        .await;

    match &report.get("x86-64").unwrap().status {
        EntryStatus::Failed { error } => {
            assert!(error.starts_with("build failed"), "{error}");
            assert!(error.contains("gmake"), "{error}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_entries_sharing_a_checkout_are_rejected() {
    let entry = |label: &str, repo: &str, dest: &str| {
        ManifestEntry::git_build(
            label,
            repo,
            BuildRecipe {
                subdir: None,
                target: None,
                artifact: PathBuf::from("abi.pdf"),
            },
            dest,
        )
    };

    let err = Manifest::new(vec![
        entry("X86", "https://git.example.invalid/one.git", "one.pdf"),
        entry("x86", "https://git.example.invalid/two.git", "two.pdf"),
    ])
    .unwrap_err();

    assert!(matches!(err, ManifestError::DuplicateSlug { .. }), "{err}");
}
