mod common;

use std::sync::Arc;

use docsync_core::action::ActionContext;
use docsync_core::actions::OriginatingChange;
use docsync_core::config::PipelineConfig;
use docsync_core::contract::{ChangeType, DocKind};
use docsync_core::links::{DocumentationLink, LinkStore, MemoryLinkStore};
use docsync_core::matching::DOC_PR_MARKER;
use docsync_core::pipeline::{run_reconciliation_pipeline, PipelineOutcome};
use docsync_core::PipelineError;

use common::{repo, FakeGateway, FakeGenerator};

fn openai_change() -> OriginatingChange {
    OriginatingChange {
        number: Some(42),
        title: "Add OpenAI provider".to_string(),
        description: "Adds an OpenAI-backed LLM provider.".to_string(),
        base_branch: "main".to_string(),
        head_branch: "feature/openai".to_string(),
    }
}

fn context(gateway: &Arc<FakeGateway>, generator: &Arc<FakeGenerator>) -> ActionContext {
    ActionContext::new(repo(), gateway.clone(), generator.clone())
}

async fn run(
    gateway: &Arc<FakeGateway>,
    generator: &Arc<FakeGenerator>,
) -> Result<PipelineOutcome, PipelineError> {
    run_reconciliation_pipeline(
        context(gateway, generator),
        openai_change(),
        None,
        Arc::new(PipelineConfig::default()),
    )
    .await
}

#[tokio::test]
async fn new_source_file_opens_one_documentation_pr() {
    let gateway = Arc::new(FakeGateway::new().with_change(42, &[("src/llm/openai.ts", ChangeType::Added)]));
    let generator = Arc::new(FakeGenerator::new());

    let outcome = run(&gateway, &generator).await.expect("pipeline run");

    assert_eq!(outcome.branch.as_deref(), Some("docs/update-pr-42"));
    assert_eq!(outcome.pull_request_number, Some(100));
    assert_eq!(outcome.files_written, vec!["docs/llm/openai.mdx".to_string()]);

    gateway.snapshot(|p| {
        assert_eq!(p.branches_created, 1);
        assert_eq!(p.prs_created, 1);
        assert_eq!(p.prs_updated, 0);

        let pr = &p.open_prs[0];
        assert!(pr.title.starts_with(DOC_PR_MARKER), "title: {}", pr.title);
        assert!(pr.body.as_deref().unwrap_or_default().contains("#42"));
        assert_eq!(pr.head_ref, "docs/update-pr-42");
        assert_eq!(pr.base_ref, "main");

        assert_eq!(p.comments.len(), 1);
        assert_eq!(p.comments[0].0, 42);
        assert!(p.comments[0].1.contains("#100"));
        assert_eq!(p.labels.get(&100), Some(&vec!["documentation".to_string()]));

        assert_eq!(p.writes.len(), 1);
        assert_eq!(p.writes[0].branch, "docs/update-pr-42");
        assert!(p.writes[0].prior_sha.is_none());
        assert!(p.writes[0].message.contains("#42"));
    });

    let requests = generator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target_path, "docs/llm/openai.mdx");
    assert!(requests[0].prior_content.is_none());
    assert!(requests[0].change_summary.contains("src/llm/openai.ts"));
}

#[tokio::test]
async fn rerun_updates_the_same_branch_and_pr() {
    let gateway = Arc::new(FakeGateway::new().with_change(42, &[("src/llm/openai.ts", ChangeType::Added)]));
    let generator = Arc::new(FakeGenerator::new());

    let first = run(&gateway, &generator).await.expect("first run");
    let second = run(&gateway, &generator).await.expect("second run");

    assert_eq!(first.branch, second.branch);
    assert_eq!(first.pull_request_number, second.pull_request_number);

    gateway.snapshot(|p| {
        assert_eq!(p.branches_created, 1, "no second branch");
        assert_eq!(p.prs_created, 1, "no second PR");
        assert_eq!(p.prs_updated, 1);
        assert_eq!(p.comments.len(), 1, "cross-reference is posted once");
        assert_eq!(p.writes.len(), 2);
        assert!(p.writes[1].prior_sha.is_some(), "second write replaces the draft");
        assert!(p.writes[1].message.starts_with("docs: update"));
    });

    // The second run starts from the draft in the open PR.
    let requests = generator.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1]
        .prior_content
        .as_deref()
        .is_some_and(|prior| prior.starts_with("# docs/llm/openai.mdx")));
}

#[tokio::test]
async fn existing_documentation_pr_is_adopted() {
    let gateway = Arc::new(
        FakeGateway::new()
            .with_change(42, &[("src/llm/openai.ts", ChangeType::Modified)])
            .with_open_pr(common::documentation_pr(7, 42, "docs/legacy-openai")),
    );
    gateway
        .platform
        .lock()
        .unwrap()
        .branches
        .insert("docs/legacy-openai".to_string(), "sha-legacy".to_string());
    let generator = Arc::new(FakeGenerator::new());

    let outcome = run(&gateway, &generator).await.expect("pipeline run");

    assert_eq!(outcome.branch.as_deref(), Some("docs/legacy-openai"));
    assert_eq!(outcome.pull_request_number, Some(7));
    gateway.snapshot(|p| {
        assert_eq!(p.branches_created, 0);
        assert_eq!(p.prs_created, 0);
        assert_eq!(p.prs_updated, 1);
        assert!(p.comments.is_empty());
    });
}

#[tokio::test]
async fn change_without_documented_files_writes_nothing() {
    let gateway = Arc::new(FakeGateway::new().with_change(
        42,
        &[
            ("README.md", ChangeType::Modified),
            ("src/llm/removed.ts", ChangeType::Deleted),
        ],
    ));
    let generator = Arc::new(FakeGenerator::new());

    let outcome = run(&gateway, &generator).await.expect("pipeline run");

    assert_eq!(outcome, PipelineOutcome::default());
    gateway.snapshot(|p| {
        assert_eq!(p.branches_created, 0);
        assert_eq!(p.prs_created, 0);
        assert!(p.writes.is_empty());
        assert!(p.comments.is_empty());
    });
    assert!(generator.requests().is_empty());
}

#[tokio::test]
async fn sibling_pages_steer_style_and_navigation_is_regenerated() {
    let gateway = Arc::new(
        FakeGateway::new()
            .with_change(
                42,
                &[
                    ("src/llm/openai.ts", ChangeType::Added),
                    ("src/llm/anthropic.ts", ChangeType::Modified),
                ],
            )
            .with_file("main", "docs/mint.json", "{\"navigation\":[]}")
            .with_file("main", "docs/llm/anthropic.mdx", "# Anthropic\n"),
    );
    let generator = Arc::new(FakeGenerator::new());

    let outcome = run(&gateway, &generator).await.expect("pipeline run");

    assert_eq!(
        outcome.files_written,
        vec![
            "docs/llm/anthropic.mdx".to_string(),
            "docs/llm/openai.mdx".to_string(),
            "docs/mint.json".to_string(),
        ]
    );

    let requests = generator.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].prior_content.as_deref(), Some("# Anthropic\n"));
    assert!(requests[0].templates.is_empty());
    assert_eq!(requests[1].templates, vec!["# Anthropic\n".to_string()]);
    assert_eq!(requests[2].kind, DocKind::Navigation);
    assert_eq!(requests[2].prior_content.as_deref(), Some("{\"navigation\":[]}"));
    assert!(requests[2].change_summary.contains("docs/llm/openai.mdx [new]"));

    gateway.snapshot(|p| {
        let nav_write = p
            .writes
            .iter()
            .find(|w| w.path == "docs/mint.json")
            .expect("navigation written");
        assert!(nav_write.prior_sha.is_some(), "navigation is updated in place");
        assert_eq!(p.prs_created, 1);
    });
}

#[tokio::test]
async fn rejected_content_aborts_before_pull_request() {
    let gateway = Arc::new(FakeGateway::new().with_change(42, &[("src/llm/openai.ts", ChangeType::Added)]));
    let generator = Arc::new(FakeGenerator::producing_short_pages());

    let err = run(&gateway, &generator).await.unwrap_err();

    match err {
        PipelineError::ContentQualityRejected { path, .. } => {
            assert_eq!(path, "docs/llm/openai.mdx")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    gateway.snapshot(|p| {
        assert!(p.writes.is_empty());
        assert_eq!(p.prs_created, 0);
    });
}

#[tokio::test]
async fn link_store_records_branch_and_pr() {
    let gateway = Arc::new(FakeGateway::new().with_change(42, &[("src/llm/openai.ts", ChangeType::Added)]));
    let generator = Arc::new(FakeGenerator::new());
    let links = Arc::new(MemoryLinkStore::new());
    let ctx = context(&gateway, &generator).with_links(links.clone());

    run_reconciliation_pipeline(ctx, openai_change(), None, Arc::new(PipelineConfig::default()))
        .await
        .expect("pipeline run");

    assert_eq!(
        links.get(42).expect("link lookup"),
        Some(DocumentationLink {
            branch: "docs/update-pr-42".to_string(),
            pull_request: Some(100),
        })
    );
}

#[tokio::test]
async fn link_store_wins_over_title_heuristic() {
    // PR #100 was retitled by a human and no longer carries the marker.
    let mut retitled = common::documentation_pr(100, 42, "docs/update-pr-42");
    retitled.title = "OpenAI docs".to_string();
    let gateway = Arc::new(
        FakeGateway::new()
            .with_change(42, &[("src/llm/openai.ts", ChangeType::Modified)])
            .with_open_pr(retitled),
    );
    gateway
        .platform
        .lock()
        .unwrap()
        .branches
        .insert("docs/update-pr-42".to_string(), "sha-docs".to_string());
    let generator = Arc::new(FakeGenerator::new());
    let links = Arc::new(MemoryLinkStore::new());
    links
        .put(
            42,
            DocumentationLink {
                branch: "docs/update-pr-42".to_string(),
                pull_request: Some(100),
            },
        )
        .expect("seed link");
    let ctx = context(&gateway, &generator).with_links(links);

    let outcome = run_reconciliation_pipeline(ctx, openai_change(), None, Arc::new(PipelineConfig::default()))
        .await
        .expect("pipeline run");

    assert_eq!(outcome.pull_request_number, Some(100));
    gateway.snapshot(|p| {
        assert_eq!(p.prs_created, 0);
        assert_eq!(p.prs_updated, 1);
        assert!(p.open_prs[0].title.starts_with(DOC_PR_MARKER), "title is normalised again");
    });
}

#[tokio::test]
async fn stale_link_follows_the_open_pr_branch() {
    let gateway = Arc::new(
        FakeGateway::new()
            .with_change(42, &[("src/llm/openai.ts", ChangeType::Modified)])
            .with_open_pr(common::documentation_pr(7, 42, "docs/update-pr-42")),
    );
    {
        let mut platform = gateway.platform.lock().unwrap();
        platform
            .branches
            .insert("docs/update-pr-42".to_string(), "sha-pr".to_string());
        platform
            .branches
            .insert("docs/stale".to_string(), "sha-stale".to_string());
    }
    let generator = Arc::new(FakeGenerator::new());
    let links = Arc::new(MemoryLinkStore::new());
    links
        .put(
            42,
            DocumentationLink {
                branch: "docs/stale".to_string(),
                pull_request: Some(3),
            },
        )
        .expect("seed link");
    let ctx = context(&gateway, &generator).with_links(links.clone());

    let outcome = run_reconciliation_pipeline(ctx, openai_change(), None, Arc::new(PipelineConfig::default()))
        .await
        .expect("pipeline run");

    assert_eq!(outcome.branch.as_deref(), Some("docs/update-pr-42"));
    assert_eq!(outcome.pull_request_number, Some(7));
    gateway.snapshot(|p| {
        assert_eq!(p.branches_created, 0);
        assert_eq!(p.prs_created, 0);
        assert!(!p.writes.is_empty());
        assert!(p.writes.iter().all(|w| w.branch == "docs/update-pr-42"));
    });
    assert_eq!(
        links.get(42).expect("link lookup"),
        Some(DocumentationLink {
            branch: "docs/update-pr-42".to_string(),
            pull_request: Some(7),
        })
    );
}
