//! End-to-end tests for the reprocessing pipeline over in-memory collaborators

mod common;

use ::common::entity::EntityId;
use ::common::error::PipelineError;
use ::common::manifest::{BatchManifest, ProcessingConfig};
use ::common::memory::RecordedEvent;
use ::common::pipeline::{CustomPrompts, PipelineConfig, ReprocessOptions};
use ::common::retry::RetryPolicy;
use ::common::store::Actor;

use crate::common::{id, request, TestEnv};

#[tokio::test]
async fn test_cascade_to_parentless_ancestor() {
    let env = TestEnv::new();
    let (target, parent, grandparent) = env.three_level_chain();

    let response = env
        .pipeline()
        .submit(request(&target, &["pinax"], true), None)
        .await
        .unwrap();

    assert_eq!(response.entities_queued, 3);
    assert_eq!(
        response.entity_pis,
        vec![target.to_string(), parent.to_string(), grandparent.to_string()]
    );
    assert_eq!(
        response.status_url,
        format!("https://orchestrator.test/status/{}", response.batch_id)
    );
}

#[tokio::test]
async fn test_single_entity_without_cascade() {
    let env = TestEnv::new();
    let (target, _, _) = env.three_level_chain();

    let response = env
        .pipeline()
        .submit(request(&target, &["description"], false), None)
        .await
        .unwrap();

    assert_eq!(response.entity_pis, vec![target.to_string()]);

    let message = &env.publisher.messages()[0];
    assert_eq!(message.total_files, 1);
    assert_eq!(message.total_bytes, 4);
}

#[tokio::test]
async fn test_published_message_matches_staged_manifest() {
    let env = TestEnv::new();
    let (target, _, _) = env.three_level_chain();
    let mut req = request(&target, &["description", "cheimarros"], true);
    req.options = Some(ReprocessOptions {
        custom_note: Some("re-run after OCR fix".into()),
        custom_prompts: Some(CustomPrompts {
            description: Some("Be brief.".into()),
            ..Default::default()
        }),
        ..Default::default()
    });

    let pipeline = env.pipeline();
    let response = pipeline.submit(req, None).await.unwrap();

    let messages = env.publisher.messages();
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message.batch_id, response.batch_id);
    assert!(message.reprocessing_mode);
    assert_eq!(message.staging_prefix, format!("staging/{}/", response.batch_id));
    assert_eq!(
        message.manifest_location,
        format!("staging/{}/_manifest.json", response.batch_id)
    );
    assert_eq!(message.custom_note.as_deref(), Some("re-run after OCR fix"));
    assert_eq!(
        message.custom_prompts.as_ref().and_then(|p| p.description.as_deref()),
        Some("Be brief.")
    );
    assert!(message.finalized_at >= message.uploaded_at);

    let staged = env.staging.get_object(&message.manifest_location).unwrap();
    let manifest: BatchManifest = serde_json::from_slice(&staged).unwrap();
    assert_eq!(manifest.batch_id, response.batch_id);
    assert_eq!(manifest.directories.len(), 3);
    assert_eq!(manifest.total_files, message.total_files);
    assert_eq!(manifest.total_bytes, message.total_bytes);
    assert_eq!(manifest.total_files, 4);
    assert_eq!(
        manifest.total_bytes,
        manifest.directories.iter().map(|d| d.total_bytes).sum::<u64>()
    );

    for dir in &manifest.directories {
        assert_eq!(
            dir.processing_config,
            ProcessingConfig {
                ocr: false,
                reorganize: false,
                pinax: false,
                cheimarros: true,
                describe: true,
            }
        );
        for file in &dir.files {
            let body = env.staging.get_object(&file.staging_key).unwrap();
            assert_eq!(body.len() as u64, file.size);
        }
    }

    let loaded = pipeline.load_manifest(&response.batch_id).await.unwrap();
    assert_eq!(loaded, manifest);
}

#[tokio::test]
async fn test_entity_without_components_is_not_an_error() {
    let env = TestEnv::new();
    env.add_entity(id(1), None, &[]);

    let response = env
        .pipeline()
        .submit(request(&id(1), &["pinax"], false), None)
        .await
        .unwrap();
    assert_eq!(response.entities_queued, 1);

    let message = &env.publisher.messages()[0];
    assert_eq!(message.total_files, 0);
    assert_eq!(message.total_bytes, 0);
    assert!(env
        .events
        .events()
        .contains(&RecordedEvent::EmptyEntity(id(1))));
}

#[tokio::test]
async fn test_collection_root_bounds_cascade() {
    let env = TestEnv::new();
    let (target, parent, grandparent) = env.three_level_chain();
    env.permissions.set_collection(target.clone(), grandparent.clone());

    let response = env
        .pipeline()
        .submit(request(&target, &["pinax"], true), None)
        .await
        .unwrap();

    assert_eq!(
        response.entity_pis,
        vec![target.to_string(), parent.to_string()]
    );
}

#[tokio::test]
async fn test_stop_override_beats_collection_root() {
    let env = TestEnv::new();
    let (target, parent, grandparent) = env.three_level_chain();
    env.permissions.set_collection(target.clone(), grandparent);

    let mut req = request(&target, &["pinax"], true);
    req.options = Some(ReprocessOptions {
        stop_at_pi: Some(parent.to_string()),
        ..Default::default()
    });

    let response = env.pipeline().submit(req, None).await.unwrap();
    assert_eq!(response.entity_pis, vec![target.to_string()]);
}

#[tokio::test]
async fn test_permission_checked_once_against_target() {
    let env = TestEnv::new();
    let (target, parent, _) = env.three_level_chain();
    // denying an ancestor has no effect; only the target is checked
    env.permissions.deny(parent);

    let actor = Actor("01KA1H53CP2TAW8P8VSZ8JUSER".into());
    env.pipeline()
        .submit(request(&target, &["pinax"], true), Some(actor.clone()))
        .await
        .unwrap();

    assert_eq!(env.permissions.checked(), vec![(target, Some(actor))]);
}

#[tokio::test]
async fn test_permission_denied_publishes_nothing() {
    let env = TestEnv::new();
    let (target, _, _) = env.three_level_chain();
    env.permissions.deny(target.clone());

    let err = env
        .pipeline()
        .submit(request(&target, &["pinax"], true), None)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::PermissionDenied(_)));
    assert!(env.publisher.messages().is_empty());
    assert!(env.staging.keys().is_empty());
    assert_eq!(
        env.events.events().last(),
        Some(&RecordedEvent::Failed("PERMISSION_DENIED"))
    );
}

#[tokio::test]
async fn test_missing_target_is_not_found() {
    let env = TestEnv::new();

    let err = env
        .pipeline()
        .submit(request(&id(42), &["pinax"], false), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));
    assert!(env.publisher.messages().is_empty());
}

#[tokio::test]
async fn test_failed_component_aborts_whole_batch() {
    let env = TestEnv::new();
    let (target, parent, _) = env.three_level_chain();
    // parent references content that does not exist
    let mut broken = ::common::entity::Entity::new(parent.clone(), 2)
        .with_parent(id(3))
        .with_component(
            "missing.pdf",
            ::common::entity::ContentAddress::new("bafkmissing"),
        );
    broken.children.push(target.clone());
    env.entities.insert(broken);

    let err = env
        .pipeline()
        .submit(request(&target, &["pinax"], true), None)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::NotFound(_)));
    assert!(env.publisher.messages().is_empty());
    // no manifest is ever written for a failed batch
    assert!(env
        .staging
        .keys()
        .iter()
        .all(|key| !key.ends_with("_manifest.json")));
}

#[tokio::test]
async fn test_queue_failure_surfaces_as_downstream_unavailable() {
    let env = TestEnv::new();
    let (target, _, _) = env.three_level_chain();
    env.publisher.fail(true);

    let err = env
        .pipeline()
        .submit(request(&target, &["pinax"], false), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DOWNSTREAM_UNAVAILABLE");
}

#[tokio::test(start_paused = true)]
async fn test_transient_content_failures_are_retried() {
    let env = TestEnv::new();
    let (target, _, _) = env.three_level_chain();
    env.content.fail_next(2);

    let response = env
        .pipeline_with(PipelineConfig {
            retry: RetryPolicy::default(),
            ..Default::default()
        })
        .submit(request(&target, &["pinax"], false), None)
        .await
        .unwrap();
    assert_eq!(response.entities_queued, 1);
    assert_eq!(env.publisher.messages().len(), 1);
}

#[tokio::test]
async fn test_invalid_request_never_reaches_collaborators() {
    let env = TestEnv::new();
    let mut req = request(&id(1), &["ocr"], false);
    req.pi = "not-an-id".into();

    let err = env.pipeline().submit(req, None).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert!(env.permissions.checked().is_empty());
    assert_eq!(env.entities.fetch_count(), 0);
    assert!(env.events.events().is_empty());
}

#[tokio::test]
async fn test_events_follow_stage_order() {
    let env = TestEnv::new();
    let (target, parent, grandparent) = env.three_level_chain();

    env.pipeline()
        .submit(request(&target, &["pinax"], true), None)
        .await
        .unwrap();

    let events = env.events.events();
    assert!(matches!(events[0], RecordedEvent::Started(_)));
    assert_eq!(events[1], RecordedEvent::PermissionChecked(EntityId::root()));
    assert_eq!(
        events[2],
        RecordedEvent::ChainResolved(vec![target.clone(), parent.clone(), grandparent.clone()])
    );
    assert_eq!(
        &events[3..6],
        &[
            RecordedEvent::Materialized(target),
            RecordedEvent::Materialized(parent),
            RecordedEvent::Materialized(grandparent),
        ]
    );
    assert_eq!(
        events[6],
        RecordedEvent::ManifestBuilt {
            total_files: 4,
            total_bytes: 4 + 2 + 6 + 3,
        }
    );
    assert!(matches!(events[7], RecordedEvent::Published(_)));
}

#[tokio::test]
async fn test_load_manifest_for_unknown_batch() {
    let env = TestEnv::new();
    let pipeline = env.pipeline();

    let err = pipeline
        .load_manifest("reprocess_00000000000000000000000000000000")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));

    let err = pipeline.load_manifest("../secrets").await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

fn assert_send<T: Send>(_: &T) {}

#[tokio::test]
async fn test_submit_runs_on_spawned_task() {
    let env = TestEnv::new();
    let (target, _, _) = env.three_level_chain();
    let pipeline = env.pipeline();

    let submit = pipeline.submit(request(&target, &["pinax"], true), None);
    assert_send(&submit);
    drop(submit);

    let response = tokio::spawn(async move {
        pipeline
            .submit(request(&target, &["description"], true), None)
            .await
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(response.entities_queued, 3);
}

#[tokio::test]
async fn test_unpublished_batch_is_not_served() {
    let env = TestEnv::new();
    let (target, _, _) = env.three_level_chain();
    let pipeline = env.pipeline();
    env.publisher.fail(true);

    let err = pipeline
        .submit(request(&target, &["pinax"], false), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DOWNSTREAM_UNAVAILABLE");
    assert!(env.publisher.messages().is_empty());

    let batch_id = match &env.events.events()[0] {
        RecordedEvent::Started(batch_id) => batch_id.clone(),
        other => panic!("unexpected first event {other:?}"),
    };
    // the manifest was staged before the queue send failed
    assert!(env
        .staging
        .keys()
        .iter()
        .any(|key| key.ends_with("_manifest.json")));

    let err = pipeline.load_manifest(&batch_id).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));
}

#[tokio::test]
async fn test_published_batch_is_served() {
    let env = TestEnv::new();
    let (target, _, _) = env.three_level_chain();
    let pipeline = env.pipeline();

    let response = pipeline
        .submit(request(&target, &["pinax"], false), None)
        .await
        .unwrap();
    let manifest = pipeline.load_manifest(&response.batch_id).await.unwrap();
    assert_eq!(manifest.batch_id, response.batch_id);
    assert!(env
        .staging
        .keys()
        .iter()
        .any(|key| key.ends_with("_published")));
}
