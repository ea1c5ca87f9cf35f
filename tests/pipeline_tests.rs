// tests/pipeline_tests.rs
//! End-to-end tests for the staging pipeline: cache checks, downloads,
//! materialization with partial failure, assembly and deferred images.

use std::sync::Arc;

use image::DynamicImage;

use simulacrum::assemble::SceneInstance;
use simulacrum::catalog::{
    AssetId, AssetKind, AssetStatus, Placement, ProjectAsset, SceneAssetRef, SceneData,
    TemplateKind,
};
use simulacrum::config::StageConfig;
use simulacrum::geometry::{GeoLocation, Quaternion, Vector3};
use simulacrum::materialize::TemplateRegistry;
use simulacrum::providers::testing::{
    FailingFetcher, MemoryBundleProvider, StaticCatalog, StaticThumbnails, StubMeshDecoder,
    SuffixPlatformResolver, WritingFetcher,
};
use simulacrum::providers::Providers;
use simulacrum::scene::SceneNode;
use simulacrum::{LoadError, LoadEvent, LoadOrchestrator, LoadPhase};

fn mesh_asset(id: &str) -> ProjectAsset {
    ProjectAsset {
        id: id.into(),
        project_id: "p1".into(),
        kind: AssetKind::MeshBundle,
        template_kind: None,
        name: format!("mesh {id}"),
        data_url: String::new(),
        template_payload: None,
        status: AssetStatus::Pending,
        status_message: None,
    }
}

fn bundle_asset(id: &str) -> ProjectAsset {
    ProjectAsset {
        id: id.into(),
        project_id: "p1".into(),
        kind: AssetKind::PrefabBundle,
        template_kind: None,
        name: format!("bundle {id}"),
        data_url: "kiosk-prefab".into(),
        template_payload: None,
        status: AssetStatus::Pending,
        status_message: None,
    }
}

fn billboard_asset(id: &str, image_id: &str) -> ProjectAsset {
    ProjectAsset {
        id: id.into(),
        project_id: "p1".into(),
        kind: AssetKind::Template,
        template_kind: Some(TemplateKind::Billboard),
        name: format!("billboard {id}"),
        data_url: String::new(),
        template_payload: Some(format!(
            r#"{{"ImageId":"{image_id}","Caption":"welcome"}}"#
        )),
        status: AssetStatus::Pending,
        status_message: None,
    }
}

fn placement_of(asset: &ProjectAsset) -> SceneAssetRef {
    SceneAssetRef {
        id: format!("ref-{}", asset.id).as_str().into(),
        project_asset_id: asset.id.clone(),
        name: format!("placed {}", asset.id),
        placement: Placement {
            location: GeoLocation::new(35.68, 139.76, 12.5),
            orientation: Quaternion::new(0.0, 0.38268, 0.0, 0.92388),
            scale: Vector3::new(1.0, 2.0, 3.0),
        },
        project_asset: Some(asset.clone()),
    }
}

fn scene_of(placements: Vec<SceneAssetRef>) -> SceneData {
    SceneData {
        id: "scene-1".into(),
        project_id: "p1".into(),
        name: "plaza".into(),
        scene_assets: placements,
        project: None,
    }
}

fn public_project() -> simulacrum::catalog::ProjectData {
    simulacrum::catalog::ProjectData {
        id: "p1".into(),
        name: "plaza project".into(),
        is_public: true,
        project_asset_ids: Vec::new(),
    }
}

struct Fixture {
    orchestrator: LoadOrchestrator,
    receiver: simulacrum::LoadEventReceiver,
    _cache_dir: tempfile::TempDir,
}

fn fixture_with(catalog: StaticCatalog, fetch_files: Vec<(String, Vec<u8>)>) -> Fixture {
    let cache_dir = tempfile::tempdir().unwrap();
    let providers = Providers {
        catalog: Arc::new(catalog),
        fetcher: Arc::new(WritingFetcher::new(cache_dir.path(), fetch_files)),
        thumbnails: Arc::new(StaticThumbnails::with_image(DynamicImage::new_rgb8(
            1024, 256,
        ))),
        platform: Arc::new(SuffixPlatformResolver::new("linux.assetbundle")),
        mesh_decoder: Arc::new(StubMeshDecoder),
        bundles: Arc::new(MemoryBundleProvider::with_object(
            "kiosk-prefab",
            SceneNode::new("kiosk-prefab"),
        )),
    };
    let (orchestrator, receiver) = LoadOrchestrator::new(
        providers,
        TemplateRegistry::with_builtin_templates(),
        StageConfig::with_cache_root(cache_dir.path()),
    )
    .unwrap();
    Fixture {
        orchestrator,
        receiver,
        _cache_dir: cache_dir,
    }
}

fn catalog_with_project() -> StaticCatalog {
    StaticCatalog {
        project: Some(public_project()),
        ..Default::default()
    }
}

#[tokio::test]
async fn empty_scene_is_cache_complete_and_loads_immediately() {
    let fixture = fixture_with(catalog_with_project(), Vec::new());
    let mut scene = scene_of(Vec::new());

    assert!(fixture.orchestrator.is_cache_complete(&scene).await.unwrap());

    fixture.orchestrator.fetch_missing(&scene).await.unwrap();
    let fetch_fractions: Vec<f32> = fixture
        .receiver
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            LoadEvent::FetchProgress { fraction, .. } => Some(fraction),
            _ => None,
        })
        .collect();
    assert_eq!(fetch_fractions, vec![1.0]);

    let loaded = fixture.orchestrator.load_scene(&mut scene).await.unwrap();
    assert!(loaded.instances.is_empty());
    assert_eq!(loaded.error_count(), 0);
}

#[tokio::test]
async fn cache_check_turns_true_after_fetch_pass() {
    let mesh = mesh_asset("m1");
    let scene = scene_of(vec![placement_of(&mesh)]);
    let fixture = fixture_with(
        catalog_with_project(),
        vec![("mesh.gltf".into(), b"{}".to_vec())],
    );

    assert!(!fixture.orchestrator.is_cache_complete(&scene).await.unwrap());
    fixture.orchestrator.fetch_missing(&scene).await.unwrap();
    assert!(fixture.orchestrator.is_cache_complete(&scene).await.unwrap());
}

#[tokio::test]
async fn failed_download_aborts_fetch_pass() {
    let mesh = mesh_asset("m1");
    let scene = scene_of(vec![placement_of(&mesh)]);

    let cache_dir = tempfile::tempdir().unwrap();
    let providers = Providers {
        catalog: Arc::new(catalog_with_project()),
        fetcher: Arc::new(FailingFetcher),
        thumbnails: Arc::new(StaticThumbnails::default()),
        platform: Arc::new(SuffixPlatformResolver::new("linux.assetbundle")),
        mesh_decoder: Arc::new(StubMeshDecoder),
        bundles: Arc::new(MemoryBundleProvider::default()),
    };
    let (orchestrator, _receiver) = LoadOrchestrator::new(
        providers,
        TemplateRegistry::with_builtin_templates(),
        StageConfig::with_cache_root(cache_dir.path()),
    )
    .unwrap();

    let result = orchestrator.fetch_missing(&scene).await;
    assert!(matches!(result, Err(LoadError::Fetch(_))));
}

#[tokio::test]
async fn full_load_materializes_every_kind_and_places_instances() {
    let mesh = mesh_asset("m1");
    let bundle = bundle_asset("b1");
    let billboard = billboard_asset("t1", "6f9619ff-8b86-d011-b42d-00c04fc964ff");
    let mut scene = scene_of(vec![
        placement_of(&mesh),
        placement_of(&bundle),
        placement_of(&billboard),
    ]);

    let fixture = fixture_with(
        catalog_with_project(),
        vec![
            ("mesh.gltf".into(), b"{}".to_vec()),
            ("kiosk.linux.assetbundle".into(), b"bin".to_vec()),
        ],
    );

    let loaded = fixture.orchestrator.load_scene(&mut scene).await.unwrap();

    assert_eq!(loaded.instances.len(), 3);
    assert_eq!(loaded.error_count(), 0);
    assert!(loaded
        .assets
        .iter()
        .all(|asset| asset.status == AssetStatus::Loaded));

    // Mesh and bundle materialized into the registry and survive in the
    // refreshed project asset list; templates never enter it as cache
    // payloads but do get handles.
    let ids: Vec<&str> = loaded
        .project
        .project_asset_ids
        .iter()
        .map(|id| id.as_str())
        .collect();
    assert_eq!(ids, vec!["m1", "b1", "t1"]);

    // The billboard instance got its deferred image, downscaled to bound.
    let billboard_instance: &SceneInstance = loaded
        .instances
        .iter()
        .find(|instance| instance.project_asset_id == AssetId::new("t1"))
        .unwrap();
    let bound = billboard_instance.image.as_ref().unwrap();
    assert_eq!((bound.width, bound.height), (512, 128));

    // Placement transforms applied verbatim.
    for instance in &loaded.instances {
        assert!(instance
            .orientation
            .approx_eq(&Quaternion::new(0.0, 0.38268, 0.0, 0.92388), 1e-6));
        assert!(instance.scale.approx_eq(&Vector3::new(1.0, 2.0, 3.0), 1e-6));
        assert!(instance.node.active);
    }

    // Phases in order, terminal Done.
    let phases: Vec<LoadPhase> = fixture
        .receiver
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            LoadEvent::PhaseChanged(phase) => Some(phase),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            LoadPhase::ResolvingCatalog,
            LoadPhase::Materializing,
            LoadPhase::Assembling,
            LoadPhase::Done,
        ]
    );
}

#[tokio::test]
async fn missing_mesh_payload_degrades_to_placeholder_without_failing() {
    let present = mesh_asset("present");
    let broken = mesh_asset("broken");
    let mut scene = scene_of(vec![placement_of(&present), placement_of(&broken)]);

    // Pre-stage only the healthy asset; the starved fetcher cannot produce
    // the other payload, so its cache directory never materializes.
    let cache_dir = tempfile::tempdir().unwrap();
    let providers = Providers {
        catalog: Arc::new(catalog_with_project()),
        fetcher: Arc::new(FailingFetcher),
        thumbnails: Arc::new(StaticThumbnails::default()),
        platform: Arc::new(SuffixPlatformResolver::new("linux.assetbundle")),
        mesh_decoder: Arc::new(StubMeshDecoder),
        bundles: Arc::new(MemoryBundleProvider::default()),
    };
    let (orchestrator, receiver) = LoadOrchestrator::new(
        providers,
        TemplateRegistry::with_builtin_templates(),
        StageConfig::with_cache_root(cache_dir.path()),
    )
    .unwrap();
    let scene_dir = orchestrator.cache().scene_dir(&scene.id, &present.id);
    std::fs::create_dir_all(&scene_dir).unwrap();
    std::fs::write(scene_dir.join("mesh.gltf"), b"{}").unwrap();

    let loaded = orchestrator.load_scene(&mut scene).await.unwrap();

    // Both placements produced instances: the healthy mesh and the
    // placeholder keeping the broken asset's slot.
    assert_eq!(loaded.instances.len(), 2);
    assert_eq!(loaded.error_count(), 1);

    let broken_record = loaded
        .assets
        .iter()
        .find(|asset| asset.id == AssetId::new("broken"))
        .unwrap();
    assert_eq!(broken_record.status, AssetStatus::Error);
    assert!(broken_record
        .status_message
        .as_deref()
        .unwrap()
        .contains("re-import"));

    let placeholder = loaded.registry.get(&AssetId::new("broken")).unwrap();
    assert!(placeholder.placeholder);

    // Only the healthy asset survives in the refreshed id list.
    assert_eq!(loaded.project.project_asset_ids, vec![AssetId::new("present")]);

    // handled advanced by exactly one per asset and errors were counted.
    let progress: Vec<(usize, usize, usize)> = receiver
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            LoadEvent::AssetProgress {
                handled,
                total,
                errors,
                ..
            } => Some((handled, total, errors)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(1, 2, 0), (2, 2, 1)]);
}

#[tokio::test]
async fn private_project_fails_the_whole_load() {
    let mut scene = scene_of(vec![placement_of(&mesh_asset("m1"))]);
    let fixture = fixture_with(StaticCatalog::default(), Vec::new());

    let result = fixture.orchestrator.load_scene(&mut scene).await;
    assert!(matches!(result, Err(LoadError::ProjectUnavailable(_))));

    let events = fixture.receiver.drain();
    assert!(events
        .iter()
        .any(|event| matches!(event, LoadEvent::Failed { message } if !message.is_empty())));
    assert!(events
        .iter()
        .any(|event| matches!(event, LoadEvent::PhaseChanged(LoadPhase::Failed))));
}

#[tokio::test]
async fn fetch_progress_is_monotonic_over_a_mixed_catalog() {
    let assets = vec![mesh_asset("m1"), mesh_asset("m2"), mesh_asset("m3")];
    let placements: Vec<SceneAssetRef> = assets.iter().map(placement_of).collect();
    let scene = scene_of(placements);
    let fixture = fixture_with(
        catalog_with_project(),
        vec![("mesh.gltf".into(), b"{}".to_vec())],
    );

    fixture.orchestrator.fetch_missing(&scene).await.unwrap();

    let fractions: Vec<f32> = fixture
        .receiver
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            LoadEvent::FetchProgress { fraction, .. } => Some(fraction),
            _ => None,
        })
        .collect();
    assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(fractions.last().copied(), Some(1.0));
}
