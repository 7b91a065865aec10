use async_trait::async_trait;
use resource_framework::{
    number, CheckFailure, CheckResult, CreateResult, DiffResult, EngineClient, FrameworkError,
    Input, OpKind, PropertyMap, PropertyValue, ProviderError, ProviderRegistry,
    RegisteredResource, ResourceProvider, ResourceReference, Stack, UpdateResult,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const SCALE: &str = "test:Scale";

// --- Test Provider ---

/// Multiplies `x` by `factor`, rejecting negative inputs, and journals every call.
#[derive(Default)]
struct ScaleProvider {
    creates: AtomicUsize,
    updates: AtomicUsize,
    deleted: Mutex<Vec<String>>,
    replace_on_change: bool,
    fail_deletes: bool,
}

impl ScaleProvider {
    fn outs(inputs: &PropertyMap) -> PropertyMap {
        let mut outs = PropertyMap::new();
        outs.insert(
            "value".into(),
            (number(inputs, "x") * number(inputs, "factor")).into(),
        );
        outs.insert("name".into(), inputs["name"].clone());
        outs
    }
}

#[async_trait]
impl ResourceProvider for ScaleProvider {
    async fn check(
        &self,
        _olds: &PropertyMap,
        news: PropertyMap,
    ) -> Result<CheckResult, ProviderError> {
        let failures = if number(&news, "x") < 0.0 {
            vec![CheckFailure::new("x", "must not be negative")]
        } else {
            vec![]
        };
        Ok(CheckResult {
            inputs: news,
            failures,
        })
    }

    async fn diff(
        &self,
        _id: &str,
        olds: &PropertyMap,
        news: &PropertyMap,
    ) -> Result<DiffResult, ProviderError> {
        if self.replace_on_change && olds != news {
            return Ok(DiffResult {
                changes: Some(true),
                replaces: vec!["x".into()],
            });
        }
        Ok(DiffResult::default())
    }

    async fn create(&self, inputs: &PropertyMap) -> Result<CreateResult, ProviderError> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(CreateResult {
            id: format!("id-{n}"),
            outs: Self::outs(inputs),
        })
    }

    async fn update(
        &self,
        _id: &str,
        _olds: &PropertyMap,
        news: &PropertyMap,
    ) -> Result<UpdateResult, ProviderError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(UpdateResult {
            outs: Self::outs(news),
        })
    }

    async fn delete(&self, _id: &str, props: &PropertyMap) -> Result<(), ProviderError> {
        if self.fail_deletes {
            return Err(ProviderError::Failed(format!("cannot delete {}", props["name"])));
        }
        if let Some(PropertyValue::String(name)) = props.get("name") {
            self.deleted.lock().unwrap().push(name.clone());
        }
        Ok(())
    }
}

fn setup(provider: ScaleProvider) -> (Arc<ScaleProvider>, Stack) {
    let provider = Arc::new(provider);
    let mut registry = ProviderRegistry::new();
    registry.register(SCALE, provider.clone());
    (provider, Stack::new("test", registry))
}

fn scale(
    client: &EngineClient,
    provider: &Arc<ScaleProvider>,
    name: &str,
    x: impl Into<Input>,
    factor: f64,
) -> Result<RegisteredResource, FrameworkError> {
    let mut inputs = BTreeMap::new();
    inputs.insert("name".to_string(), Input::from(PropertyValue::from(name)));
    inputs.insert("x".to_string(), x.into());
    inputs.insert("factor".to_string(), Input::from(factor));
    client.register_resource(SCALE, name, provider.clone(), inputs)
}

/// Declares a chain of `len` resources, each scaling the previous value by `factor`.
async fn chain(
    client: EngineClient,
    provider: Arc<ScaleProvider>,
    len: usize,
    factor: f64,
) -> Result<Option<f64>, FrameworkError> {
    let mut previous: Input = 1.0.into();
    let mut last = None;
    for i in 0..len {
        let resource = scale(&client, &provider, &format!("link-{i}"), previous, factor)?;
        previous = resource.output("value").into();
        last = Some(resource);
    }
    match last {
        Some(resource) => Ok(Some(resource.output("value").number().await?)),
        None => Ok(None),
    }
}

// --- Tests ---

#[tokio::test]
async fn test_dependent_outputs_flow_in_order() {
    let (provider, mut stack) = setup(ScaleProvider::default());

    let result = stack
        .up(|client| chain(client, provider.clone(), 4, 2.0))
        .await
        .unwrap();

    assert_eq!(result.output, Some(16.0));
    assert_eq!(result.summary.count(OpKind::Create), 4);
    assert_eq!(
        stack.checkpoint().names(),
        vec!["link-0", "link-1", "link-2", "link-3"]
    );
    let last = stack.checkpoint().find_by_name("link-3").unwrap();
    assert_eq!(last.dependencies.len(), 1);
    assert_eq!(last.dependencies[0].name(), "link-2");
}

#[tokio::test]
async fn test_rerun_same_then_update() {
    let (provider, mut stack) = setup(ScaleProvider::default());

    stack
        .up(|client| chain(client, provider.clone(), 3, 2.0))
        .await
        .unwrap();

    let same = stack
        .up(|client| chain(client, provider.clone(), 3, 2.0))
        .await
        .unwrap();
    assert_eq!(same.summary.count(OpKind::Same), 3);
    assert_eq!(provider.creates.load(Ordering::SeqCst), 3);
    assert_eq!(provider.updates.load(Ordering::SeqCst), 0);

    let changed = stack
        .up(|client| chain(client, provider.clone(), 3, 3.0))
        .await
        .unwrap();
    assert_eq!(changed.output, Some(27.0));
    assert_eq!(changed.summary.count(OpKind::Update), 3);
    assert_eq!(provider.creates.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_shrinking_deletes_newest_first() {
    let (provider, mut stack) = setup(ScaleProvider::default());

    stack
        .up(|client| chain(client, provider.clone(), 5, 2.0))
        .await
        .unwrap();
    let result = stack
        .up(|client| chain(client, provider.clone(), 2, 2.0))
        .await
        .unwrap();

    assert_eq!(result.summary.count(OpKind::Delete), 3);
    assert_eq!(stack.checkpoint().names(), vec!["link-0", "link-1"]);
    assert_eq!(
        *provider.deleted.lock().unwrap(),
        vec!["link-4", "link-3", "link-2"]
    );
}

#[tokio::test]
async fn test_failed_delete_keeps_resource() {
    let (provider, mut stack) = setup(ScaleProvider {
        fail_deletes: true,
        ..Default::default()
    });

    stack
        .up(|client| chain(client, provider.clone(), 3, 2.0))
        .await
        .unwrap();
    let result = stack
        .up(|client| chain(client, provider.clone(), 1, 2.0))
        .await
        .unwrap();

    assert_eq!(result.summary.count(OpKind::Delete), 0);
    let failed: Vec<&str> = result
        .summary
        .failures
        .iter()
        .map(|f| f.urn.name())
        .collect();
    assert_eq!(failed, vec!["link-2", "link-1"]);
    assert!(result.summary.failures[0]
        .error
        .contains("Provider operation failed"));
    assert_eq!(stack.checkpoint().names(), vec!["link-0", "link-1", "link-2"]);
}

#[tokio::test]
async fn test_check_failure_blocks_resource_and_dependents() {
    let (provider, mut stack) = setup(ScaleProvider::default());
    stack
        .up(|client| chain(client, provider.clone(), 1, 1.0))
        .await
        .unwrap();

    let result = stack
        .up(|client| {
            let provider = provider.clone();
            async move {
                let bad = scale(&client, &provider, "bad", -1.0, 1.0)?;
                scale(&client, &provider, "after-bad", bad.output("value"), 1.0)?;
                scale(&client, &provider, "independent", 5.0, 1.0)?;
                Ok::<_, FrameworkError>(())
            }
        })
        .await
        .unwrap();

    assert!(!result.summary.succeeded());
    let failed: Vec<(&str, &str)> = result
        .summary
        .failures
        .iter()
        .map(|f| (f.urn.name(), f.error.as_str()))
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed
        .iter()
        .any(|(name, error)| *name == "bad" && error.contains("must not be negative")));
    assert!(failed
        .iter()
        .any(|(name, error)| *name == "after-bad" && error.contains("Dependency")));
    assert_eq!(result.summary.count(OpKind::Create), 1);
    assert_eq!(result.summary.count(OpKind::Delete), 0);
    // link-0 was not registered, but deletes are skipped on a failed update.
    assert_eq!(stack.checkpoint().names(), vec!["independent", "link-0"]);
}

#[tokio::test]
async fn test_program_error_keeps_state() {
    let (provider, mut stack) = setup(ScaleProvider::default());
    stack
        .up(|client| chain(client, provider.clone(), 2, 1.0))
        .await
        .unwrap();

    let err = stack
        .up(|client| {
            let provider = provider.clone();
            async move {
                scale(&client, &provider, "link-0", 1.0, 1.0)?;
                Err::<(), FrameworkError>(FrameworkError::ProviderNotFound("boom".into()))
            }
        })
        .await
        .unwrap_err();

    assert!(matches!(err, FrameworkError::Program(_)));
    assert_eq!(stack.checkpoint().names(), vec!["link-0", "link-1"]);
}

#[tokio::test]
async fn test_duplicate_registration_fails() {
    let (provider, mut stack) = setup(ScaleProvider::default());

    let result = stack
        .up(|client| {
            let provider = provider.clone();
            async move {
                scale(&client, &provider, "twin", 1.0, 1.0)?;
                let second = scale(&client, &provider, "twin", 2.0, 1.0)?;
                Ok::<_, FrameworkError>(second.output("value").value().await.is_err())
            }
        })
        .await
        .unwrap();

    assert!(result.output);
    assert_eq!(result.summary.failures.len(), 1);
    assert_eq!(stack.checkpoint().len(), 1);
}

#[tokio::test]
async fn test_replace_creates_new_and_deletes_old() {
    let (provider, mut stack) = setup(ScaleProvider {
        replace_on_change: true,
        ..Default::default()
    });
    stack
        .up(|client| chain(client, provider.clone(), 1, 2.0))
        .await
        .unwrap();

    let result = stack
        .up(|client| chain(client, provider.clone(), 1, 5.0))
        .await
        .unwrap();

    assert_eq!(result.summary.count(OpKind::Replace), 1);
    let state = stack.checkpoint().find_by_name("link-0").unwrap();
    assert_eq!(state.id.as_deref(), Some("id-1"));
    assert_eq!(provider.deleted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_components_record_resource_references() {
    let (provider, mut stack) = setup(ScaleProvider::default());

    stack
        .up(|client| {
            let provider = provider.clone();
            async move {
                let target = scale(&client, &provider, "target", 1.0, 1.0)?;
                let mut outputs = PropertyMap::new();
                outputs.insert(
                    "refs".into(),
                    PropertyValue::Array(vec![ResourceReference {
                        urn: target.urn().clone(),
                    }
                    .into()]),
                );
                client.register_component("test:Group", "group", outputs)?;
                Ok::<_, FrameworkError>(())
            }
        })
        .await
        .unwrap();

    let links = stack.checkpoint().resource_references();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].0.name(), "group");
    assert_eq!(links[0].1.name(), "target");
    let group = stack.checkpoint().find_by_name("group").unwrap();
    assert!(!group.custom);
    assert_eq!(group.dependencies, vec![links[0].1.clone()]);
}

#[tokio::test]
async fn test_refresh_and_destroy() {
    let (provider, mut stack) = setup(ScaleProvider::default());
    stack
        .up(|client| chain(client, provider.clone(), 3, 2.0))
        .await
        .unwrap();
    let before = stack.checkpoint().clone();

    let refreshed = stack.refresh().await.unwrap();
    assert_eq!(refreshed.count(OpKind::Read), 3);
    assert_eq!(stack.checkpoint(), &before);

    let destroyed = stack.destroy().await.unwrap();
    assert_eq!(destroyed.count(OpKind::Delete), 3);
    assert!(stack.checkpoint().is_empty());
}

#[tokio::test]
async fn test_state_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScaleProvider::default());
    let mut registry = ProviderRegistry::new();
    registry.register(SCALE, provider.clone());

    let mut stack = Stack::open("persisted", dir.path(), registry.clone()).unwrap();
    stack
        .up(|client| chain(client, provider.clone(), 2, 2.0))
        .await
        .unwrap();

    let mut reopened = Stack::open("persisted", dir.path(), registry).unwrap();
    assert_eq!(reopened.checkpoint().names(), vec!["link-0", "link-1"]);

    let result = reopened
        .up(|client| chain(client, provider.clone(), 0, 2.0))
        .await
        .unwrap();
    assert_eq!(result.output, None);
    assert_eq!(result.summary.count(OpKind::Delete), 2);
    assert!(dir.path().join("persisted.json").exists());
}
