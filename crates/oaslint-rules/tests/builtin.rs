//! The built-in rules run through the engine over in-memory projects.

use std::sync::Arc;

use oaslint_core::{
    ConfigError, ContextOptions, EngineOptions, EngineOutput, LintConfig, Position, Severity,
    build_project_context, build_project_context_for_root, run_engine,
};
use oaslint_rules::builtin_registry;
use oaslint_system_runtime::{FileSystem, MemoryFileSystem, Uri};
use pretty_assertions::assert_eq;

async fn lint(files: &[(&str, &str)], config: &str) -> EngineOutput {
    let mut fs = MemoryFileSystem::new();
    for (name, text) in files {
        fs = fs.with_file(name, *text).unwrap();
    }
    let fs: Arc<dyn FileSystem> = Arc::new(fs);
    let root = Uri::parse(files[0].0).unwrap();

    let config = LintConfig::from_yaml(config).unwrap();
    let registry = builtin_registry().unwrap();
    config.validate(&registry).unwrap();
    let options = ContextOptions {
        classifier: config.classifier_policy(),
        ..ContextOptions::default()
    };
    let ctx = build_project_context_for_root(&root, fs, options).await;
    run_engine(&ctx, &[root], &EngineOptions { registry, config })
}

fn summary(output: &EngineOutput) -> Vec<(String, String, Position)> {
    output
        .diagnostics
        .iter()
        .map(|d| (d.rule_id.clone(), d.uri.to_string(), d.range.start))
        .collect()
}

const ITEMS_API: &str = "openapi: 3.1.0
info:
  title: Items
  version: '1'
paths:
  /items/{id}:
    $ref: './paths/item.yaml'
";

const ITEM_PATH: &str = "parameters:
  - $ref: '../parameters/id.yaml'
get:
  operationId: getItem
  responses:
    '200':
      description: ok
";

#[tokio::test]
async fn path_parameters_resolve_across_files() {
    let output = lint(
        &[
            ("file:///api/openapi.yaml", ITEMS_API),
            ("file:///api/paths/item.yaml", ITEM_PATH),
            ("file:///api/parameters/id.yaml", "name: id\nin: path\nrequired: true\nschema:\n  type: string\n"),
        ],
        "",
    )
    .await;
    assert_eq!(output.diagnostics, vec![]);
}

#[tokio::test]
async fn undeclared_path_parameter_is_reported() {
    let output = lint(
        &[
            ("file:///api/openapi.yaml", ITEMS_API),
            ("file:///api/paths/item.yaml", ITEM_PATH),
            ("file:///api/parameters/id.yaml", "name: id\nin: query\n"),
        ],
        "",
    )
    .await;
    assert_eq!(
        summary(&output),
        vec![(
            "path-params-defined".to_string(),
            "file:///api/paths/item.yaml".to_string(),
            Position::new(2, 0)
        )]
    );
    assert_eq!(
        output.diagnostics[0].message,
        "GET /items/{id}: path parameter 'id' is not declared"
    );
    assert_eq!(output.diagnostics[0].code, 2);
}

#[tokio::test]
async fn unused_path_parameter_is_reported_at_its_name() {
    let output = lint(
        &[(
            "file:///api.yaml",
            "openapi: 3.0.0
paths:
  /pets:
    get:
      parameters:
        - name: petId
          in: path
          required: true
",
        )],
        "",
    )
    .await;
    assert_eq!(
        summary(&output),
        vec![(
            "path-params-defined".to_string(),
            "file:///api.yaml".to_string(),
            Position::new(5, 10)
        )]
    );
    assert_eq!(
        output.diagnostics[0].message,
        "path parameter 'petId' does not appear in /pets"
    );
}

#[tokio::test]
async fn duplicate_operation_ids_point_at_each_other() {
    let output = lint(
        &[
            (
                "file:///api.yaml",
                "openapi: 3.0.0
paths:
  /a:
    get:
      operationId: listThings
  /b:
    $ref: './b.yaml'
",
            ),
            ("file:///b.yaml", "get:\n  operationId: listThings\n"),
        ],
        "rules:\n  operation-id-unique: warning\n",
    )
    .await;

    assert_eq!(
        summary(&output),
        vec![
            (
                "operation-id-unique".to_string(),
                "file:///api.yaml".to_string(),
                Position::new(4, 6)
            ),
            (
                "operation-id-unique".to_string(),
                "file:///b.yaml".to_string(),
                Position::new(1, 2)
            ),
        ]
    );
    let first = &output.diagnostics[0];
    assert_eq!(first.severity, Severity::Warning);
    assert_eq!(first.related_information.len(), 1);
    assert_eq!(first.related_information[0].uri.as_str(), "file:///b.yaml");
    assert_eq!(first.related_information[0].range.start, Position::new(1, 2));
    assert_eq!(
        output.diagnostics[1].related_information[0].range.start,
        Position::new(4, 6)
    );
}

#[tokio::test]
async fn deviating_path_casing_is_reported() {
    let output = lint(
        &[(
            "file:///api.yaml",
            "openapi: 3.0.0
paths:
  /user-accounts:
    get: {}
  /order-items:
    get: {}
  /productList:
    get: {}
",
        )],
        "",
    )
    .await;
    assert_eq!(
        summary(&output),
        vec![(
            "paths-consistent-casing".to_string(),
            "file:///api.yaml".to_string(),
            Position::new(6, 2)
        )]
    );
    let diagnostic = &output.diagnostics[0];
    assert_eq!(diagnostic.severity, Severity::Warning);
    assert_eq!(
        diagnostic.message,
        "path '/productList' uses camelCase segments; most paths use kebab-case"
    );
}

#[tokio::test]
async fn broken_documents_do_not_stop_the_run() {
    let output = lint(
        &[
            (
                "file:///api.yaml",
                "openapi: 3.0.0
paths:
  /a:
    get:
      operationId: a
      responses:
        '200':
          $ref: './broken.yaml'
  /b/{id}:
    get:
      operationId: b
  /c/{cid}:
    $ref: './c.yaml'
",
            ),
            ("file:///broken.yaml", "description: [unclosed\n"),
            ("file:///c.yaml", "get:\n  operationId: c\n"),
        ],
        "",
    )
    .await;

    let rules: Vec<&str> = output.diagnostics.iter().map(|d| d.rule_id.as_str()).collect();
    assert_eq!(
        rules,
        vec![
            "no-unresolved-refs",
            "path-params-defined",
            "parse-error",
            "path-params-defined",
        ]
    );
    assert!(output.diagnostics[0].message.contains("could not be parsed"));
    assert_eq!(output.diagnostics[2].uri.as_str(), "file:///broken.yaml");

    let from_ref = &output.diagnostics[3];
    assert_eq!(from_ref.uri.as_str(), "file:///c.yaml");
    assert_eq!(from_ref.range.start, Position::new(0, 0));
    assert_eq!(
        from_ref.message,
        "GET /c/{cid}: path parameter 'cid' is not declared"
    );
}

#[tokio::test]
async fn casing_only_considers_requested_roots() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "file:///a/api.yaml",
            "openapi: 3.0.0
paths:
  /user-accounts:
    get: {}
  /order-items:
    $ref: '../shared/item.yaml'
",
        )
        .unwrap()
        .with_file(
            "file:///b/api.yaml",
            "openapi: 3.0.0
paths:
  /productList:
    $ref: '../shared/item.yaml'
",
        )
        .unwrap()
        .with_file("file:///shared/item.yaml", "get:\n  operationId: item\n")
        .unwrap();
    let fs: Arc<dyn FileSystem> = Arc::new(fs);
    let first = Uri::parse("file:///a/api.yaml").unwrap();
    let second = Uri::parse("file:///b/api.yaml").unwrap();
    let ctx = build_project_context(&[first.clone(), second.clone()], fs, ContextOptions::default()).await;
    let options = EngineOptions {
        registry: builtin_registry().unwrap(),
        config: LintConfig::default(),
    };

    let only_first = run_engine(&ctx, &[first.clone()], &options);
    assert_eq!(only_first.diagnostics, vec![]);

    let both = run_engine(&ctx, &[first, second], &options);
    assert_eq!(
        summary(&both),
        vec![(
            "paths-consistent-casing".to_string(),
            "file:///b/api.yaml".to_string(),
            Position::new(2, 2)
        )]
    );
}

#[tokio::test]
async fn disabled_rules_do_not_run() {
    let output = lint(
        &[(
            "file:///api.yaml",
            "openapi: 3.0.0\npaths:\n  /a/{id}:\n    get: {}\n",
        )],
        "rules:\n  path-params-defined: off\n",
    )
    .await;
    assert!(output.diagnostics.is_empty());
}

#[test]
fn registry_and_config_validation() {
    let registry = builtin_registry().unwrap();
    assert_eq!(
        registry.ids().collect::<Vec<_>>(),
        vec![
            "no-unresolved-refs",
            "path-params-defined",
            "operation-id-unique",
            "paths-consistent-casing",
        ]
    );

    let config = LintConfig::from_yaml("rules:\n  no-such-rule: error\n").unwrap();
    assert_eq!(
        config.validate(&registry),
        Err(ConfigError::UnknownRule("no-such-rule".into()))
    );
}

#[tokio::test]
async fn diagnostics_snapshot() {
    let output = lint(
        &[(
            "file:///api.yaml",
            "openapi: 3.0.0
paths:
  /items/{id}:
    get:
      operationId: getItem
  /other:
    $ref: './missing.yaml'
",
        )],
        "",
    )
    .await;
    insta::assert_json_snapshot!("diagnostics", output.diagnostics);
}
