//! End-to-end tests for the built-in management commands against a
//! file-backed SQLite database.

use std::path::Path;

use strata_backends::{DatabaseBackend, SqliteBackend};
use strata_cli::commands::register_builtin_commands;
use strata_cli::CommandRegistry;
use strata_core::{Settings, StrataError};

const MODELS: &str = r#"
[[models]]
name = "User"
table = "users"

[[models.fields]]
name = "email"
type = "varchar"
size = 255
index = "unique"

[[models]]
name = "Post"
table = "posts"

[[models.fields]]
name = "title"
type = "varchar"
size = 200

[[models.fields]]
name = "author_id"
type = "bigint"
unsigned = true
relation = { model = "User", on_delete = "cascade" }
"#;

fn settings_in(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.database.name = dir.join("db.sqlite3").to_string_lossy().into_owned();
    settings.migrations.dir = dir.join("migrations");
    settings
}

async fn run(registry: &CommandRegistry, settings: &Settings, args: &[&str]) -> Result<(), StrataError> {
    let argv = std::iter::once("strata").chain(args.iter().copied());
    let matches = registry.build_cli().try_get_matches_from(argv).unwrap();
    registry.execute(&matches, settings).await
}

async fn tables(settings: &Settings) -> Vec<String> {
    let backend = SqliteBackend::open(&settings.database.name).unwrap();
    backend
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            &[],
        )
        .await
        .unwrap()
        .iter()
        .map(|r| r.get::<String>("name").unwrap())
        .collect()
}

#[tokio::test]
async fn test_makemigrations_migrate_rollback() {
    let dir = tempfile::tempdir().unwrap();
    let models = dir.path().join("models.toml");
    std::fs::write(&models, MODELS).unwrap();
    let settings = settings_in(dir.path());
    let models = models.to_str().unwrap();

    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);

    run(&registry, &settings, &["makemigrations", "--models", models])
        .await
        .unwrap();
    assert!(settings.migrations.dir.join("0001.json").exists());

    // Nothing new to generate.
    run(&registry, &settings, &["makemigrations", "--models", models])
        .await
        .unwrap();
    assert!(!settings.migrations.dir.join("0002.json").exists());

    run(&registry, &settings, &["migrate", "0001", "--sql"]).await.unwrap();
    assert_eq!(tables(&settings).await, vec!["strata_migrations"]);

    run(&registry, &settings, &["migrate"]).await.unwrap();
    assert_eq!(
        tables(&settings).await,
        vec!["posts", "strata_migrations", "users"]
    );
    run(&registry, &settings, &["showmigrations"]).await.unwrap();

    run(&registry, &settings, &["rollback"]).await.unwrap();
    assert_eq!(tables(&settings).await, vec!["strata_migrations"]);
}

#[tokio::test]
async fn test_migrate_unknown_name() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);

    let err = run(&registry, &settings, &["migrate", "0007"]).await.unwrap_err();
    assert!(matches!(err, StrataError::MigrationNotFound(_)));
}

#[tokio::test]
async fn test_makemigrations_missing_models_file() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);

    let missing = dir.path().join("nope.toml");
    let err = run(
        &registry,
        &settings,
        &["makemigrations", "--models", missing.to_str().unwrap()],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StrataError::IoError(_)));
}
