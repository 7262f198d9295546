// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 配置读取 / 作用域覆写 / 快照恢复
// ==========================================


use blast_design_engine::config::{config_keys, ConfigManager, ConfigScope, EngineConfig, EngineConfigReader};
use blast_design_engine::domain::{PowderFactorBasis, SiteScope};
use test_helpers::create_test_db;

#[tokio::test]
async fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[tokio::test]
async fn test_empty_store_yields_defaults() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let loaded = config_manager.load_engine_config(None).await.unwrap();
    assert_eq!(loaded, EngineConfig::default());
}

#[tokio::test]
async fn test_site_override_applies_to_engine_config() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let site = SiteScope::new(7, 3);
    config_manager
        .set_config_value(ConfigScope::Global, config_keys::SIMULTANEITY_WINDOW_MS, "8")
        .unwrap();
    config_manager
        .set_config_value(ConfigScope::Project { project_id: 7 }, config_keys::POWDER_FACTOR_BASIS, "mass")
        .unwrap();
    config_manager
        .set_config_value(ConfigScope::Site { scope: site }, config_keys::SIMULTANEITY_WINDOW_MS, "25")
        .unwrap();

    let site_config = config_manager.load_engine_config(Some(site)).await.unwrap();
    assert_eq!(site_config.powder_factor_basis, PowderFactorBasis::Mass);
    assert_eq!(site_config.simultaneity_window_ms, 25);

    let other_project = config_manager
        .load_engine_config(Some(SiteScope::new(8, 3)))
        .await
        .unwrap();
    assert_eq!(other_project.powder_factor_basis, PowderFactorBasis::Volume);
    assert_eq!(other_project.simultaneity_window_ms, 8);
}

#[tokio::test]
async fn test_values_persist_across_instances() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    {
        let config_manager = ConfigManager::new(&db_path).unwrap();
        config_manager
            .set_config_value(ConfigScope::Global, config_keys::MAX_DIAMETER_M, "0.5")
            .unwrap();
        config_manager
            .set_config_value(ConfigScope::Global, config_keys::REQUIRE_UNIQUE_COORDINATES, "false")
            .unwrap();
    }

    let reopened = ConfigManager::new(&db_path).unwrap();
    assert_eq!(reopened.get_max_diameter(None).await.unwrap(), 0.5);
    assert!(!reopened.get_require_unique_coordinates(None).await.unwrap());
}

#[tokio::test]
async fn test_unknown_basis_falls_back_to_volume() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).unwrap();
    config_manager
        .set_config_value(ConfigScope::Global, config_keys::POWDER_FACTOR_BASIS, "WEIGHT")
        .unwrap();

    assert_eq!(
        config_manager.get_powder_factor_basis(None).await.unwrap(),
        PowderFactorBasis::Volume
    );
}

#[tokio::test]
async fn test_snapshot_and_restore() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).unwrap();
    let site = ConfigScope::Site {
        scope: SiteScope::new(7, 3),
    };

    config_manager
        .set_config_value(site, config_keys::MAX_ANFO_DENSITY, "1.1")
        .unwrap();
    config_manager
        .set_config_value(site, config_keys::COLUMN_EPSILON, "1e-6")
        .unwrap();
    let snapshot = config_manager.get_config_snapshot(site).unwrap();

    // 修改后再恢复
    config_manager
        .set_config_value(site, config_keys::MAX_ANFO_DENSITY, "3.0")
        .unwrap();
    let restored = config_manager.restore_config_from_snapshot(site, &snapshot).unwrap();
    assert_eq!(restored, 2);
    assert_eq!(
        config_manager
            .get_config_value(site, config_keys::MAX_ANFO_DENSITY)
            .unwrap()
            .as_deref(),
        Some("1.1")
    );

    // 快照只覆盖指定作用域
    assert_eq!(
        config_manager
            .get_global_config_value(config_keys::MAX_ANFO_DENSITY)
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_restore_skips_meta_keys() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).unwrap();

    let restored = config_manager
        .restore_config_from_snapshot(
            ConfigScope::Global,
            r#"{"__meta_label":"台阶 +120 定稿","max_diameter_m":"0.3"}"#,
        )
        .unwrap();
    assert_eq!(restored, 1);
    assert_eq!(
        config_manager.get_global_config_value("__meta_label").unwrap(),
        None
    );
    assert!(config_manager
        .delete_config_value(ConfigScope::Global, config_keys::MAX_DIAMETER_M)
        .unwrap());
}

#[tokio::test]
async fn test_static_config_reader_ignores_scope() {
    let config = EngineConfig {
        simultaneity_window_ms: 17,
        ..EngineConfig::default()
    };
    let loaded = config
        .load_engine_config(Some(SiteScope::new(1, 1)))
        .await
        .unwrap();
    assert_eq!(loaded, config);
}
