
    use super::*;
    use crate::Operation;
    use crate::schema::PipelineDefinition;

    fn pipeline(name: &str, schedule: &str) -> PipelineDefinition {
        PipelineDefinition::new(name, schedule, "/data/in/", "/data/out/", Operation::Copy)
    }

    fn config_with(pipelines: Vec<PipelineDefinition>) -> Config {
        Config {
            pipelines,
            ..Config::default()
        }
    }

    #[test]
    fn test_validate_default_config() {
        let result = ConfigValidator::validate(&Config::default());
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "pipelines"));
    }

    #[test]
    fn test_validate_valid_pipeline() {
        let config = config_with(vec![pipeline("orders", "0 2 * * *")]);
        let result = ConfigValidator::validate(&config);
        assert!(result.is_valid());
    }

    #[test]
    fn test_validate_invalid_cron() {
        let config = config_with(vec![pipeline("orders", "not a cron")]);
        let result = ConfigValidator::validate(&config);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "pipelines[0].schedule"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let config = config_with(vec![
            pipeline("orders", "* * * * *"),
            pipeline("orders", "*/5 * * * *"),
        ]);
        let result = ConfigValidator::validate(&config);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "pipelines[1].name"));
    }

    #[test]
    fn test_validate_empty_locations() {
        let mut def = pipeline("orders", "* * * * *");
        def.source = String::new();
        def.target = "  ".to_string();
        let result = ConfigValidator::validate(&config_with(vec![def]));
        assert!(result.errors.iter().any(|e| e.path == "pipelines[0].source"));
        assert!(result.errors.iter().any(|e| e.path == "pipelines[0].target"));
    }

    #[test]
    fn test_validate_same_source_and_target() {
        for operation in [Operation::Copy, Operation::Move] {
            let def = PipelineDefinition::new("loop", "* * * * *", "/a/", "/a/", operation);
            let result = ConfigValidator::validate(&config_with(vec![def]));
            assert!(!result.is_valid());
            assert!(result.errors.iter().any(|e| e.path == "pipelines[0].target"));
        }
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut config = config_with(vec![pipeline("orders", "* * * * *")]);
        config.scheduler.poll_interval_secs = 0;
        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.path == "scheduler.poll_interval_secs"));
    }

    #[test]
    fn test_validate_narrow_window_warning() {
        let mut config = config_with(vec![pipeline("orders", "* * * * *")]);
        config.scheduler.window_secs = 10;
        let result = ConfigValidator::validate(&config);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "scheduler.window_secs"));
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = config_with(vec![pipeline("orders", "* * * * *")]);
        config.storage.max_concurrent_items = 0;
        let result = ConfigValidator::validate(&config);
        assert!(!result.is_valid());
    }

    #[test]
    fn test_validate_invalid_endpoint() {
        let mut config = config_with(vec![pipeline("orders", "* * * * *")]);
        config.storage.endpoint_url = Some("localhost:9000".to_string());
        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.path == "storage.endpoint_url"));
    }

    #[test]
    fn test_validate_empty_source_key() {
        let def = pipeline("orders", "* * * * *").with_source_keys(["a.txt", ""]);
        let result = ConfigValidator::validate(&config_with(vec![def]));
        assert!(result.errors.iter().any(|e| e.path == "pipelines[0].source_keys"));
    }

    #[test]
    fn test_into_result() {
        let config = config_with(vec![pipeline("orders", "bogus")]);
        let err = ConfigValidator::validate(&config).into_result().unwrap_err();
        assert!(err.to_string().contains("pipelines[0].schedule"));

        let ok = ConfigValidator::validate(&config_with(vec![pipeline("orders", "* * * * *")]));
        assert!(ok.into_result().is_ok());
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config =
            crate::loader::ConfigLoader::load_str(include_str!("../../../config/ferry.toml"))
                .unwrap();
        assert_eq!(config.pipelines.len(), 3);
        let warnings = ConfigValidator::validate(&config).into_result().unwrap();
        assert!(warnings.is_empty());
    }
