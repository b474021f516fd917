use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.database.url = Some("postgres://from-file".to_string());

    let overrides = GlobalOverrides {
        log_level: Some("debug".to_string()),
        database_url: Some("postgres://from-cli".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(
        settings.database.url.as_deref(),
        Some("postgres://from-cli")
    );
}

#[test]
fn defaults_match_transient_conventions() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.backend, CacheBackend::Memory);
    assert_eq!(settings.cache.key_prefix, "wc_layered_nav_query_post_ids");
    assert_eq!(settings.cache.ttl, Duration::from_secs(604_800));
    assert!(settings.layered_nav.enabled);
    assert_eq!(settings.layered_nav.page_size.get(), 500);
    assert!(settings.database.url.is_none());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn blank_database_url_is_treated_as_absent() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn zero_page_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.layered_nav.page_size = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero page size");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "layered_nav.page_size",
            ..
        }
    ));
}

#[test]
fn cache_ttl_is_capped() {
    let mut raw = RawSettings::default();
    raw.cache.ttl_seconds = Some(MAX_CACHE_TTL_SECS);
    let settings = Settings::from_raw(raw.clone()).expect("ttl at the cap");
    assert_eq!(settings.cache.ttl, Duration::from_secs(MAX_CACHE_TTL_SECS));

    raw.cache.ttl_seconds = Some(u64::MAX);
    let err = Settings::from_raw(raw).expect_err("ttl above the cap");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.ttl_seconds",
            ..
        }
    ));
}

#[test]
fn unknown_cache_backend_names_the_key() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("redis".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown backend");
    assert!(err.to_string().contains("cache.backend"));
}

#[test]
fn cache_backend_parses_case_insensitively() {
    assert_eq!(
        CacheBackend::from_str("Postgres").expect("postgres"),
        CacheBackend::Postgres
    );
    assert_eq!(
        CacheBackend::from_str(" memory ").expect("memory"),
        CacheBackend::Memory
    );
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn parse_filter_arguments() {
    let args = CliArgs::parse_from([
        "instock-nav",
        "filter",
        "--attribute",
        "pa_size",
        "--term",
        "5",
        "--candidates",
        "10,11,12",
    ]);

    match args.command {
        Command::Filter(filter) => {
            assert_eq!(filter.attribute, "pa_size");
            assert_eq!(filter.term, TermId(5));
            assert_eq!(
                filter.candidates,
                vec![ProductId(10), ProductId(11), ProductId(12)]
            );
        }
        other => panic!("expected filter command, got {other:?}"),
    }
}

#[test]
fn global_flags_follow_subcommand() {
    let args = CliArgs::parse_from([
        "instock-nav",
        "stock-set",
        "--product",
        "42",
        "--database-url",
        "postgres://example",
        "--log-json",
        "true",
    ]);

    assert!(matches!(args.command, Command::StockSet(ProductArgs { product }) if product == ProductId(42)));
    assert_eq!(
        args.overrides.database_url.as_deref(),
        Some("postgres://example")
    );
    assert_eq!(args.overrides.log_json, Some(true));
}

#[test]
fn parse_order_reduced_arguments() {
    let args = CliArgs::parse_from(["instock-nav", "order-reduced", "--order", "7"]);
    assert!(matches!(args.command, Command::OrderReduced(OrderArgs { order }) if order == OrderId(7)));
}
