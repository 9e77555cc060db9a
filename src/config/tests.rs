use super::*;

#[test]
fn defaults_match_original_deployment() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr, "0.0.0.0:3030".parse::<SocketAddr>().unwrap());
    assert_eq!(settings.database.url, "sqlite://blog.db");
    assert_eq!(settings.uploads.directory, PathBuf::from("uploads"));
    assert!(settings.images.resize);
    assert_eq!(settings.images.max_width.get(), 800);
    assert!(settings.content.sanitize);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn uploads_limit_defaults_to_10_mib() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    assert_eq!(
        settings.uploads.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
}

#[test]
fn image_processing_can_be_disabled() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        images_resize: Some(false),
        images_max_width: Some(1024),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(!settings.images.resize);
    assert_eq!(settings.images.max_width.get(), 1024);
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.images.max_width = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "images.max_width",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.server.port = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "server.port",
            ..
        })
    ));
}

#[test]
fn blank_database_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "database.url",
            ..
        })
    ));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["quillpost"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_arguments() {
    let args = CliArgs::parse_from([
        "quillpost",
        "serve",
        "--server-port",
        "8080",
        "--database-url",
        "sqlite://other.db",
        "--images-resize",
        "no",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_port, Some(8080));
            assert_eq!(
                serve.overrides.database.database_url.as_deref(),
                Some("sqlite://other.db")
            );
            assert_eq!(serve.overrides.images_resize, Some(false));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from(["quillpost", "migrate", "--database-url", "sqlite://x.db"]);

    match args.command.expect("migrate command") {
        Command::Migrate(migrate) => {
            assert_eq!(
                migrate.database.database_url.as_deref(),
                Some("sqlite://x.db")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
