use super::*;

// ============================================================================
// RendererConfig
// ============================================================================

#[test]
fn test_config_defaults() {
    let config = RendererConfig::default();
    assert_eq!(config.app_name, "Dank Application");
    assert_eq!(config.app_version, (1, 0, 0));
    assert_eq!(config.frames_in_flight, 3);
    assert_eq!(config.draw_encoding, DrawEncoding::Direct);
    assert_eq!(config.instance_page_size, 1024);
    assert_eq!(config.max_texture_slots, 128);
    assert_eq!(config.clear_color, [1.0, 0.042, 0.042, 1.0]);
    assert!(config.vsync);
    assert_eq!(config.enable_validation, cfg!(debug_assertions));
}

#[test]
fn test_config_validate_accepts_defaults() {
    assert!(RendererConfig::default().validate().is_ok());
}

#[test]
fn test_config_validate_rejects_zero_counts() {
    let configs = [
        RendererConfig { frames_in_flight: 0, ..Default::default() },
        RendererConfig { instance_page_size: 0, ..Default::default() },
        RendererConfig { max_texture_slots: 0, ..Default::default() },
    ];
    for config in configs {
        match config.validate() {
            Err(Error::InitializationFailed(msg)) => assert!(msg.contains("at least 1")),
            other => panic!("expected InitializationFailed, got {:?}", other),
        }
    }
}

#[test]
fn test_single_frame_in_flight_is_valid() {
    let config = RendererConfig { frames_in_flight: 1, ..Default::default() };
    assert!(config.validate().is_ok());
}
