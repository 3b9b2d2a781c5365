//! Integration tests for the `example run` command.
use powerdispatch::cli::RunOpts;
use powerdispatch::cli::example::handle_example_run_command;
use powerdispatch::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example run` command.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("POWERDISPATCH_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        ..Default::default()
    };
    handle_example_run_command("guangdong_regional", &opts, Some(Settings::default())).unwrap();

    assert!(tempdir.path().join("flows.csv").is_file());
    assert!(tempdir.path().join("region_flows.csv").is_file());
}
